//! Tick Scheduler
//!
//! Owns buffer roles. One tick evaluates every agent in parallel from the
//! read-only current buffer into the write buffer, joins, then swaps roles
//! and publishes the new frame. A failed or cancelled tick publishes nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::influence::{Evaluator, InfluenceRules, NeighborIndex};
use super::integrator::{advance_agent, Limits};
use super::observer::{heading_of, orientation_of, FlockFrame, FlockObserver};
use super::store::{AgentState, AgentStore};
use crate::core::{NeighborStrategy, SimError, SimResult, SimulationConfig};

/// Agents handed to one rayon task at a time.
const AGENT_CHUNK: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    Stepping,
}

/// Summary of one completed tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickStats {
    pub tick: u64,
    pub agent_count: usize,
    pub strategy: NeighborStrategy,
    pub elapsed: Duration,
}

/// Shared flag that aborts the tick in progress.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// The flock simulation: agent store, rules and the worker pool.
pub struct FlockSimulation {
    config: SimulationConfig,
    store: AgentStore,
    rules: InfluenceRules,
    limits: Limits,
    pool: Option<ThreadPool>,
    observer: FlockObserver,
    cancel: CancelToken,
    phase: TickPhase,
    global_tick: u64,
}

impl FlockSimulation {
    /// Spawn a randomized population from `config`.
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        let store = AgentStore::spawn(&config)?;
        Self::with_store(config, store)
    }

    /// Start from explicit agent states. `config.agent_count` is overwritten
    /// with the fixture's length.
    pub fn from_agents(mut config: SimulationConfig, agents: &[AgentState]) -> SimResult<Self> {
        config.agent_count = agents.len();
        config.validate()?;
        let store = AgentStore::from_agents(agents, config.flock_count)?;
        Self::with_store(config, store)
    }

    fn with_store(config: SimulationConfig, store: AgentStore) -> SimResult<Self> {
        let pool = if config.parallel && config.max_threads > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.max_threads)
                .thread_name(|i| format!("flock-worker-{}", i))
                .build()
                .map_err(|e| SimError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        let observer = FlockObserver::new(FlockFrame::new(
            0,
            Arc::clone(store.current()),
            Arc::clone(store.flock_ids()),
        ));

        info!(
            "[Scheduler] Simulation ready: {} agents, {} flocks, {:?}, parallel={} threads={}",
            store.agent_count(),
            config.flock_count,
            config.strategy,
            config.parallel,
            pool.as_ref().map_or(rayon::current_num_threads(), |p| p.current_num_threads())
        );

        Ok(FlockSimulation {
            rules: InfluenceRules::from_config(&config),
            limits: Limits {
                boundary_radius: config.boundary_radius,
                max_speed: config.max_speed,
            },
            config,
            store,
            pool,
            observer,
            cancel: CancelToken::default(),
            phase: TickPhase::Idle,
            global_tick: 0,
        })
    }

    /// Advance by the configured timestep.
    pub fn step(&mut self) -> SimResult<TickStats> {
        self.tick(self.config.timestep)
    }

    /// Advance the simulation by `dt`.
    ///
    /// Either the whole population moves to the next state or, on error,
    /// nothing changes and the previous frame stays current.
    pub fn tick(&mut self, dt: f32) -> SimResult<TickStats> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimError::InvalidTimestep(dt));
        }

        let start = Instant::now();
        let next_tick = self.global_tick + 1;
        self.phase = TickPhase::Stepping;

        let result = match self.pool.take() {
            Some(pool) => {
                let r = pool.install(|| self.run_tick(dt, next_tick));
                self.pool = Some(pool);
                r
            }
            None => self.run_tick(dt, next_tick),
        };
        self.phase = TickPhase::Idle;

        if let Err(e) = result {
            warn!("[Scheduler] Tick {} discarded: {}", next_tick, e);
            return Err(e);
        }

        self.global_tick = next_tick;
        let flock_ids = Arc::clone(self.store.flock_ids());
        let observer = &self.observer;
        self.store.commit(|current| {
            observer.publish(FlockFrame::new(next_tick, Arc::clone(current), flock_ids));
        });

        let stats = TickStats {
            tick: next_tick,
            agent_count: self.store.agent_count(),
            strategy: self.config.strategy,
            elapsed: start.elapsed(),
        };
        debug!(
            "[Scheduler] Tick {}: {} agents in {:?}",
            stats.tick, stats.agent_count, stats.elapsed
        );
        Ok(stats)
    }

    /// Evaluate every agent into the write buffer. Touches no shared state
    /// beyond the write buffer, so an error here leaves the simulation as it was.
    fn run_tick(&mut self, dt: f32, tick: u64) -> SimResult<()> {
        let strategy = self.config.strategy;
        let parallel = self.config.parallel;
        let flock_count = self.store.flock_count();
        let rules = &self.rules;
        let limits = &self.limits;
        let cancel = &self.cancel;

        let (current, write, flock_ids) = self.store.split();
        let index = NeighborIndex::build(strategy, rules, current, flock_ids, flock_count, parallel);
        let eval = Evaluator {
            rules,
            current,
            flock_ids,
            index: &index,
        };

        let advance_chunk = |(c, (positions, velocities)): (usize, (&mut [Vec3], &mut [Vec3]))| {
            let base = c * AGENT_CHUNK;
            for (k, (p, v)) in positions.iter_mut().zip(velocities.iter_mut()).enumerate() {
                if cancel.is_cancelled() {
                    return Err(SimError::Cancelled { tick });
                }
                let (next_p, next_v) = advance_agent(&eval, limits, base + k, dt);
                *p = next_p;
                *v = next_v;
            }
            Ok(())
        };

        if parallel {
            write
                .positions
                .par_chunks_mut(AGENT_CHUNK)
                .zip(write.velocities.par_chunks_mut(AGENT_CHUNK))
                .enumerate()
                .try_for_each(advance_chunk)
        } else {
            write
                .positions
                .chunks_mut(AGENT_CHUNK)
                .zip(write.velocities.chunks_mut(AGENT_CHUNK))
                .enumerate()
                .try_for_each(advance_chunk)
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.global_tick
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Handle for readers on other threads.
    pub fn observer(&self) -> FlockObserver {
        self.observer.clone()
    }

    pub fn snapshot(&self) -> Arc<FlockFrame> {
        self.observer.latest()
    }

    pub fn agent_count(&self) -> usize {
        self.store.agent_count()
    }

    pub fn flock_count(&self) -> usize {
        self.store.flock_count()
    }

    /// Panics when `i >= agent_count()`.
    pub fn position(&self, i: usize) -> Vec3 {
        self.store.current().positions[i]
    }

    /// Panics when `i >= agent_count()`.
    pub fn velocity(&self, i: usize) -> Vec3 {
        self.store.current().velocities[i]
    }

    /// Panics when `i >= agent_count()`.
    pub fn flock_id(&self, i: usize) -> u32 {
        self.store.flock_id(i)
    }

    pub fn heading(&self, i: usize) -> Vec3 {
        heading_of(self.velocity(i))
    }

    pub fn orientation(&self, i: usize) -> Quat {
        orientation_of(self.velocity(i))
    }

    pub fn agent(&self, i: usize) -> AgentState {
        self.store.agent(i)
    }

    pub fn try_position(&self, i: usize) -> Option<Vec3> {
        self.store.current().positions.get(i).copied()
    }

    pub fn try_velocity(&self, i: usize) -> Option<Vec3> {
        self.store.current().velocities.get(i).copied()
    }

    pub fn try_flock_id(&self, i: usize) -> Option<u32> {
        self.store.flock_ids().get(i).copied()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.store.current().positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.store.current().velocities
    }
}
