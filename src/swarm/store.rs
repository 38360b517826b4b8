//! Agent Store
//!
//! Flat Struct-of-Arrays agent state, double-buffered. The current buffer is
//! shared read-only (readers may hold it across ticks); the write buffer is
//! owned exclusively and fully overwritten every tick.

use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, UnitBall};
use tracing::{debug, info};

use crate::core::{SimError, SimResult, SimulationConfig};

/// One agent's state, used to seed fixtures and to read a single agent back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub flock_id: u32,
}

impl AgentState {
    pub fn new(position: Vec3, velocity: Vec3, flock_id: u32) -> Self {
        AgentState {
            position,
            velocity,
            flock_id,
        }
    }
}

/// One buffer of per-agent kinematics, indexed by agent id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentBuffer {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl AgentBuffer {
    pub fn zeroed(len: usize) -> Self {
        AgentBuffer {
            positions: vec![Vec3::ZERO; len],
            velocities: vec![Vec3::ZERO; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Double-buffered agent storage plus the immutable flock partition.
pub struct AgentStore {
    flock_ids: Arc<[u32]>,
    flock_count: usize,
    current: Arc<AgentBuffer>,
    write: AgentBuffer,
}

impl AgentStore {
    /// Spawn `config.agent_count` agents uniformly inside the container sphere
    /// with velocities uniform inside the `max_speed` sphere.
    pub fn spawn(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n = config.agent_count;
        let mut buffer = AgentBuffer::zeroed(n);
        for i in 0..n {
            buffer.positions[i] = sample_in_ball(&mut rng) * config.boundary_radius;
            buffer.velocities[i] = sample_in_ball(&mut rng) * config.max_speed;
        }

        let flock_ids: Arc<[u32]> = (0..n)
            .map(|i| partition_flock(i, n, config.flock_count))
            .collect();

        info!(
            "[Store] Spawned {} agents across {} flocks (radius={}, max_speed={})",
            n, config.flock_count, config.boundary_radius, config.max_speed
        );

        Ok(Self::from_parts(buffer, flock_ids, config.flock_count))
    }

    /// Build a store from explicit agent states.
    pub fn from_agents(agents: &[AgentState], flock_count: usize) -> SimResult<Self> {
        if flock_count == 0 {
            return Err(SimError::InvalidConfig("flock_count must be at least 1".into()));
        }
        if let Some(bad) = agents.iter().position(|a| a.flock_id as usize >= flock_count) {
            return Err(SimError::InvalidConfig(format!(
                "agent {} has flock id {} outside [0, {})",
                bad, agents[bad].flock_id, flock_count
            )));
        }

        let buffer = AgentBuffer {
            positions: agents.iter().map(|a| a.position).collect(),
            velocities: agents.iter().map(|a| a.velocity).collect(),
        };
        let flock_ids: Arc<[u32]> = agents.iter().map(|a| a.flock_id).collect();

        debug!("[Store] Loaded {} fixture agents", agents.len());
        Ok(Self::from_parts(buffer, flock_ids, flock_count))
    }

    fn from_parts(buffer: AgentBuffer, flock_ids: Arc<[u32]>, flock_count: usize) -> Self {
        AgentStore {
            flock_ids,
            flock_count,
            write: buffer.clone(),
            current: Arc::new(buffer),
        }
    }

    #[inline]
    pub fn agent_count(&self) -> usize {
        self.flock_ids.len()
    }

    #[inline]
    pub fn flock_count(&self) -> usize {
        self.flock_count
    }

    #[inline]
    pub fn flock_id(&self, i: usize) -> u32 {
        self.flock_ids[i]
    }

    pub fn flock_ids(&self) -> &Arc<[u32]> {
        &self.flock_ids
    }

    pub fn current(&self) -> &Arc<AgentBuffer> {
        &self.current
    }

    pub fn agent(&self, i: usize) -> AgentState {
        AgentState::new(
            self.current.positions[i],
            self.current.velocities[i],
            self.flock_ids[i],
        )
    }

    /// Read-only current buffer, writable next buffer, and the flock partition.
    pub fn split(&mut self) -> (&AgentBuffer, &mut AgentBuffer, &[u32]) {
        (self.current.as_ref(), &mut self.write, &self.flock_ids[..])
    }

    /// Promote the write buffer to current. `publish` sees the new current
    /// buffer before the old one is reclaimed as the next write target.
    pub fn commit<F>(&mut self, publish: F)
    where
        F: FnOnce(&Arc<AgentBuffer>),
    {
        let n = self.agent_count();
        let written = std::mem::take(&mut self.write);
        let retired = std::mem::replace(&mut self.current, Arc::new(written));
        publish(&self.current);

        // A reader may still hold the retired buffer; never write into it.
        self.write = Arc::try_unwrap(retired).unwrap_or_else(|_| {
            debug!("[Store] Retired buffer still shared, allocating a fresh write target");
            AgentBuffer::zeroed(n)
        });
    }
}

/// Contiguous flock partition: `floor(i / n * flock_count)`.
#[inline]
pub fn partition_flock(i: usize, n: usize, flock_count: usize) -> u32 {
    ((i * flock_count) / n.max(1)) as u32
}

fn sample_in_ball<R: Rng>(rng: &mut R) -> Vec3 {
    let [x, y, z]: [f64; 3] = UnitBall.sample(rng);
    Vec3::new(x as f32, y as f32, z as f32)
}
