use crate::core::{NeighborStrategy, SimResult, SimulationConfig};
use crate::swarm::FlockSimulation;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Timing for one strategy over a benchmark run.
#[derive(Clone, Debug, Serialize)]
pub struct StrategyTiming {
    pub strategy: NeighborStrategy,
    pub agent_count: usize,
    pub ticks: usize,
    pub mean_tick_ms: f64,
    pub max_tick_ms: f64,
}

/// Benchmark - Runs one configuration under each neighbor strategy
pub struct FlockBenchmark {
    config: SimulationConfig,
    ticks: usize,
}

impl FlockBenchmark {
    pub fn new(config: SimulationConfig, ticks: usize) -> Self {
        FlockBenchmark { config, ticks }
    }

    /// Run every strategy from the same seeded start.
    pub fn run(&self) -> SimResult<Vec<StrategyTiming>> {
        let strategies = [NeighborStrategy::AllPairs, NeighborStrategy::Batched];
        info!(
            "📊 Running flock benchmark: {} agents, {} ticks per strategy",
            self.config.agent_count, self.ticks
        );

        let mut results = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            let timing = self.run_strategy(strategy)?;
            info!(
                "⏱️ [{:?}] mean {:.3} ms, max {:.3} ms",
                strategy, timing.mean_tick_ms, timing.max_tick_ms
            );
            results.push(timing);
        }
        Ok(results)
    }

    pub fn run_strategy(&self, strategy: NeighborStrategy) -> SimResult<StrategyTiming> {
        let mut config = self.config.clone().with_strategy(strategy);
        if config.seed.is_none() {
            config.seed = Some(0);
        }
        let mut sim = FlockSimulation::new(config)?;

        let mut total = Duration::ZERO;
        let mut max = Duration::ZERO;
        for _ in 0..self.ticks {
            let start = Instant::now();
            sim.step()?;
            let elapsed = start.elapsed();
            total += elapsed;
            max = max.max(elapsed);
        }

        let mean_tick_ms = if self.ticks > 0 {
            total.as_secs_f64() * 1000.0 / self.ticks as f64
        } else {
            0.0
        };

        Ok(StrategyTiming {
            strategy,
            agent_count: sim.agent_count(),
            ticks: self.ticks,
            mean_tick_ms,
            max_tick_ms: max.as_secs_f64() * 1000.0,
        })
    }

    /// Results as a JSON array.
    pub fn report_json(results: &[StrategyTiming]) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }
}
