//! Scale runs for the flock engine.
//!
//! These spawn large populations, run real ticks under each neighbor
//! strategy and report per-tick timings.
//!
//! Run: cargo test --release -- --nocapture --ignored

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::core::{NeighborStrategy, SimulationConfig};
    use crate::swarm::scheduler::FlockSimulation;

    /// 100K agents under the batched strategy.
    #[test]
    #[ignore]
    fn scale_100k_batched_ticks() {
        let sep = "=".repeat(72);
        println!("\n{}", sep);
        println!("  FLOCKSWARM: 100K AGENT BATCHED TICK TEST");
        println!("{}\n", sep);

        let cfg = SimulationConfig::new(100_000, 8)
            .with_seed(7)
            .with_strategy(NeighborStrategy::Batched);
        let max_speed = cfg.max_speed;

        let t0 = Instant::now();
        let mut sim = FlockSimulation::new(cfg).unwrap();
        println!("[1/3] Spawned {} agents in {:?}", sim.agent_count(), t0.elapsed());

        println!("\n[2/3] Running 50 ticks...");
        let mut times = Vec::with_capacity(50);
        for _ in 0..50 {
            let stats = sim.step().unwrap();
            times.push(stats.elapsed.as_secs_f64() * 1000.0);
        }
        times.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        println!(
            "  Mean: {:.2} ms  |  p50: {:.2} ms  |  p99: {:.2} ms",
            mean,
            times[times.len() / 2],
            times[times.len() * 99 / 100]
        );

        println!("\n[3/3] Checking invariants...");
        assert_eq!(sim.tick_count(), 50);
        for v in sim.velocities() {
            assert!(v.length() <= max_speed * (1.0 + 1e-5));
        }
        for p in sim.positions() {
            assert!(p.is_finite());
        }
        println!("  All speeds within {} and all positions finite", max_speed);
    }

    /// Both strategies at a size where all-pairs is still tractable.
    #[test]
    #[ignore]
    fn scale_10k_strategy_comparison() {
        println!("\n  Strategy comparison at 10K agents");
        for strategy in [NeighborStrategy::AllPairs, NeighborStrategy::Batched] {
            let cfg = SimulationConfig::new(10_000, 4)
                .with_seed(1)
                .with_strategy(strategy);
            let mut sim = FlockSimulation::new(cfg).unwrap();

            let t0 = Instant::now();
            for _ in 0..10 {
                sim.step().unwrap();
            }
            let per_tick = t0.elapsed() / 10;
            println!("  {:?}: {:?} per tick", strategy, per_tick);
            assert_eq!(sim.tick_count(), 10);
        }
    }
}
