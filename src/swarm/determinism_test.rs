//! Whole-tick behavior checks across store, influence, integrator and scheduler.
//!
//! Run: cargo test determinism

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use glam::Vec3;

    use crate::core::{NeighborStrategy, SeparationMetric, SimulationConfig};
    use crate::swarm::scheduler::FlockSimulation;
    use crate::swarm::store::AgentState;

    /// Straight transcription of the flocking rules over a plain agent list.
    fn reference_step(agents: &[AgentState], cfg: &SimulationConfig, dt: f32) -> Vec<AgentState> {
        let n = agents.len();
        let threshold = cfg.separation_threshold_sq();
        agents
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut v = a.velocity;

                let mut sep = Vec3::ZERO;
                for (j, b) in agents.iter().enumerate() {
                    if j != i && (a.position - b.position).length_squared() < threshold {
                        sep += a.position - b.position;
                    }
                }
                v += sep;

                let mates: Vec<&AgentState> = agents
                    .iter()
                    .enumerate()
                    .filter(|(j, b)| *j != i && b.flock_id == a.flock_id)
                    .map(|(_, b)| b)
                    .collect();
                let others: Vec<&AgentState> = agents
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, b)| b)
                    .collect();
                let mean = |set: &[&AgentState]| {
                    let k = set.len() as f32;
                    (
                        set.iter().map(|b| b.position).sum::<Vec3>() / k,
                        set.iter().map(|b| b.velocity).sum::<Vec3>() / k,
                    )
                };

                let mut coh = Vec3::ZERO;
                if !mates.is_empty() {
                    coh += (mean(&mates).0 - a.position) * cfg.flock_cohesion_weight;
                }
                if n > 1 {
                    coh += (mean(&others).0 - a.position) * cfg.global_cohesion_weight;
                }
                v += coh;

                let mut ali = Vec3::ZERO;
                if !mates.is_empty() {
                    ali += (mean(&mates).1 - v) * cfg.flock_alignment_weight;
                }
                if n > 1 {
                    ali += (mean(&others).1 - v) * cfg.global_alignment_weight;
                }
                v += ali;

                let mag = a.position.length();
                if mag > cfg.boundary_radius {
                    v += -a.position * (mag - cfg.boundary_radius);
                }
                if v.length() > cfg.max_speed {
                    v = v.normalize() * cfg.max_speed;
                }

                AgentState::new(a.position + v * dt, v, a.flock_id)
            })
            .collect()
    }

    fn agents_of(sim: &FlockSimulation) -> Vec<AgentState> {
        (0..sim.agent_count()).map(|i| sim.agent(i)).collect()
    }

    fn run(cfg: SimulationConfig, ticks: usize) -> Vec<Vec<Vec3>> {
        let mut sim = FlockSimulation::new(cfg).unwrap();
        let mut frames = vec![sim.positions().to_vec()];
        for _ in 0..ticks {
            sim.step().unwrap();
            frames.push(sim.positions().to_vec());
        }
        frames
    }

    #[test]
    fn two_agent_round_trip_matches_hand_computation() {
        let cfg = SimulationConfig::new(2, 1);
        let agents = [
            AgentState::new(Vec3::new(-0.5, 0.0, 0.0), Vec3::ZERO, 0),
            AgentState::new(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, 0),
        ];
        let mut sim = FlockSimulation::from_agents(cfg.clone(), &agents).unwrap();
        sim.tick(0.02).unwrap();

        // sep -1, cohesion 0.5 + 0.1, alignment (0.5 + 0.1) * 0.4
        assert!(sim.velocity(0).abs_diff_eq(Vec3::new(-0.16, 0.0, 0.0), 1e-6));
        assert!(sim.velocity(1).abs_diff_eq(Vec3::new(0.16, 0.0, 0.0), 1e-6));
        assert!(sim.position(0).abs_diff_eq(Vec3::new(-0.5032, 0.0, 0.0), 1e-6));

        let mut expected = reference_step(&agents, &cfg, 0.02);
        for _ in 0..2 {
            sim.tick(0.02).unwrap();
            expected = reference_step(&expected, &cfg, 0.02);
        }
        for (i, e) in expected.iter().enumerate() {
            assert!(sim.position(i).abs_diff_eq(e.position, 1e-5));
            assert!(sim.velocity(i).abs_diff_eq(e.velocity, 1e-5));
        }
    }

    #[test]
    fn both_strategies_track_reference_rules() {
        for strategy in [NeighborStrategy::AllPairs, NeighborStrategy::Batched] {
            for metric in [SeparationMetric::SquaredAgainstLinear, SeparationMetric::Euclidean] {
                let cfg = SimulationConfig::new(60, 3)
                    .with_seed(11)
                    .with_strategy(strategy)
                    .with_separation_metric(metric);
                let mut sim = FlockSimulation::new(cfg.clone()).unwrap();
                let mut expected = agents_of(&sim);

                for _ in 0..5 {
                    sim.step().unwrap();
                    expected = reference_step(&expected, &cfg, cfg.timestep);
                }
                for (i, e) in expected.iter().enumerate() {
                    assert!(
                        sim.position(i).abs_diff_eq(e.position, 1e-3),
                        "{:?}/{:?} agent {} drifted: {:?} vs {:?}",
                        strategy,
                        metric,
                        i,
                        sim.position(i),
                        e.position
                    );
                    assert_eq!(sim.flock_id(i), e.flock_id);
                }
            }
        }
    }

    #[test]
    fn worker_count_never_changes_results() {
        for strategy in [NeighborStrategy::AllPairs, NeighborStrategy::Batched] {
            let base = SimulationConfig::new(3000, 4).with_seed(42).with_strategy(strategy);
            let serial = run(base.clone().with_parallelism(false, 0), 4);
            let pooled = run(base.clone().with_parallelism(true, 4), 4);
            let single = run(base.with_parallelism(true, 1), 4);
            assert_eq!(serial, pooled, "{:?} diverged across worker counts", strategy);
            assert_eq!(serial, single);
        }
    }

    #[test]
    fn same_seed_same_run() {
        let cfg = SimulationConfig::new(500, 3).with_seed(9);
        assert_eq!(run(cfg.clone(), 5), run(cfg, 5));
        assert_ne!(
            run(SimulationConfig::new(50, 3).with_seed(1), 0),
            run(SimulationConfig::new(50, 3).with_seed(2), 0)
        );
    }

    #[test]
    fn speed_bounded_after_every_tick() {
        let cfg = SimulationConfig::new(400, 3)
            .with_seed(3)
            .with_cohesion(5.0, 2.0);
        let max = cfg.max_speed;
        let mut sim = FlockSimulation::new(cfg).unwrap();
        for _ in 0..20 {
            sim.step().unwrap();
            for v in sim.velocities() {
                assert!(v.length() <= max * (1.0 + 1e-5), "speed {} over {}", v.length(), max);
            }
        }
    }

    #[test]
    fn escaped_agent_returns_toward_container() {
        let cfg = SimulationConfig::new(1, 1);
        let agents = [AgentState::new(
            Vec3::new(0.0, 0.0, 40.0),
            Vec3::new(0.0, 0.0, 5.0),
            0,
        )];
        let mut sim = FlockSimulation::from_agents(cfg, &agents).unwrap();
        let mut last = sim.position(0).length();
        for _ in 0..10 {
            sim.step().unwrap();
            let r = sim.position(0).length();
            assert!(r < last);
            last = r;
        }
    }

    #[test]
    fn lone_agent_keeps_its_velocity() {
        let cfg = SimulationConfig::new(1, 1);
        let v = Vec3::new(1.0, -2.0, 0.5);
        let mut sim =
            FlockSimulation::from_agents(cfg, &[AgentState::new(Vec3::ONE, v, 0)]).unwrap();
        sim.tick(0.1).unwrap();
        assert_eq!(sim.velocity(0), v);
        assert!(sim.position(0).abs_diff_eq(Vec3::ONE + v * 0.1, 1e-6));
    }

    #[test]
    fn readers_only_ever_see_complete_frames() {
        let cfg = SimulationConfig::new(2000, 3).with_seed(21);
        let expected = run(cfg.clone(), 15);

        let mut sim = FlockSimulation::new(cfg).unwrap();
        let observer = sim.observer();
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while !done.load(Ordering::Acquire) {
                    let frame = observer.latest();
                    if seen.last().map_or(true, |f: &Arc<_>| !Arc::ptr_eq(f, &frame)) {
                        seen.push(frame);
                    }
                }
                seen.push(observer.latest());
                seen
            })
        };

        for _ in 0..15 {
            sim.step().unwrap();
        }
        done.store(true, Ordering::Release);
        let seen = reader.join().unwrap();

        assert_eq!(seen.last().unwrap().tick(), 15);
        for frame in &seen {
            assert_eq!(frame.positions(), &expected[frame.tick() as usize][..]);
        }
    }

    #[test]
    fn held_frame_does_not_block_or_change() {
        let mut sim = FlockSimulation::new(SimulationConfig::new(100, 2).with_seed(4)).unwrap();
        sim.step().unwrap();
        let held = sim.snapshot();
        let copy = held.positions().to_vec();

        for _ in 0..3 {
            sim.step().unwrap();
        }
        assert_eq!(held.tick(), 1);
        assert_eq!(held.positions(), &copy[..]);
        assert_ne!(sim.positions(), &copy[..]);
    }
}
