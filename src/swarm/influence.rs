//! Neighbor Influence Evaluator
//!
//! Computes separation, cohesion and alignment deltas for one agent from the
//! read-only current buffer. Two strategies produce the same rule:
//!
//! - `AllPairs` scans every other agent once per evaluated agent (O(N²)).
//! - `Batched` reduces per-flock sums once per tick, derives each agent's
//!   "everyone but me" means by subtraction, and finds separation candidates
//!   through a spatial hash grid.
//!
//! Nothing here writes agent state, so agents evaluate independently.

use glam::Vec3;
use rayon::prelude::*;

use super::grid::SpatialHashGrid;
use super::store::AgentBuffer;
use crate::core::{NeighborStrategy, SimulationConfig};

/// Agents per partial reduction. Fixed so the reduction order never depends
/// on the worker count.
const AGGREGATE_CHUNK: usize = 1024;

/// Rule weights and thresholds, copied out of the configuration once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfluenceRules {
    pub flock_cohesion: f32,
    pub global_cohesion: f32,
    pub flock_alignment: f32,
    pub global_alignment: f32,
    pub separation_threshold_sq: f32,
    pub separation_radius: f32,
}

impl InfluenceRules {
    pub fn from_config(config: &SimulationConfig) -> Self {
        InfluenceRules {
            flock_cohesion: config.flock_cohesion_weight,
            global_cohesion: config.global_cohesion_weight,
            flock_alignment: config.flock_alignment_weight,
            global_alignment: config.global_alignment_weight,
            separation_threshold_sq: config.separation_threshold_sq(),
            separation_radius: config.effective_separation_radius(),
        }
    }

    /// Compose the three rules onto `velocity` in reference order: separation,
    /// cohesion, then alignment measured against the already-adjusted velocity.
    pub fn compose(&self, position: Vec3, velocity: Vec3, summary: &NeighborSummary) -> Influence {
        let mut v = velocity;

        let separation = summary.separation;
        v += separation;

        let mut cohesion = Vec3::ZERO;
        if let Some(flock) = summary.flock {
            cohesion += (flock.position - position) * self.flock_cohesion;
        }
        if let Some(all) = summary.global {
            cohesion += (all.position - position) * self.global_cohesion;
        }
        v += cohesion;

        let mut alignment = Vec3::ZERO;
        if let Some(flock) = summary.flock {
            alignment += (flock.velocity - v) * self.flock_alignment;
        }
        if let Some(all) = summary.global {
            alignment += (all.velocity - v) * self.global_alignment;
        }
        v += alignment;

        Influence {
            separation,
            cohesion,
            alignment,
            velocity: v,
        }
    }
}

/// Mean position and velocity of a neighbor set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Means {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Everything the rules need to know about an agent's neighbors.
///
/// `flock` is `None` when the agent is alone in its flock and `global` is
/// `None` when it is alone in the simulation; the matching terms are zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborSummary {
    pub separation: Vec3,
    pub flock: Option<Means>,
    pub global: Option<Means>,
}

/// Velocity deltas for one agent plus the velocity after applying them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Influence {
    pub separation: Vec3,
    pub cohesion: Vec3,
    pub alignment: Vec3,
    pub velocity: Vec3,
}

/// Per-flock and population-wide sums over the current buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct FlockAggregates {
    pub position_sums: Vec<Vec3>,
    pub velocity_sums: Vec<Vec3>,
    pub members: Vec<u32>,
    pub total_position: Vec3,
    pub total_velocity: Vec3,
    pub population: usize,
}

impl FlockAggregates {
    fn empty(flock_count: usize) -> Self {
        FlockAggregates {
            position_sums: vec![Vec3::ZERO; flock_count],
            velocity_sums: vec![Vec3::ZERO; flock_count],
            members: vec![0; flock_count],
            total_position: Vec3::ZERO,
            total_velocity: Vec3::ZERO,
            population: 0,
        }
    }

    fn accumulate(
        flock_count: usize,
        positions: &[Vec3],
        velocities: &[Vec3],
        flock_ids: &[u32],
    ) -> Self {
        let mut agg = Self::empty(flock_count);
        for ((p, v), f) in positions.iter().zip(velocities).zip(flock_ids) {
            let f = *f as usize;
            agg.position_sums[f] += *p;
            agg.velocity_sums[f] += *v;
            agg.members[f] += 1;
            agg.total_position += *p;
            agg.total_velocity += *v;
        }
        agg.population = positions.len();
        agg
    }

    fn merge(mut self, other: &FlockAggregates) -> Self {
        for f in 0..self.members.len() {
            self.position_sums[f] += other.position_sums[f];
            self.velocity_sums[f] += other.velocity_sums[f];
            self.members[f] += other.members[f];
        }
        self.total_position += other.total_position;
        self.total_velocity += other.total_velocity;
        self.population += other.population;
        self
    }

    /// Reduce the current buffer in fixed-size chunks, combined in chunk order.
    /// The result is bit-identical whether or not `parallel` is set.
    pub fn compute(
        current: &AgentBuffer,
        flock_ids: &[u32],
        flock_count: usize,
        parallel: bool,
    ) -> Self {
        let reduce_chunk = |c: usize| {
            let start = c * AGGREGATE_CHUNK;
            let end = (start + AGGREGATE_CHUNK).min(current.len());
            Self::accumulate(
                flock_count,
                &current.positions[start..end],
                &current.velocities[start..end],
                &flock_ids[start..end],
            )
        };

        let n_chunks = current.len().div_ceil(AGGREGATE_CHUNK);
        let partials: Vec<FlockAggregates> = if parallel {
            (0..n_chunks).into_par_iter().map(reduce_chunk).collect()
        } else {
            (0..n_chunks).map(reduce_chunk).collect()
        };

        partials
            .iter()
            .fold(Self::empty(flock_count), |acc, part| acc.merge(part))
    }

    /// Means over every agent except `i`.
    pub fn summarize_without(&self, position: Vec3, velocity: Vec3, flock: u32) -> (Option<Means>, Option<Means>) {
        let f = flock as usize;
        let flock_others = self.members[f].saturating_sub(1);
        let flock_means = (flock_others > 0).then(|| {
            let n = flock_others as f32;
            Means {
                position: (self.position_sums[f] - position) / n,
                velocity: (self.velocity_sums[f] - velocity) / n,
            }
        });

        let others = self.population.saturating_sub(1);
        let global_means = (others > 0).then(|| {
            let n = others as f32;
            Means {
                position: (self.total_position - position) / n,
                velocity: (self.total_velocity - velocity) / n,
            }
        });

        (flock_means, global_means)
    }
}

/// Per-tick neighbor index for the chosen strategy.
pub enum NeighborIndex {
    AllPairs,
    Batched {
        aggregates: FlockAggregates,
        grid: SpatialHashGrid,
    },
}

impl NeighborIndex {
    /// Build whatever the strategy needs from the current buffer.
    pub fn build(
        strategy: NeighborStrategy,
        rules: &InfluenceRules,
        current: &AgentBuffer,
        flock_ids: &[u32],
        flock_count: usize,
        parallel: bool,
    ) -> Self {
        match strategy {
            NeighborStrategy::AllPairs => NeighborIndex::AllPairs,
            NeighborStrategy::Batched => {
                let aggregates = FlockAggregates::compute(current, flock_ids, flock_count, parallel);
                let mut grid = SpatialHashGrid::new(current.len(), rules.separation_radius);
                grid.rebuild(&current.positions);
                NeighborIndex::Batched { aggregates, grid }
            }
        }
    }
}

/// Read-only view used by every worker during one tick.
pub struct Evaluator<'a> {
    pub rules: &'a InfluenceRules,
    pub current: &'a AgentBuffer,
    pub flock_ids: &'a [u32],
    pub index: &'a NeighborIndex,
}

impl<'a> Evaluator<'a> {
    pub fn summarize(&self, i: usize) -> NeighborSummary {
        match self.index {
            NeighborIndex::AllPairs => self.scan_all_pairs(i),
            NeighborIndex::Batched { aggregates, grid } => self.scan_batched(i, aggregates, grid),
        }
    }

    pub fn evaluate(&self, i: usize) -> Influence {
        let summary = self.summarize(i);
        self.rules
            .compose(self.current.positions[i], self.current.velocities[i], &summary)
    }

    /// Single pass over every other agent: separation plus flock and global sums.
    fn scan_all_pairs(&self, i: usize) -> NeighborSummary {
        let positions = &self.current.positions;
        let velocities = &self.current.velocities;
        let p = positions[i];
        let flock = self.flock_ids[i];

        let mut separation = Vec3::ZERO;
        let (mut flock_pos, mut flock_vel, mut flock_n) = (Vec3::ZERO, Vec3::ZERO, 0u32);
        let (mut all_pos, mut all_vel) = (Vec3::ZERO, Vec3::ZERO);

        for j in 0..positions.len() {
            if j == i {
                continue;
            }
            let d = p - positions[j];
            if d.length_squared() < self.rules.separation_threshold_sq {
                separation += d;
            }
            if self.flock_ids[j] == flock {
                flock_pos += positions[j];
                flock_vel += velocities[j];
                flock_n += 1;
            }
            all_pos += positions[j];
            all_vel += velocities[j];
        }

        let others = positions.len() - 1;
        NeighborSummary {
            separation,
            flock: (flock_n > 0).then(|| Means {
                position: flock_pos / flock_n as f32,
                velocity: flock_vel / flock_n as f32,
            }),
            global: (others > 0).then(|| Means {
                position: all_pos / others as f32,
                velocity: all_vel / others as f32,
            }),
        }
    }

    fn scan_batched(&self, i: usize, aggregates: &FlockAggregates, grid: &SpatialHashGrid) -> NeighborSummary {
        let positions = &self.current.positions;
        let p = positions[i];

        let mut separation = Vec3::ZERO;
        grid.query_neighbors(i as u32, p, self.rules.separation_radius, |j| {
            let d = p - positions[j as usize];
            if d.length_squared() < self.rules.separation_threshold_sq {
                separation += d;
            }
        });

        let (flock, global) =
            aggregates.summarize_without(p, self.current.velocities[i], self.flock_ids[i]);

        NeighborSummary {
            separation,
            flock,
            global,
        }
    }
}
