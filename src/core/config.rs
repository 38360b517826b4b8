use serde::{Deserialize, Serialize};

use super::error::{SimError, SimResult};

/// How neighbor influence is gathered for each agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NeighborStrategy {
    /// Every agent scans every other agent in the current buffer.
    AllPairs,
    /// Per-flock sums are reduced once per tick and separation queries a spatial hash grid.
    #[default]
    Batched,
}

/// Distance test used by the separation rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SeparationMetric {
    /// `|d|^2 < separation_distance`. The effective radius is `sqrt(separation_distance)`.
    #[default]
    SquaredAgainstLinear,
    /// `|d|^2 < separation_distance^2`.
    Euclidean,
}

/// Simulation hyperparameters. Immutable once a simulation is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub agent_count: usize,
    pub flock_count: usize,
    pub max_speed: f32,
    pub flock_cohesion_weight: f32,
    pub global_cohesion_weight: f32,
    pub flock_alignment_weight: f32,
    pub global_alignment_weight: f32,
    pub separation_distance: f32,
    pub boundary_radius: f32,
    /// Default step used by `FlockSimulation::step`.
    pub timestep: f32,
    /// Seed for spawn randomness. `None` draws from entropy.
    pub seed: Option<u64>,
    pub strategy: NeighborStrategy,
    pub separation_metric: SeparationMetric,
    /// Spread per-agent work over rayon workers.
    pub parallel: bool,
    /// Size of a dedicated worker pool. 0 uses the global rayon pool.
    pub max_threads: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            agent_count: 200,
            flock_count: 3,
            max_speed: 10.0,
            flock_cohesion_weight: 0.5,
            global_cohesion_weight: 0.1,
            flock_alignment_weight: 0.5,
            global_alignment_weight: 0.1,
            separation_distance: 4.0,
            boundary_radius: 25.0,
            timestep: 1.0 / 50.0,
            seed: None,
            strategy: NeighborStrategy::default(),
            separation_metric: SeparationMetric::default(),
            parallel: true,
            max_threads: 0,
        }
    }
}

impl SimulationConfig {
    pub fn new(agent_count: usize, flock_count: usize) -> Self {
        SimulationConfig {
            agent_count,
            flock_count,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_strategy(mut self, strategy: NeighborStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_separation_metric(mut self, metric: SeparationMetric) -> Self {
        self.separation_metric = metric;
        self
    }

    pub fn with_cohesion(mut self, flock: f32, global: f32) -> Self {
        self.flock_cohesion_weight = flock;
        self.global_cohesion_weight = global;
        self
    }

    pub fn with_alignment(mut self, flock: f32, global: f32) -> Self {
        self.flock_alignment_weight = flock;
        self.global_alignment_weight = global;
        self
    }

    pub fn with_parallelism(mut self, parallel: bool, max_threads: usize) -> Self {
        self.parallel = parallel;
        self.max_threads = max_threads;
        self
    }

    /// Checks every field a running simulation depends on.
    pub fn validate(&self) -> SimResult<()> {
        if self.flock_count == 0 {
            return Err(SimError::InvalidConfig("flock_count must be at least 1".into()));
        }

        let positive = [
            ("max_speed", self.max_speed),
            ("separation_distance", self.separation_distance),
            ("boundary_radius", self.boundary_radius),
            ("timestep", self.timestep),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let weights = [
            ("flock_cohesion_weight", self.flock_cohesion_weight),
            ("global_cohesion_weight", self.global_cohesion_weight),
            ("flock_alignment_weight", self.flock_alignment_weight),
            ("global_alignment_weight", self.global_alignment_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() {
                return Err(SimError::InvalidConfig(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Euclidean radius inside which the separation rule fires.
    pub fn effective_separation_radius(&self) -> f32 {
        match self.separation_metric {
            SeparationMetric::SquaredAgainstLinear => self.separation_distance.sqrt(),
            SeparationMetric::Euclidean => self.separation_distance,
        }
    }

    /// Squared-distance threshold compared against `|d|^2`.
    pub fn separation_threshold_sq(&self) -> f32 {
        match self.separation_metric {
            SeparationMetric::SquaredAgainstLinear => self.separation_distance,
            SeparationMetric::Euclidean => self.separation_distance * self.separation_distance,
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
