use thiserror::Error;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Simulation error types
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration cannot start a simulation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `tick` was called with a negative or non-finite timestep.
    #[error("invalid timestep: {0}")]
    InvalidTimestep(f32),

    /// A cancellation token fired mid-tick. The write buffer was discarded.
    #[error("tick {tick} cancelled before completion")]
    Cancelled { tick: u64 },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}
