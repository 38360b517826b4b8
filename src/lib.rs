//! FlockSwarm Core - Data-Parallel Flocking Simulation
//!
//! A population of agents split into flocks, advanced in discrete ticks.
//! Each tick every agent reads the previous tick's state (separation,
//! flock and global cohesion, flock and global alignment, a spherical
//! container, a speed limit) and writes its own slot of the next state.
//! Completed ticks are published as immutable frames for concurrent readers.

pub mod core;
pub mod swarm;
pub mod utils;

#[cfg(feature = "python")]
use pyo3::prelude::*;

// Re-export key types
pub use crate::core::{NeighborStrategy, SeparationMetric, SimError, SimResult, SimulationConfig};
pub use swarm::{
    AgentState, CancelToken, FlockFrame, FlockObserver, FlockSimulation, TickPhase, TickStats,
};
pub use utils::FlockBenchmark;

/// Initialize tracing for the library.
#[cfg_attr(feature = "python", pyfunction)]
#[cfg_attr(feature = "python", pyo3(signature = (level=None)))]
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Python module initialization
#[cfg(feature = "python")]
#[pymodule]
fn flockswarm_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(setup_logging, m)?)?;
    m.add_class::<swarm::py_api::PyFlock>()?;
    Ok(())
}
