//! Flock Engine
//!
//! Double-buffered SoA agent state advanced in data-parallel ticks.
//! Every agent reads only the previous tick's buffer and writes only its
//! own slot in the next one.

pub mod grid;
pub mod influence;
pub mod integrator;
pub mod limiter;
pub mod observer;
pub mod scheduler;
pub mod store;

#[cfg(feature = "python")]
pub mod py_api;

mod determinism_test;
mod scale_test;

pub use grid::SpatialHashGrid;
pub use influence::{FlockAggregates, Influence, InfluenceRules, NeighborIndex};
pub use observer::{FlockFrame, FlockObserver};
pub use scheduler::{CancelToken, FlockSimulation, TickPhase, TickStats};
pub use store::{AgentBuffer, AgentState, AgentStore};
