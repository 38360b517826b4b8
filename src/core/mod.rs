//! Core
//!
//! Configuration and error types shared by every swarm module.

pub mod config;
pub mod error;

pub use config::{NeighborStrategy, SeparationMetric, SimulationConfig};
pub use error::{SimError, SimResult};
