//! Utilities

pub mod benchmark;

pub use benchmark::{FlockBenchmark, StrategyTiming};
