//! Simulation driver.

/// Top-level simulator tying the CPU to its memory port and pipeline probe.
pub mod simulator;

pub use simulator::Simulator;
