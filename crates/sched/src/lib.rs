//! SMT context scheduling core.
//!
//! This crate implements the resource-scheduling heart of a cycle-level
//! multi-core, multi-thread processor timing model:
//! 1. **Scheduler:** Maps contexts to hardware threads, allocates and evicts them
//!    with a two-phase protocol, and enforces a scheduling quantum.
//! 2. **Inactive-Context Buffer:** A bounded per-thread table of evicted contexts with
//!    starvation override and most-recently-evicted, random and round-robin ranking.
//! 3. **Event Queue:** A per-core queue of in-flight micro-ops ordered by `(ready_cycle, id)`.
//! 4. **Long-Latency Predictor:** Per-instruction recurrence patterns with phase classification.
//! 5. **Prefetch:** A per-thread memory pattern logger and a stall-driven prefetcher.

/// Common types (ids, affinity, access kinds, errors).
pub mod common;
/// Scheduler configuration (defaults, ranking policy, hierarchical config structures).
pub mod config;
/// Scheduling core (contexts, threads, event queue, units, CPU).
pub mod core;
/// Simulation driver.
pub mod sim;
/// Collaborator interfaces (memory port, pipeline probe).
pub mod soc;
/// Scheduler statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Scheduling state for every core, thread and context.
pub use crate::core::Cpu;
/// Top-level simulator; construct with `Simulator::new`.
pub use crate::sim::Simulator;
