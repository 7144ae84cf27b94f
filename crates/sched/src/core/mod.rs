//! Scheduling core.
//!
//! This module contains the scheduler proper: the context arena, the
//! hardware threads and cores, the per-core event queue, the per-thread
//! units (inactive-context buffer, long-latency predictor, memory pattern
//! logger) and the `Cpu` that drives them cycle by cycle.

/// Context arena and lifecycle bits.
pub mod context;

/// Scheduling pass, eviction protocol, prediction and prefetch plumbing.
pub mod cpu;

/// Per-core event queue of in-flight micro-ops.
pub mod pipeline;

/// Hardware threads and cores.
pub mod thread;

/// Per-thread units (inactive-context buffer, predictor, logger, prefetcher).
pub mod units;

pub use self::context::{ArchSnapshot, Context, ContextTable};
pub use self::cpu::Cpu;
pub use self::thread::{Core, HardwareThread};
