//! Per-thread scheduling units.
//!
//! This module contains the structures every hardware thread owns next to its
//! mapped list: the inactive-context buffer with its ranking policies, the
//! long-latency event predictor, and the memory pattern logger that feeds the
//! stall-driven prefetcher.

/// Inactive-context buffer and re-admission ranking policies.
pub mod ctxbuf;

/// Long-latency event predictor with recurrence phase classification.
pub mod llp;

/// Memory pattern logger and stall-driven prefetcher.
pub mod prefetch;
