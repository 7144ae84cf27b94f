//! Per-core pipeline bookkeeping visible to the scheduler.
//!
//! The scheduler does not model pipeline stages. It only needs the set of
//! in-flight micro-ops, ordered by completion time, to drive the long-latency
//! predictor and to squash speculative work on recovery.

/// Time-ordered queue of outstanding micro-ops.
pub mod event_queue;

pub use event_queue::{EventQueue, MicroOp, UopKind};
