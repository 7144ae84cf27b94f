//! Collaborator Interfaces.
//!
//! The scheduling core does not model the memory hierarchy or the pipeline.
//! It reaches them through the narrow traits defined here.

/// Memory port and pipeline probe traits, plus simple implementations.
pub mod traits;

pub use traits::{DrainedPipeline, MemoryPort, PipelineProbe, RequestLog};
