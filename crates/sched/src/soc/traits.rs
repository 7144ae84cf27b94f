//! Memory and pipeline traits.
//!
//! This module defines the two seams between the scheduler and the rest of the
//! simulator. It provides:
//! 1. **Memory Port:** Fire-and-forget load/fetch issue used by the prefetcher.
//! 2. **Pipeline Probe:** The "has this thread drained?" query behind effective eviction.
//! 3. **Reference Implementations:** A recording port and an always-drained probe.

use crate::common::{AccessKind, NodeId};

/// Entry point into the memory hierarchy.
///
/// The return value of an access is never consulted, so the port has none.
pub trait MemoryPort {
    /// Issues one request at `addr`.
    fn issue(&mut self, kind: AccessKind, addr: u64);
}

/// Pipeline occupancy query.
///
/// Answers whether the node's pipeline still holds in-flight work for the
/// context allocated on it. The scheduler also checks its own event queue, so
/// a probe only needs to report what the queue cannot see (fetch buffers,
/// ROB, store buffer).
pub trait PipelineProbe {
    /// Returns true if `node` has no in-flight work left.
    fn is_drained(&self, node: NodeId) -> bool;
}

/// Probe for a pipeline with no state outside the event queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrainedPipeline;

impl PipelineProbe for DrainedPipeline {
    fn is_drained(&self, _node: NodeId) -> bool {
        true
    }
}

impl<F: Fn(NodeId) -> bool> PipelineProbe for F {
    fn is_drained(&self, node: NodeId) -> bool {
        self(node)
    }
}

/// Memory port that records every request in issue order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestLog {
    /// Requests seen so far.
    pub requests: Vec<(AccessKind, u64)>,
}

impl RequestLog {
    /// Creates an empty log.
    pub const fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Number of requests recorded.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if nothing was issued.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of requests of one kind.
    pub fn count(&self, kind: AccessKind) -> usize {
        self.requests.iter().filter(|(k, _)| *k == kind).count()
    }
}

impl MemoryPort for RequestLog {
    fn issue(&mut self, kind: AccessKind, addr: u64) {
        self.requests.push((kind, addr));
    }
}
