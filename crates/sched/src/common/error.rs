//! Scheduler invariant violations.
//!
//! This module defines the fatal error tier of the scheduler. It provides:
//! 1. **Structural Errors:** Mapping, allocation, and eviction protocol violations.
//! 2. **Buffer Errors:** Inactive-context buffer capacity and membership violations.
//! 3. **Diagnostics:** Every variant names the context and node involved.
//!
//! None of these are recoverable at runtime. They indicate a logic error in the
//! scheduler or in the caller driving it, and the simulation is expected to
//! stop with the error's message. Soft conditions (predictor table full, no
//! stride found, no sibling about to stall) are not errors and never reach
//! this type.

use thiserror::Error;

use super::ids::{ContextId, NodeId};

/// Fatal scheduler invariant violation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchedError {
    /// A running context has affinity with no hardware thread at all.
    #[error("{ctx}: no node with affinity found")]
    NoAffinity {
        /// Context that cannot be placed.
        ctx: ContextId,
    },

    /// The context id is not present in the context table.
    #[error("{0}: unknown context")]
    UnknownContext(ContextId),

    /// Attempted to map a context that is already mapped or allocated.
    #[error("{ctx}: already mapped")]
    AlreadyMapped {
        /// Context being mapped twice.
        ctx: ContextId,
    },

    /// The context is not in the node's mapped list.
    #[error("{ctx}: not mapped to {node}")]
    NotMapped {
        /// Offending context.
        ctx: ContextId,
        /// Node the caller assumed it was mapped to.
        node: NodeId,
    },

    /// The context is not the one allocated on the node.
    #[error("{ctx}: not allocated on {node}")]
    NotAllocated {
        /// Offending context.
        ctx: ContextId,
        /// Node the caller assumed it was allocated on.
        node: NodeId,
    },

    /// Attempted to allocate or unmap a context that is currently allocated.
    #[error("{ctx}: already allocated")]
    AlreadyAllocated {
        /// Offending context.
        ctx: ContextId,
    },

    /// The context already carries an eviction signal (double eviction).
    #[error("{ctx}: eviction already signaled on {node}")]
    EvictionPending {
        /// Offending context.
        ctx: ContextId,
        /// Node holding the context.
        node: NodeId,
    },

    /// Effective eviction attempted without a prior eviction signal.
    #[error("{ctx}: evicted from {node} without a signal")]
    EvictionNotSignaled {
        /// Offending context.
        ctx: ContextId,
        /// Node holding the context.
        node: NodeId,
    },

    /// Effective eviction attempted while the context is in speculative mode.
    #[error("{ctx}: evicted from {node} in speculative mode")]
    SpeculativeEviction {
        /// Offending context.
        ctx: ContextId,
        /// Node holding the context.
        node: NodeId,
    },

    /// Effective eviction attempted while the pipeline still holds work.
    #[error("{ctx}: evicted from {node} with a non-empty pipeline")]
    PipelineNotDrained {
        /// Offending context.
        ctx: ContextId,
        /// Node holding the context.
        node: NodeId,
    },

    /// Attempted to allocate onto a node that already holds a context.
    #[error("{node}: already running {running}")]
    ThreadBusy {
        /// Node being allocated.
        node: NodeId,
        /// Context currently occupying it.
        running: ContextId,
    },

    /// Insert into an inactive-context buffer with no free or matching slot.
    #[error("{node}: inactive context buffer full, cannot insert {ctx}")]
    BufferFull {
        /// Context being inserted.
        ctx: ContextId,
        /// Owner of the buffer.
        node: NodeId,
    },

    /// Removal of a context the inactive-context buffer does not track.
    #[error("{node}: {ctx} not present in inactive context buffer")]
    NotBuffered {
        /// Context being removed.
        ctx: ContextId,
        /// Owner of the buffer.
        node: NodeId,
    },

    /// A node coordinate outside the configured core/thread grid.
    #[error("{0}: no such node")]
    UnknownNode(NodeId),
}
