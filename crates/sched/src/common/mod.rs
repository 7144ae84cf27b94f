//! Common types shared by every scheduling component.
//!
//! This module provides the vocabulary the rest of the crate is written in:
//! 1. **Identifiers:** Stable context ids, node (core/thread) coordinates, and the cycle type.
//! 2. **Affinity:** The bitmap of nodes a context may run on.
//! 3. **Memory Access:** The kinds of requests issued to the memory hierarchy.
//! 4. **Error Handling:** Fatal scheduler invariant violations.

/// Memory access kinds issued through the memory port.
pub mod data;

/// Fatal scheduler errors.
pub mod error;

/// Identifiers, cycles, and affinity bitmaps.
pub mod ids;

pub use data::AccessKind;
pub use error::SchedError;
pub use ids::{Affinity, ContextId, Cycle, NodeId};
