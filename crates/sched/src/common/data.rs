//! Memory Access Kinds.
//!
//! Prefetch requests leave the scheduling core through a narrow port that only
//! distinguishes data loads from instruction fetches. Stores are never issued
//! speculatively, so they have no representation here.

/// Kind of memory request issued to the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Data read, routed to the data cache.
    Load,

    /// Instruction fetch, routed to the instruction cache.
    Fetch,
}
