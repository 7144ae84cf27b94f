//! Identifier Types.
//!
//! Strong types for the handful of integers that flow through the scheduler.
//! Mixing up a context id with a node index is the classic scheduler bug, so
//! neither is a bare `usize`.

use std::fmt;

use bitvec::prelude::*;

/// Simulation time, in cycles.
pub type Cycle = u64;

/// Stable identifier of a schedulable context (software thread/process).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// A core/thread pair: one hardware slot a context can occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId {
    /// Core index.
    pub core: usize,
    /// Thread index within the core.
    pub thread: usize,
}

impl NodeId {
    /// Creates a node coordinate.
    #[inline]
    pub const fn new(core: usize, thread: usize) -> Self {
        Self { core, thread }
    }

    /// Flattened node number, `core * threads_per_core + thread`.
    ///
    /// This is the bit position used by [`Affinity`].
    #[inline]
    pub const fn flat(self, threads_per_core: usize) -> usize {
        self.core * threads_per_core + self.thread
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}t{}", self.core, self.thread)
    }
}

/// Set of flattened node numbers a context is allowed to run on.
///
/// Bit `n` set means node `n` is allowed. The mask grows on demand, so a
/// context can be given an affinity before the grid size is known.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Affinity {
    mask: BitVec<u64, Lsb0>,
}

impl Affinity {
    /// Empty affinity: the context may run nowhere.
    pub const fn none() -> Self {
        Self {
            mask: BitVec::EMPTY,
        }
    }

    /// Affinity with every node in `0..nodes`.
    pub fn all(nodes: usize) -> Self {
        Self {
            mask: bitvec![u64, Lsb0; 1; nodes],
        }
    }

    /// Affinity with exactly one node.
    pub fn only(node: usize) -> Self {
        let mut aff = Self::none();
        aff.insert(node);
        aff
    }

    /// Builds an affinity from a list of flattened node numbers.
    pub fn from_nodes(nodes: &[usize]) -> Self {
        let mut aff = Self::none();
        for &node in nodes {
            aff.insert(node);
        }
        aff
    }

    /// Adds a node to the set.
    pub fn insert(&mut self, node: usize) {
        if self.mask.len() <= node {
            self.mask.resize(node + 1, false);
        }
        self.mask.set(node, true);
    }

    /// Removes a node from the set.
    pub fn remove(&mut self, node: usize) {
        if node < self.mask.len() {
            self.mask.set(node, false);
        }
    }

    /// Returns true if the context may run on `node`.
    #[inline]
    pub fn contains(&self, node: usize) -> bool {
        self.mask.get(node).is_some_and(|bit| *bit)
    }

    /// Returns true if no node is allowed.
    pub fn is_empty(&self) -> bool {
        self.mask.not_any()
    }
}
