//! Event queue of in-flight micro-ops.
//!
//! Every core keeps one queue shared by its hardware threads. It provides:
//! 1. **Ordered Insertion:** Entries stay sorted by `(ready_cycle, id)`.
//! 2. **Extraction:** The head (earliest ready, lowest id) is popped first.
//! 3. **Squash:** Entries matching a predicate are dropped in place, keeping order.
//! 4. **Inspection:** Per-thread iteration for the long-latency predictor.
//!
//! The `id` tie-break makes replay deterministic: two ops completing in the
//! same cycle always leave the queue in issue order.

use std::cmp::Ordering;

use crate::common::{ContextId, Cycle};

/// Coarse instruction category of a micro-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum UopKind {
    /// Integer arithmetic.
    #[default]
    Int,
    /// Logic and shift operations.
    Logic,
    /// Floating-point arithmetic.
    Fp,
    /// Memory load.
    Load,
    /// Memory store.
    Store,
    /// Branches, jumps, calls.
    Ctrl,
}

impl UopKind {
    /// Returns true for loads and stores.
    #[inline]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }
}

/// One in-flight micro-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MicroOp {
    /// Sequence id, monotonically increasing per core.
    pub id: u64,
    /// Thread index within the core that issued the op.
    pub thread: usize,
    /// Context the op belongs to.
    pub ctx: ContextId,
    /// Program counter of the parent instruction.
    pub pc: u64,
    /// Branch history register value sampled at issue.
    pub history: u64,
    /// Instruction category.
    pub kind: UopKind,
    /// Effective address for memory ops.
    pub addr: Option<u64>,
    /// Cycle the op was issued.
    pub issue_cycle: Cycle,
    /// Cycle the op completes.
    pub ready_cycle: Cycle,
    /// Issued down a predicted path that may still be squashed.
    pub spec_mode: bool,
    /// The op has already been counted as a cache miss.
    pub miss_counted: bool,
    /// The op has already raised a long-latency event.
    pub long_latency_seen: bool,
}

impl MicroOp {
    /// Creates a non-speculative op issued at `issue_cycle`.
    pub fn new(thread: usize, ctx: ContextId, pc: u64, kind: UopKind, issue_cycle: Cycle) -> Self {
        Self {
            thread,
            ctx,
            pc,
            kind,
            issue_cycle,
            ready_cycle: issue_cycle,
            ..Self::default()
        }
    }

    /// Sets the completion cycle.
    #[must_use]
    pub const fn ready_at(mut self, cycle: Cycle) -> Self {
        self.ready_cycle = cycle;
        self
    }

    /// Sets the effective address.
    #[must_use]
    pub const fn with_addr(mut self, addr: u64) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Sets the branch history sample.
    #[must_use]
    pub const fn with_history(mut self, history: u64) -> Self {
        self.history = history;
        self
    }

    /// Marks the op as speculative.
    #[must_use]
    pub const fn speculative(mut self) -> Self {
        self.spec_mode = true;
        self
    }

    /// Queue ordering key.
    #[inline]
    pub const fn key(&self) -> (Cycle, u64) {
        (self.ready_cycle, self.id)
    }

    /// Cycles the op has been outstanding at `now`.
    #[inline]
    pub const fn age(&self, now: Cycle) -> u64 {
        now.saturating_sub(self.issue_cycle)
    }
}

/// Per-core queue of in-flight micro-ops sorted by `(ready_cycle, id)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    entries: Vec<MicroOp>,
    next_id: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Number of queued ops.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assigns the next sequence id to `uop` and inserts it.
    ///
    /// Returns the assigned id.
    pub fn issue(&mut self, mut uop: MicroOp) -> u64 {
        uop.id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let id = uop.id;
        self.insert(uop);
        id
    }

    /// Inserts an op that already carries its id.
    ///
    /// The op lands before the first entry that is not strictly less than it,
    /// so the queue stays sorted.
    pub fn insert(&mut self, uop: MicroOp) {
        let pos = self
            .entries
            .iter()
            .position(|e| compare(e, &uop) != Ordering::Less)
            .unwrap_or(self.entries.len());
        self.next_id = self.next_id.max(uop.id.saturating_add(1));
        self.entries.insert(pos, uop);
    }

    /// Removes and returns the head of the queue.
    pub fn extract_front(&mut self) -> Option<MicroOp> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Removes and returns every op ready at or before `now`, in order.
    pub fn extract_ready(&mut self, now: Cycle) -> Vec<MicroOp> {
        let split = self.entries.partition_point(|e| e.ready_cycle <= now);
        self.entries.drain(..split).collect()
    }

    /// Returns the head without removing it.
    pub fn peek(&self) -> Option<&MicroOp> {
        self.entries.first()
    }

    /// Removes every op matching `pred`, keeping the rest in order.
    ///
    /// Returns the number of ops removed.
    pub fn remove_matching(&mut self, mut pred: impl FnMut(&MicroOp) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(e));
        before - self.entries.len()
    }

    /// Squashes the speculative ops of one thread.
    pub fn recover(&mut self, thread: usize) -> usize {
        self.remove_matching(|e| e.thread == thread && e.spec_mode)
    }

    /// Number of ops a thread has in flight.
    pub fn in_flight(&self, thread: usize) -> usize {
        self.entries.iter().filter(|e| e.thread == thread).count()
    }

    /// Number of ops a context has in flight on a thread.
    pub fn in_flight_ctx(&self, thread: usize, ctx: ContextId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.thread == thread && e.ctx == ctx)
            .count()
    }

    /// Iterates over all ops in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &MicroOp> {
        self.entries.iter()
    }

    /// Mutable iteration over one thread's ops in queue order.
    ///
    /// Only the bookkeeping flags should be changed through this; the
    /// ordering key must stay untouched.
    pub fn thread_ops_mut(&mut self, thread: usize) -> impl Iterator<Item = &mut MicroOp> {
        self.entries.iter_mut().filter(move |e| e.thread == thread)
    }

    /// Returns true if the entries are sorted by `(ready_cycle, id)`.
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
    }
}

fn compare(a: &MicroOp, b: &MicroOp) -> Ordering {
    a.key().cmp(&b.key())
}
