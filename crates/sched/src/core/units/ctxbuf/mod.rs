//! Inactive Context Buffer.
//!
//! Each hardware thread keeps a fixed-capacity table of the contexts mapped to
//! it that are not currently running. It provides:
//! 1. **Insertion:** Registering a context on mapping and re-inserting it on every eviction.
//! 2. **Aging:** Accumulating idle cycles on waiting entries at every insertion.
//! 3. **Selection:** Starvation override first, then the configured ranking policy.
//! 4. **Removal:** Releasing a slot when a context is permanently unmapped.
//!
//! The buffer stores context ids, never context state. The context itself
//! stays in the context table, so there is one copy of it at all times.

/// Re-admission ranking policies.
pub mod policies;

use tracing::{debug, trace};

use crate::common::{ContextId, Cycle, NodeId, SchedError};
use crate::config::SchedulerConfig;

pub use self::policies::{Candidate, RankView, RankingPolicy};

/// Lifecycle of a buffer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Free for any context.
    #[default]
    Vacant,
    /// Holds a mapped, runnable context waiting for its turn.
    Ready,
    /// Holds a context that was selected and is running; it must be
    /// re-inserted on its next eviction before it can be selected again.
    Consumed,
}

/// One slot of the buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferEntry {
    /// Context held in the slot (meaningless while vacant).
    pub ctx: ContextId,
    /// Cycle of the last insertion.
    pub eviction_cycle: Cycle,
    /// Cycles spent waiting since the last insertion.
    pub idle_cycles: u64,
    /// Times the context has been inserted (first registration included).
    pub runs: u64,
    /// Slot state.
    pub state: SlotState,
    /// The slot was the most recent selection.
    pub best: bool,
}

impl BufferEntry {
    /// Returns true if the slot holds a live, re-runnable context.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.state == SlotState::Ready
    }

    /// Returns true if the slot is owned by a mapped context.
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.state != SlotState::Vacant
    }
}

/// Outcome of [`InactiveContextBuffer::select_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Context to allocate.
    pub ctx: ContextId,
    /// Slot it came from.
    pub index: usize,
    /// The starvation override picked it, not the ranking policy.
    pub starved: bool,
}

/// Per-thread inactive-context buffer.
#[derive(Debug)]
pub struct InactiveContextBuffer {
    node: NodeId,
    entries: Vec<BufferEntry>,
    capacity: usize,
    occupancy: usize,
    best: usize,
    last_insert_cycle: Cycle,
    starvation_threshold: u64,
    policy: Box<dyn RankingPolicy>,
}

impl InactiveContextBuffer {
    /// Creates an empty buffer for `node` using the scheduler configuration.
    pub fn new(node: NodeId, config: &SchedulerConfig) -> Self {
        Self::with_policy(
            node,
            config.buffer_capacity,
            config.starvation_threshold,
            policies::build(config.ranking),
        )
    }

    /// Creates an empty buffer with an explicit policy.
    pub fn with_policy(
        node: NodeId,
        capacity: usize,
        starvation_threshold: u64,
        policy: Box<dyn RankingPolicy>,
    ) -> Self {
        Self {
            node,
            entries: Vec::with_capacity(capacity),
            capacity,
            occupancy: 0,
            best: 0,
            last_insert_cycle: 0,
            starvation_threshold,
            policy,
        }
    }

    /// Configured capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots owned by mapped contexts.
    #[inline]
    pub const fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Number of slots ever used (the write pointer).
    #[inline]
    pub fn fill_len(&self) -> usize {
        self.entries.len()
    }

    /// Slot of the most recent selection.
    #[inline]
    pub const fn best_index(&self) -> usize {
        self.best
    }

    /// Name of the active ranking policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// All slots, in index order.
    pub fn entries(&self) -> &[BufferEntry] {
        &self.entries
    }

    /// Returns true if another context can be mapped to this thread.
    #[inline]
    pub const fn can_admit(&self) -> bool {
        self.occupancy < self.capacity
    }

    /// Finds the slot owned by `ctx`.
    pub fn position(&self, ctx: ContextId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.is_occupied() && e.ctx == ctx)
    }

    /// Returns the slot owned by `ctx`.
    pub fn entry(&self, ctx: ContextId) -> Option<&BufferEntry> {
        self.position(ctx).map(|i| &self.entries[i])
    }

    /// Inserts (or re-inserts) `ctx` as ready to run.
    ///
    /// Reuses the slot the context already owns, else the first vacant slot,
    /// else appends below capacity. Every other ready entry then ages by the
    /// cycles elapsed since the previous insertion on this thread.
    pub fn insert(&mut self, ctx: ContextId, now: Cycle) -> Result<usize, SchedError> {
        let index = match self.position(ctx) {
            Some(i) => i,
            None => {
                let slot = match self.entries.iter().position(|e| !e.is_occupied()) {
                    Some(i) => i,
                    None if self.entries.len() < self.capacity => {
                        self.entries.push(BufferEntry::default());
                        self.entries.len() - 1
                    }
                    None => {
                        return Err(SchedError::BufferFull {
                            ctx,
                            node: self.node,
                        });
                    }
                };
                self.entries[slot] = BufferEntry {
                    ctx,
                    ..BufferEntry::default()
                };
                self.occupancy += 1;
                slot
            }
        };

        let entry = &mut self.entries[index];
        entry.eviction_cycle = now;
        entry.runs += 1;
        entry.state = SlotState::Ready;
        entry.idle_cycles = 0;

        let elapsed = now.saturating_sub(self.last_insert_cycle);
        self.last_insert_cycle = now;
        for (i, e) in self.entries.iter_mut().enumerate() {
            if i != index && e.is_valid() {
                e.idle_cycles = e.idle_cycles.saturating_add(elapsed);
            }
        }

        debug!(
            node = %self.node,
            %ctx,
            slot = index,
            occupancy = self.occupancy,
            cycle = now,
            "context buffered"
        );
        Ok(index)
    }

    /// Picks the next context to allocate and consumes its slot.
    ///
    /// `eligible` filters out contexts that may not run right now (not in
    /// running state, or lost affinity with this thread). A ready entry whose
    /// idle time reached the starvation threshold wins outright, earliest slot
    /// first; otherwise the ranking policy decides.
    pub fn select_next(
        &mut self,
        now: Cycle,
        eligible: impl Fn(ContextId) -> bool,
    ) -> Option<Selection> {
        let candidates: Vec<Candidate> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_valid() && eligible(e.ctx))
            .map(|(index, e)| Candidate {
                index,
                ctx: e.ctx,
                eviction_cycle: e.eviction_cycle,
                idle_cycles: e.idle_cycles,
            })
            .collect();

        let outgoing = self.best;
        if let Some(e) = self.entries.get_mut(outgoing) {
            e.best = false;
        }

        let starving = candidates
            .iter()
            .find(|c| c.idle_cycles >= self.starvation_threshold)
            .map(|c| c.index);

        let (index, starved) = match starving {
            Some(i) => (i, true),
            None => {
                let view = RankView {
                    candidates: &candidates,
                    fill_len: self.entries.len(),
                    outgoing,
                    cycle: now,
                };
                (self.policy.select(&view)?, false)
            }
        };

        self.best = index;
        let entry = &mut self.entries[index];
        entry.best = true;
        entry.state = SlotState::Consumed;

        if starved {
            debug!(node = %self.node, ctx = %entry.ctx, slot = index, idle = entry.idle_cycles, "starvation override");
        } else {
            trace!(node = %self.node, ctx = %entry.ctx, slot = index, policy = self.policy.name(), "ranked");
        }

        Some(Selection {
            ctx: entry.ctx,
            index,
            starved,
        })
    }

    /// Marks the slot owned by `ctx` consumed without ranking, for contexts
    /// allocated directly by the caller.
    pub fn consume(&mut self, ctx: ContextId) -> Result<(), SchedError> {
        let index = self.position(ctx).ok_or(SchedError::NotBuffered {
            ctx,
            node: self.node,
        })?;
        self.entries[index].state = SlotState::Consumed;
        Ok(())
    }

    /// Releases the slot owned by `ctx`.
    ///
    /// Removing a context the buffer does not track is a fatal error.
    pub fn remove(&mut self, ctx: ContextId) -> Result<(), SchedError> {
        let index = self.position(ctx).ok_or(SchedError::NotBuffered {
            ctx,
            node: self.node,
        })?;
        let entry = &mut self.entries[index];
        entry.state = SlotState::Vacant;
        entry.best = false;
        self.occupancy -= 1;
        debug!(node = %self.node, %ctx, slot = index, occupancy = self.occupancy, "context removed from buffer");
        Ok(())
    }
}
