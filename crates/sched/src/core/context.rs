//! Context Table.
//!
//! Owns every schedulable context for its whole life. Hardware threads and
//! inactive-context buffers refer to contexts by [`ContextId`] only, so there
//! is never a second copy of a context's state to fall out of sync.
//!
//! Every mutator that changes a lifecycle bit or the affinity raises the
//! table's reschedule signal, which the scheduler consumes at its next pass.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{Affinity, ContextId, Cycle, NodeId, SchedError};

/// Architectural state saved across evictions.
///
/// Register contents are opaque to the scheduler; only the instruction
/// pointer is read, to restart fetch on allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchSnapshot {
    /// Instruction pointer to resume at.
    pub ip: u64,
    /// Register file image.
    pub regs: Vec<u8>,
}

impl ArchSnapshot {
    /// Snapshot with an instruction pointer and no register image.
    pub const fn at(ip: u64) -> Self {
        Self {
            ip,
            regs: Vec::new(),
        }
    }
}

/// A schedulable software thread or process.
#[derive(Clone, Debug)]
pub struct Context {
    /// Stable identifier.
    pub id: ContextId,
    /// Nodes the context may run on.
    pub affinity: Affinity,
    /// Runnable (not suspended, not finished).
    pub running: bool,
    /// Terminated; freed once unmapped.
    pub finished: bool,
    /// Executing down a predicted path. Blocks effective eviction.
    pub spec_mode: bool,
    /// Node the context is mapped to.
    pub node: Option<NodeId>,
    /// Occupying the mapped node's pipeline.
    pub allocated: bool,
    /// Eviction has been signaled and awaits a drained pipeline.
    pub evict_signal: bool,
    /// Cycle of the last allocation.
    pub alloc_cycle: Cycle,
    /// Cycle of the last effective eviction.
    pub evict_cycle: Cycle,
    /// Saved architectural state.
    pub snapshot: ArchSnapshot,
}

impl Context {
    fn new(id: ContextId, affinity: Affinity, snapshot: ArchSnapshot) -> Self {
        Self {
            id,
            affinity,
            running: true,
            finished: false,
            spec_mode: false,
            node: None,
            allocated: false,
            evict_signal: false,
            alloc_cycle: 0,
            evict_cycle: 0,
            snapshot,
        }
    }

    /// Returns true if the context is mapped to some node.
    #[inline]
    pub const fn is_mapped(&self) -> bool {
        self.node.is_some()
    }

    /// Returns true if the context may be allocated on flattened node `flat`.
    #[inline]
    pub fn can_run_on(&self, flat: usize) -> bool {
        self.running && !self.finished && self.affinity.contains(flat)
    }
}

/// Arena of contexts keyed by id, iterated in spawn order.
#[derive(Debug, Default)]
pub struct ContextTable {
    contexts: BTreeMap<ContextId, Context>,
    next_id: u32,
    signal: bool,
}

impl ContextTable {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            contexts: BTreeMap::new(),
            next_id: 0,
            signal: false,
        }
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if no context is alive.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Creates a running, unmapped context.
    pub fn spawn(&mut self, affinity: Affinity, snapshot: ArchSnapshot) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;
        let _ = self.contexts.insert(id, Context::new(id, affinity, snapshot));
        self.signal = true;
        debug!(ctx = %id, "context spawned");
        id
    }

    /// Looks up a context.
    pub fn get(&self, id: ContextId) -> Result<&Context, SchedError> {
        self.contexts.get(&id).ok_or(SchedError::UnknownContext(id))
    }

    /// Looks up a context for mutation.
    ///
    /// Changes made through this reference do not raise the reschedule signal.
    pub fn get_mut(&mut self, id: ContextId) -> Result<&mut Context, SchedError> {
        self.contexts
            .get_mut(&id)
            .ok_or(SchedError::UnknownContext(id))
    }

    /// Returns true if `id` is alive.
    pub fn contains(&self, id: ContextId) -> bool {
        self.contexts.contains_key(&id)
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> Vec<ContextId> {
        self.contexts.keys().copied().collect()
    }

    /// Contexts in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    fn update(
        &mut self,
        id: ContextId,
        f: impl FnOnce(&mut Context),
    ) -> Result<(), SchedError> {
        f(self.get_mut(id)?);
        self.signal = true;
        Ok(())
    }

    /// Clears the running bit.
    pub fn suspend(&mut self, id: ContextId) -> Result<(), SchedError> {
        self.update(id, |c| c.running = false)
    }

    /// Sets the running bit again, unless the context finished.
    pub fn resume(&mut self, id: ContextId) -> Result<(), SchedError> {
        self.update(id, |c| c.running = !c.finished)
    }

    /// Marks the context finished. It is freed once unmapped.
    pub fn finish(&mut self, id: ContextId) -> Result<(), SchedError> {
        self.update(id, |c| {
            c.finished = true;
            c.running = false;
        })
    }

    /// Replaces the affinity set.
    pub fn set_affinity(&mut self, id: ContextId, affinity: Affinity) -> Result<(), SchedError> {
        self.update(id, |c| c.affinity = affinity)
    }

    /// Enters or leaves speculative mode.
    pub fn set_spec_mode(&mut self, id: ContextId, spec: bool) -> Result<(), SchedError> {
        self.update(id, |c| c.spec_mode = spec)
    }

    /// Removes a finished, unmapped context and returns it.
    pub fn free(&mut self, id: ContextId) -> Result<Context, SchedError> {
        let ctx = self.get(id)?;
        if ctx.is_mapped() {
            return Err(SchedError::AlreadyMapped { ctx: id });
        }
        if ctx.allocated {
            return Err(SchedError::AlreadyAllocated { ctx: id });
        }
        let freed = self
            .contexts
            .remove(&id)
            .ok_or(SchedError::UnknownContext(id))?;
        debug!(ctx = %id, "context freed");
        Ok(freed)
    }

    /// Returns and clears the reschedule signal.
    pub const fn take_signal(&mut self) -> bool {
        std::mem::replace(&mut self.signal, false)
    }
}
