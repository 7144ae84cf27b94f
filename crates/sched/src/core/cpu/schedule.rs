//! Scheduling Pass.
//!
//! The pass is gated: it runs only when something raised the reschedule
//! signal or the oldest allocation has used up its quantum. When it runs it:
//! 1. **Maps** every running, unmapped context onto the least loaded affine thread
//!    that still has buffer room, and frees finished contexts that are unmapped.
//! 2. **Reconciles** each thread: signals eviction of an allocated context that
//!    stopped running, lost affinity, or used its quantum while a sibling waits.
//! 3. **Unmaps** mapped contexts that finished or lost affinity.
//! 4. **Allocates** the buffer's next pick on every idle thread.
//! 5. **Recomputes** the quantum gate.

use tracing::{debug, trace};

use super::Cpu;
use crate::common::{ContextId, NodeId, SchedError};
use crate::soc::PipelineProbe;

impl Cpu {
    /// Runs one scheduling pass if one is due.
    ///
    /// Returns whether the pass ran.
    pub fn schedule(&mut self, probe: &dyn PipelineProbe) -> Result<bool, SchedError> {
        let quantum = self.config.scheduler.quantum;
        let signaled = self.contexts.take_signal() | self.schedule_signal;
        let expired = self
            .min_alloc_cycle
            .is_some_and(|m| self.cycle >= m.saturating_add(quantum));
        if !signaled && !expired {
            self.stats.skipped_passes += 1;
            return Ok(false);
        }

        // Signals raised from here on belong to the next pass.
        self.schedule_signal = false;
        self.stats.schedule_passes += 1;
        debug!(cycle = self.cycle, signaled, expired, "schedule pass");

        for id in self.contexts.ids() {
            let ctx = self.contexts.get(id)?;
            if ctx.is_mapped() {
                continue;
            }
            if ctx.finished {
                self.free_context(id)?;
            } else if ctx.running {
                let _ = self.map_context(id)?;
            }
        }

        for node in self.nodes() {
            self.schedule_node(node, probe)?;
        }

        self.update_min_alloc_cycle();
        Ok(true)
    }

    /// Reconciles, unmaps and allocates on a single thread.
    fn schedule_node(&mut self, node: NodeId, probe: &dyn PipelineProbe) -> Result<(), SchedError> {
        let flat = self.flat(node);
        let quantum = self.config.scheduler.quantum;

        if let Some(cur) = self.thread(node)?.ctx {
            let ctx = self.contexts.get(cur)?;
            if !ctx.evict_signal {
                let lost = !ctx.running || !ctx.affinity.contains(flat);
                let expired = self.cycle >= ctx.alloc_cycle.saturating_add(quantum);
                if lost {
                    let _ = self.evict_signal(node, cur, probe)?;
                } else if expired {
                    if self.has_waiting_runnable(node, cur)? {
                        let _ = self.evict_signal(node, cur, probe)?;
                    } else {
                        self.contexts.get_mut(cur)?.alloc_cycle = self.cycle;
                        self.stats.quantum_refreshes += 1;
                        trace!(%node, ctx = %cur, cycle = self.cycle, "quantum refreshed");
                    }
                }
            }
        }

        let current = self.thread(node)?.ctx;
        let mapped = self.thread(node)?.mapped.clone();
        for id in mapped {
            if current == Some(id) {
                continue;
            }
            let ctx = self.contexts.get(id)?;
            let finished = ctx.finished;
            if finished || !ctx.affinity.contains(flat) {
                self.unmap_context(node, id)?;
                if finished {
                    self.free_context(id)?;
                }
            }
        }

        if current.is_none() {
            let now = self.cycle;
            let contexts = &self.contexts;
            let thread = self
                .cores
                .get_mut(node.core)
                .and_then(|c| c.threads.get_mut(node.thread))
                .ok_or(SchedError::UnknownNode(node))?;
            let picked = thread.buffer.select_next(now, |id| {
                contexts
                    .get(id)
                    .is_ok_and(|c| !c.allocated && c.can_run_on(flat))
            });
            if let Some(sel) = picked {
                if sel.starved {
                    self.stats.starvation_overrides += 1;
                }
                self.allocate(node, sel.ctx)?;
            }
        }
        Ok(())
    }

    /// Returns true if another context mapped to `node` could run instead of `cur`.
    fn has_waiting_runnable(&self, node: NodeId, cur: ContextId) -> Result<bool, SchedError> {
        let flat = self.flat(node);
        for &id in &self.thread(node)?.mapped {
            if id != cur && self.contexts.get(id)?.can_run_on(flat) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Maps an unmapped context to a thread.
    ///
    /// Among the threads the context has affinity with and whose buffer can
    /// admit another context, picks the one with the fewest mapped contexts
    /// (lowest index on ties). Returns `None` when every affine buffer is
    /// full; the context stays unmapped and is retried on a later pass.
    pub fn map_context(&mut self, id: ContextId) -> Result<Option<NodeId>, SchedError> {
        let tpc = self.threads_per_core();
        let ctx = self.contexts.get(id)?;
        if ctx.is_mapped() || ctx.allocated {
            return Err(SchedError::AlreadyMapped { ctx: id });
        }

        let mut any_affine = false;
        let mut chosen: Option<(usize, usize, NodeId)> = None;
        for thread in self.cores.iter().flat_map(|c| c.threads.iter()) {
            let flat = thread.node.flat(tpc);
            if !ctx.affinity.contains(flat) {
                continue;
            }
            any_affine = true;
            if !thread.buffer.can_admit() {
                continue;
            }
            let key = (thread.mapped.len(), flat, thread.node);
            if chosen.is_none_or(|best| (key.0, key.1) < (best.0, best.1)) {
                chosen = Some(key);
            }
        }
        if !any_affine {
            return Err(SchedError::NoAffinity { ctx: id });
        }
        let Some((_, _, node)) = chosen else {
            self.stats.map_deferrals += 1;
            trace!(ctx = %id, cycle = self.cycle, "every affine buffer full, mapping deferred");
            return Ok(None);
        };

        let now = self.cycle;
        let thread = self.thread_mut(node)?;
        thread.mapped.push(id);
        let _ = thread.buffer.insert(id, now)?;
        self.contexts.get_mut(id)?.node = Some(node);
        self.stats.maps += 1;
        debug!(ctx = %id, %node, cycle = now, "context mapped");
        Ok(Some(node))
    }

    /// Removes a context from a thread's mapped list and buffer.
    ///
    /// The context must not be allocated.
    pub fn unmap_context(&mut self, node: NodeId, id: ContextId) -> Result<(), SchedError> {
        let ctx = self.contexts.get(id)?;
        if ctx.node != Some(node) {
            return Err(SchedError::NotMapped { ctx: id, node });
        }
        if ctx.allocated {
            return Err(SchedError::AlreadyAllocated { ctx: id });
        }

        let thread = self.thread_mut(node)?;
        let pos = thread
            .mapped
            .iter()
            .position(|&c| c == id)
            .ok_or(SchedError::NotMapped { ctx: id, node })?;
        let _ = thread.mapped.remove(pos);
        thread.buffer.remove(id)?;
        self.contexts.get_mut(id)?.node = None;

        // A buffer slot opened up; contexts waiting to be mapped can retry.
        self.schedule_signal = true;
        self.stats.unmaps += 1;
        debug!(ctx = %id, %node, cycle = self.cycle, "context unmapped");
        Ok(())
    }

    /// Puts a mapped context into its thread's pipeline.
    pub fn allocate(&mut self, node: NodeId, id: ContextId) -> Result<(), SchedError> {
        let now = self.cycle;
        let ctx = self.contexts.get(id)?;
        if ctx.allocated {
            return Err(SchedError::AlreadyAllocated { ctx: id });
        }
        if ctx.node != Some(node) {
            return Err(SchedError::NotMapped { ctx: id, node });
        }
        let ip = ctx.snapshot.ip;

        let thread = self.thread_mut(node)?;
        if let Some(running) = thread.ctx {
            return Err(SchedError::ThreadBusy { node, running });
        }
        thread.buffer.consume(id)?;
        thread.ctx = Some(id);
        thread.fetch_ip = ip;
        thread.last_sched_cycle = now;

        let ctx = self.contexts.get_mut(id)?;
        ctx.allocated = true;
        ctx.alloc_cycle = now;
        ctx.evict_signal = false;
        self.stats.allocations += 1;
        debug!(ctx = %id, %node, cycle = now, ip, "context allocated");
        Ok(())
    }

    /// Recomputes the quantum gate from allocated, non-signaled contexts.
    pub fn update_min_alloc_cycle(&mut self) {
        self.min_alloc_cycle = self
            .contexts
            .iter()
            .filter(|c| c.allocated && !c.evict_signal)
            .map(|c| c.alloc_cycle)
            .min();
    }

    fn free_context(&mut self, id: ContextId) -> Result<(), SchedError> {
        let _ = self.contexts.free(id)?;
        self.stats.frees += 1;
        Ok(())
    }
}
