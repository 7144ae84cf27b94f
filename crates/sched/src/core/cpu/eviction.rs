//! Two-phase eviction.
//!
//! Eviction is first signaled, then made effective once the thread's pipeline
//! holds no more work for the context. A signal on an already drained pipeline
//! evicts immediately; otherwise [`Cpu::drain_evictions`] retries every cycle.

use tracing::debug;

use super::Cpu;
use crate::common::{ContextId, NodeId, SchedError};
use crate::soc::PipelineProbe;

impl Cpu {
    /// Returns true if neither the probe nor the core's event queue report
    /// in-flight work of `id` on `node`.
    pub fn pipeline_drained(
        &self,
        node: NodeId,
        id: ContextId,
        probe: &dyn PipelineProbe,
    ) -> Result<bool, SchedError> {
        let core = self.core(node.core)?;
        Ok(probe.is_drained(node) && core.event_queue.in_flight_ctx(node.thread, id) == 0)
    }

    /// Signals eviction of the context allocated on `node`.
    ///
    /// Returns true if the eviction took effect immediately.
    pub fn evict_signal(
        &mut self,
        node: NodeId,
        id: ContextId,
        probe: &dyn PipelineProbe,
    ) -> Result<bool, SchedError> {
        if self.thread(node)?.ctx != Some(id) {
            return Err(SchedError::NotAllocated { ctx: id, node });
        }
        let ctx = self.contexts.get(id)?;
        if ctx.node != Some(node) {
            return Err(SchedError::NotMapped { ctx: id, node });
        }
        if !ctx.allocated {
            return Err(SchedError::NotAllocated { ctx: id, node });
        }
        if ctx.evict_signal {
            return Err(SchedError::EvictionPending { ctx: id, node });
        }
        let spec = ctx.spec_mode;

        self.contexts.get_mut(id)?.evict_signal = true;
        self.stats.evict_signals += 1;
        debug!(ctx = %id, %node, cycle = self.cycle, "eviction signaled");

        if !spec && self.pipeline_drained(node, id, probe)? {
            self.evict_effective(node, id, probe)?;
            self.stats.evictions_immediate += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Completes a signaled eviction.
    ///
    /// The thread is released, the context keeps its mapping and goes back
    /// into the thread's inactive-context buffer stamped with the current
    /// cycle.
    pub fn evict_effective(
        &mut self,
        node: NodeId,
        id: ContextId,
        probe: &dyn PipelineProbe,
    ) -> Result<(), SchedError> {
        let now = self.cycle;
        let thread = self.thread(node)?;
        if thread.ctx != Some(id) {
            return Err(SchedError::NotAllocated { ctx: id, node });
        }
        let fetch_ip = thread.fetch_ip;
        let ctx = self.contexts.get(id)?;
        if !ctx.evict_signal {
            return Err(SchedError::EvictionNotSignaled { ctx: id, node });
        }
        if ctx.spec_mode {
            return Err(SchedError::SpeculativeEviction { ctx: id, node });
        }
        if !self.pipeline_drained(node, id, probe)? {
            return Err(SchedError::PipelineNotDrained { ctx: id, node });
        }

        let thread = self.thread_mut(node)?;
        thread.ctx = None;
        let _ = thread.buffer.insert(id, now)?;

        let ctx = self.contexts.get_mut(id)?;
        ctx.allocated = false;
        ctx.evict_signal = false;
        ctx.evict_cycle = now;
        ctx.snapshot.ip = fetch_ip;

        self.schedule_signal = true;
        debug!(ctx = %id, %node, cycle = now, "context evicted");
        Ok(())
    }

    /// Completes every signaled eviction whose pipeline has drained.
    ///
    /// Returns the number of evictions completed.
    pub fn drain_evictions(&mut self, probe: &dyn PipelineProbe) -> Result<usize, SchedError> {
        let mut done = 0;
        for node in self.nodes() {
            let Some(id) = self.thread(node)?.ctx else {
                continue;
            };
            let ctx = self.contexts.get(id)?;
            if !ctx.evict_signal || ctx.spec_mode {
                continue;
            }
            if self.pipeline_drained(node, id, probe)? {
                self.evict_effective(node, id, probe)?;
                self.stats.evictions_deferred += 1;
                done += 1;
            }
        }
        Ok(done)
    }
}
