//! Prediction and prefetch plumbing.
//!
//! Micro-ops enter the per-core event queue here, the per-thread predictors
//! scan that queue every cycle, and a predicted sibling stall replays the
//! stalling thread's memory summary through the prefetcher.

use tracing::debug;

use super::Cpu;
use crate::common::{NodeId, SchedError};
use crate::core::pipeline::MicroOp;
use crate::core::units::llp::ScanReport;
use crate::core::units::prefetch::StrideEntry;
use crate::soc::MemoryPort;

impl Cpu {
    /// Issues a micro-op from `node` into its core's event queue and counts it
    /// toward the thread's instruction mix. Returns the assigned sequence id.
    pub fn issue_uop(&mut self, node: NodeId, mut uop: MicroOp) -> Result<u64, SchedError> {
        let core = self
            .cores
            .get_mut(node.core)
            .ok_or(SchedError::UnknownNode(node))?;
        let thread = core
            .threads
            .get_mut(node.thread)
            .ok_or(SchedError::UnknownNode(node))?;
        thread.predictor.record_issue(uop.kind);
        uop.thread = node.thread;
        Ok(core.event_queue.issue(uop))
    }

    /// Removes and returns the ops of `core` that completed by the current cycle.
    pub fn retire_ready(&mut self, core: usize) -> Result<Vec<MicroOp>, SchedError> {
        let now = self.cycle;
        let core = self
            .cores
            .get_mut(core)
            .ok_or(SchedError::UnknownNode(NodeId::new(core, 0)))?;
        Ok(core.event_queue.extract_ready(now))
    }

    /// Logs a memory access of `node` for stride and MRU tracking.
    ///
    /// Returns the stride recorded by this access, if the access filled its
    /// bucket's ring and a run was found.
    pub fn record_access(
        &mut self,
        node: NodeId,
        addr: u64,
        is_instruction: bool,
    ) -> Result<Option<StrideEntry>, SchedError> {
        let thread = self.thread_mut(node)?;
        Ok(thread.logger.record(addr, is_instruction))
    }

    /// Runs every thread's predictor over its core's event queue.
    pub fn scan_predictors(&mut self) -> ScanReport {
        let now = self.cycle;
        let mut total = ScanReport::default();
        for core in &mut self.cores {
            for (t, thread) in core.threads.iter_mut().enumerate() {
                let report = thread.predictor.scan(&mut core.event_queue, t, now);
                self.stats.absorb(&report);
                total.events += report.events;
                total.misses += report.misses;
                total.dropped += report.dropped;
                total.confirmed += report.confirmed;
                total.missed += report.missed;
            }
        }
        total
    }

    /// Sibling of `thread` on `core` closest to its next long-latency event.
    ///
    /// Threads without a live prediction are skipped. Ties go to the lowest
    /// thread index.
    pub fn predict_next_stalling_thread(
        &self,
        core: usize,
        thread: usize,
    ) -> Result<Option<usize>, SchedError> {
        let now = self.cycle;
        Ok(self
            .core(core)?
            .threads
            .iter()
            .enumerate()
            .filter(|(t, _)| *t != thread)
            .filter_map(|(t, th)| th.predictor.predicted_remaining(now).map(|r| (r, t)))
            .min()
            .map(|(_, t)| t))
    }

    /// Prefetches on behalf of the sibling predicted to stall next.
    ///
    /// Fires at most once per prediction and only when the predicted stall is
    /// inside the lead window. Returns the number of requests issued.
    pub fn maybe_prefetch(
        &mut self,
        core: usize,
        thread: usize,
        port: &mut dyn MemoryPort,
    ) -> Result<usize, SchedError> {
        if !self.prefetcher.enabled() {
            return Ok(0);
        }
        let Some(target) = self.predict_next_stalling_thread(core, thread)? else {
            return Ok(0);
        };
        let now = self.cycle;
        let target_node = NodeId::new(core, target);
        let th = self.thread(target_node)?;
        let Some(forecast) = th.predictor.forecast(now) else {
            return Ok(0);
        };
        if !self.prefetcher.should_fire(&forecast, th.last_prefetch) {
            return Ok(0);
        }

        let issued = self.prefetcher.issue(&th.logger, port);
        self.thread_mut(target_node)?.last_prefetch = Some(forecast.made_at);
        self.stats.prefetch_triggers += 1;
        self.stats.prefetch_requests += issued as u64;
        debug!(
            node = %NodeId::new(core, thread),
            target = %target_node,
            remaining = forecast.remaining,
            issued,
            cycle = now,
            "prefetch burst"
        );
        Ok(issued)
    }

    /// Squashes the speculative in-flight ops of `node`.
    ///
    /// Returns the number of ops dropped.
    pub fn recover_event_queue(&mut self, node: NodeId) -> Result<usize, SchedError> {
        let _ = self.thread(node)?;
        let core = self
            .cores
            .get_mut(node.core)
            .ok_or(SchedError::UnknownNode(node))?;
        let dropped = core.event_queue.recover(node.thread);
        self.stats.squashed_uops += dropped as u64;
        debug!(%node, dropped, cycle = self.cycle, "event queue recovered");
        Ok(dropped)
    }
}
