//! Scheduler statistics collection and reporting.
//!
//! This module tracks what the scheduling core did over a run. It provides:
//! 1. **Passes:** Cycles, scheduling passes run, and passes skipped by the quantum gate.
//! 2. **Placement:** Maps, unmaps, frees, allocations, and eviction signals.
//! 3. **Evictions:** Immediate versus deferred effective evictions, and starvation overrides.
//! 4. **Prediction:** Long-latency events, dropped keys, confirmed and missed predictions.
//! 5. **Prefetch:** Bursts triggered and requests issued.
//!
//! The report is produced through `Display` so callers choose where it goes.

use std::fmt;

use crate::core::units::llp::ScanReport;

/// Scheduler statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedStats {
    /// Cycles simulated.
    pub cycles: u64,
    /// Scheduling passes that ran.
    pub schedule_passes: u64,
    /// Cycles on which the pass was skipped.
    pub skipped_passes: u64,

    /// Contexts mapped to a node.
    pub maps: u64,
    /// Mapping attempts deferred because every affine buffer was full.
    pub map_deferrals: u64,
    /// Contexts unmapped from a node.
    pub unmaps: u64,
    /// Contexts freed after finishing.
    pub frees: u64,
    /// Contexts allocated on a node.
    pub allocations: u64,
    /// Quantum refreshes granted because nothing else was runnable.
    pub quantum_refreshes: u64,

    /// Eviction signals raised.
    pub evict_signals: u64,
    /// Effective evictions performed at signal time.
    pub evictions_immediate: u64,
    /// Effective evictions performed after waiting for the pipeline.
    pub evictions_deferred: u64,
    /// Selections forced by the starvation threshold.
    pub starvation_overrides: u64,

    /// Long-latency events raised.
    pub long_latency_events: u64,
    /// Cache misses attributed to pattern intervals.
    pub cache_misses: u64,
    /// Predictor updates dropped because the table was full.
    pub predictor_drops: u64,
    /// Predictions confirmed within tolerance.
    pub predictions_confirmed: u64,
    /// Predictions that missed.
    pub predictions_missed: u64,

    /// Prefetch bursts triggered.
    pub prefetch_triggers: u64,
    /// Prefetch requests issued.
    pub prefetch_requests: u64,
    /// Micro-ops squashed by recovery.
    pub squashed_uops: u64,
}

impl SchedStats {
    /// Folds one predictor scan into the totals.
    pub const fn absorb(&mut self, report: &ScanReport) {
        self.long_latency_events += report.events;
        self.cache_misses += report.misses;
        self.predictor_drops += report.dropped;
        self.predictions_confirmed += report.confirmed;
        self.predictions_missed += report.missed;
    }

    /// Fraction of graded predictions that were confirmed.
    pub fn prediction_accuracy(&self) -> f64 {
        let graded = self.predictions_confirmed + self.predictions_missed;
        if graded == 0 {
            0.0
        } else {
            self.predictions_confirmed as f64 / graded as f64
        }
    }
}

impl fmt::Display for SchedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cyc = self.cycles.max(1);
        writeln!(f, "==========================================================")?;
        writeln!(f, "SMT SCHEDULER STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "sim_cycles               {}", self.cycles)?;
        writeln!(
            f,
            "sched.passes             {} ({:.2}%)",
            self.schedule_passes,
            self.schedule_passes as f64 / cyc as f64 * 100.0
        )?;
        writeln!(f, "sched.skipped            {}", self.skipped_passes)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "PLACEMENT")?;
        writeln!(f, "  ctx.mapped             {}", self.maps)?;
        writeln!(f, "  ctx.map_deferred       {}", self.map_deferrals)?;
        writeln!(f, "  ctx.unmapped           {}", self.unmaps)?;
        writeln!(f, "  ctx.freed              {}", self.frees)?;
        writeln!(f, "  ctx.allocated          {}", self.allocations)?;
        writeln!(f, "  quantum.refreshed      {}", self.quantum_refreshes)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "EVICTION")?;
        writeln!(f, "  evict.signals          {}", self.evict_signals)?;
        writeln!(f, "  evict.immediate        {}", self.evictions_immediate)?;
        writeln!(f, "  evict.deferred         {}", self.evictions_deferred)?;
        writeln!(f, "  buffer.starvation      {}", self.starvation_overrides)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "PREDICTION")?;
        writeln!(f, "  llp.events             {}", self.long_latency_events)?;
        writeln!(f, "  llp.cache_misses       {}", self.cache_misses)?;
        writeln!(f, "  llp.table_full         {}", self.predictor_drops)?;
        writeln!(
            f,
            "  llp.accuracy           {:.2}% ({} / {})",
            self.prediction_accuracy() * 100.0,
            self.predictions_confirmed,
            self.predictions_confirmed + self.predictions_missed
        )?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "PREFETCH")?;
        writeln!(f, "  prefetch.bursts        {}", self.prefetch_triggers)?;
        writeln!(f, "  prefetch.requests      {}", self.prefetch_requests)?;
        writeln!(f, "  recovery.squashed      {}", self.squashed_uops)?;
        write!(f, "==========================================================")
    }
}
