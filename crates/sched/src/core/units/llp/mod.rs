//! Long-Latency Event Predictor.
//!
//! Each hardware thread owns a bounded table of recurrence patterns keyed by
//! `pc ^ branch_history`. The predictor performs the following:
//! 1. **Event Detection:** Scans the core's event queue for the thread's memory ops
//!    that have been outstanding past the miss and long-latency thresholds.
//! 2. **Interval Tracking:** Closes a pattern interval at every long-latency event
//!    of the same key, attaching the instruction mix and miss count.
//! 3. **Phase Classification:** Classifies the last three life times as equal,
//!    alternating, stable or irregular.
//! 4. **Forecasting:** Predicts the next event one life time ahead and grades the
//!    prediction when the event actually happens.
//!
//! A full table is a soft condition: keys that do not fit get no prediction.

/// Pattern intervals, phases and table entries.
pub mod pattern;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::common::Cycle;
use crate::config::PredictorConfig;
use crate::core::pipeline::{EventQueue, MicroOp, UopKind};

pub use self::pattern::{InstMix, PatternEntry, PatternInterval, Phase, Prediction, Verdict};

/// Table key for an instruction: program counter folded with branch history.
#[inline]
pub const fn pattern_key(pc: u64, history: u64) -> u64 {
    pc ^ history
}

/// Result of feeding one long-latency event to the predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The key was new and the table was full.
    Dropped,
    /// The key was new; its first interval is now open.
    Opened,
    /// An interval was closed.
    Closed {
        /// Phase after classification.
        phase: Phase,
        /// How the previous prediction fared, if there was one.
        verdict: Option<Verdict>,
    },
}

/// Counters produced by one [`LongLatencyPredictor::scan`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Long-latency events raised.
    pub events: u64,
    /// Cache misses attributed to open intervals.
    pub misses: u64,
    /// Events or misses dropped because the table was full.
    pub dropped: u64,
    /// Predictions confirmed.
    pub confirmed: u64,
    /// Predictions missed.
    pub missed: u64,
}

/// The thread's soonest live forecast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Forecast {
    /// Cycles until the predicted event.
    pub remaining: u64,
    /// Cycle the underlying prediction was made; identifies it.
    pub made_at: Cycle,
    /// Table key the prediction belongs to.
    pub key: u64,
}

/// Per-thread long-latency predictor.
#[derive(Debug)]
pub struct LongLatencyPredictor {
    table: HashMap<u64, PatternEntry>,
    config: PredictorConfig,
    mix: InstMix,
}

impl LongLatencyPredictor {
    /// Creates an empty predictor.
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            table: HashMap::with_capacity(config.table_size),
            config: config.clone(),
            mix: InstMix::default(),
        }
    }

    /// Number of allocated entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no key has been seen.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Looks up the entry for `(pc, history)`.
    pub fn entry(&self, pc: u64, history: u64) -> Option<&PatternEntry> {
        self.table.get(&pattern_key(pc, history))
    }

    /// Ops counted since the last long-latency event.
    pub const fn running_mix(&self) -> InstMix {
        self.mix
    }

    /// Counts an op issued by this thread toward the current interval mix.
    pub const fn record_issue(&mut self, kind: UopKind) {
        self.mix.record(kind);
    }

    /// Returns the entry for `key`, allocating it with an interval opened at
    /// `now` if there is room. The flag is true when the entry is new.
    fn entry_or_open(
        &mut self,
        key: u64,
        trigger_issue: Cycle,
        now: Cycle,
    ) -> Option<(&mut PatternEntry, bool)> {
        if self.table.contains_key(&key) {
            return self.table.get_mut(&key).map(|e| (e, false));
        }
        if self.table.len() >= self.config.table_size {
            return None;
        }
        let history_len = self.config.history_len;
        let entry = self
            .table
            .entry(key)
            .or_insert_with(|| PatternEntry::open_at(now, trigger_issue, history_len));
        Some((entry, true))
    }

    /// Attributes a cache miss to the open interval of `key`.
    ///
    /// Returns false if the key is new and the table is full.
    pub fn record_cache_miss(&mut self, key: u64, trigger_issue: Cycle, now: Cycle) -> bool {
        match self.entry_or_open(key, trigger_issue, now) {
            Some((entry, _)) => {
                entry.open.cache_misses += 1;
                true
            }
            None => false,
        }
    }

    /// Feeds a long-latency event for `key` observed at `now`.
    pub fn long_latency_event(&mut self, key: u64, trigger_issue: Cycle, now: Cycle) -> EventOutcome {
        let history_len = self.config.history_len;
        let stable = self.config.stable_threshold;
        let tolerance = self.config.tolerance;
        let max_confidence = self.config.max_confidence;
        let mix = self.mix;

        let Some((entry, fresh)) = self.entry_or_open(key, trigger_issue, now) else {
            trace!(key, cycle = now, "predictor table full");
            return EventOutcome::Dropped;
        };
        entry.events += 1;
        if fresh {
            return EventOutcome::Opened;
        }

        let verdict = entry.grade(now, tolerance, max_confidence);
        entry.close_interval(now, mix, history_len);
        entry.reopen(now, trigger_issue);

        if let Some((l1, l2, l3)) = entry.recent_lives() {
            entry.phase = Phase::classify(l1, l2, l3, stable);
            entry.prediction = Some(Prediction {
                remaining: l3,
                made_at: now,
            });
        }
        let phase = entry.phase;
        let confidence = entry.confidence;
        self.mix = InstMix::default();

        debug!(key, cycle = now, ?phase, ?verdict, confidence, "long-latency event");
        EventOutcome::Closed { phase, verdict }
    }

    /// Walks `thread`'s in-flight ops and raises cache-miss and long-latency
    /// events for memory ops that crossed a threshold at `now`.
    ///
    /// Each op raises each event at most once.
    pub fn scan(&mut self, queue: &mut EventQueue, thread: usize, now: Cycle) -> ScanReport {
        let mut report = ScanReport::default();
        let miss_threshold = self.config.miss_threshold;
        let long_threshold = self.config.long_latency_threshold;

        for uop in queue.thread_ops_mut(thread) {
            if !uop.kind.is_memory() {
                continue;
            }
            let age = uop.age(now);
            if age > miss_threshold && !uop.miss_counted && uop.kind == UopKind::Load {
                uop.miss_counted = true;
                if self.record_cache_miss(key_of(uop), uop.issue_cycle, now) {
                    report.misses += 1;
                } else {
                    report.dropped += 1;
                }
            }
            if age > long_threshold && !uop.long_latency_seen {
                uop.long_latency_seen = true;
                match self.long_latency_event(key_of(uop), uop.issue_cycle, now) {
                    EventOutcome::Dropped => report.dropped += 1,
                    EventOutcome::Opened => report.events += 1,
                    EventOutcome::Closed { verdict, .. } => {
                        report.events += 1;
                        match verdict {
                            Some(Verdict::Confirmed) => report.confirmed += 1,
                            Some(Verdict::Missed) => report.missed += 1,
                            None => {}
                        }
                    }
                }
            }
        }
        report
    }

    /// Soonest live forecast at `now`.
    ///
    /// Ties go to the lowest key so the answer does not depend on hash order.
    pub fn forecast(&self, now: Cycle) -> Option<Forecast> {
        self.table
            .iter()
            .filter_map(|(&key, e)| {
                let remaining = e.live_remaining(now, self.config.tolerance)?;
                let made_at = e.prediction?.made_at;
                Some(Forecast {
                    remaining,
                    made_at,
                    key,
                })
            })
            .min_by_key(|f| (f.remaining, f.key))
    }

    /// Cycles until this thread's next predicted long-latency event.
    pub fn predicted_remaining(&self, now: Cycle) -> Option<u64> {
        self.forecast(now).map(|f| f.remaining)
    }
}

const fn key_of(uop: &MicroOp) -> u64 {
    pattern_key(uop.pc, uop.history)
}
