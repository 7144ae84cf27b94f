//! Pattern history kept per predictor entry.
//!
//! A pattern interval spans two consecutive long-latency events of the same
//! instruction. Its life time is the distance between them. The last few
//! intervals are kept in a bounded ring and classified into a recurrence
//! phase.

use std::collections::VecDeque;

use crate::common::Cycle;
use crate::core::pipeline::UopKind;

/// Recurrence phase of an instruction's long-latency events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    /// Fewer than four intervals seen yet.
    #[default]
    Unknown,
    /// The last two life-time deltas are both zero.
    Equal,
    /// The last two deltas have the same magnitude.
    Alternating,
    /// The deltas are small but not equal.
    Stable,
    /// No recognizable recurrence.
    Irregular,
}

impl Phase {
    /// Classifies the last three life times, oldest first.
    ///
    /// `stable_threshold` bounds `|d_old| + |d_new|` for the stable phase.
    pub fn classify(l1: u64, l2: u64, l3: u64, stable_threshold: u64) -> Self {
        let d_old = l2 as i64 - l1 as i64;
        let d_new = l3 as i64 - l2 as i64;
        if d_old == 0 && d_new == 0 {
            Self::Equal
        } else if d_old.unsigned_abs() == d_new.unsigned_abs() {
            Self::Alternating
        } else if d_old.unsigned_abs() + d_new.unsigned_abs() < stable_threshold {
            Self::Stable
        } else {
            Self::Irregular
        }
    }
}

/// Instruction-mix counters for one interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstMix {
    /// Integer ops.
    pub int: u64,
    /// Logic/shift ops.
    pub logic: u64,
    /// Floating-point ops.
    pub fp: u64,
    /// Loads and stores.
    pub mem: u64,
    /// Control-flow ops.
    pub ctrl: u64,
    /// All ops.
    pub total: u64,
}

impl InstMix {
    /// Counts one issued op.
    pub const fn record(&mut self, kind: UopKind) {
        match kind {
            UopKind::Int => self.int += 1,
            UopKind::Logic => self.logic += 1,
            UopKind::Fp => self.fp += 1,
            UopKind::Load | UopKind::Store => self.mem += 1,
            UopKind::Ctrl => self.ctrl += 1,
        }
        self.total += 1;
    }
}

/// One interval between two long-latency events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternInterval {
    /// Cycle the interval opened.
    pub start: Cycle,
    /// Cycle it closed (zero while open).
    pub end: Cycle,
    /// `end - start`.
    pub life: u64,
    /// Issue cycle of the op whose event opened the interval.
    pub trigger_issue: Cycle,
    /// Loads outstanding past the miss threshold during the interval.
    pub cache_misses: u64,
    /// Ops issued by the thread during the interval.
    pub mix: InstMix,
}

/// A live forecast of the next long-latency event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Cycles from `made_at` to the expected event.
    pub remaining: u64,
    /// Cycle the prediction was made.
    pub made_at: Cycle,
}

impl Prediction {
    /// Cycle the next event is expected.
    #[inline]
    pub const fn expected(&self) -> Cycle {
        self.made_at + self.remaining
    }
}

/// Outcome of checking an actual event against the standing prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The event landed within tolerance.
    Confirmed,
    /// It did not.
    Missed,
}

/// Predictor table entry for one `(pc, history)` key.
#[derive(Clone, Debug, Default)]
pub struct PatternEntry {
    /// Closed intervals, oldest first.
    pub history: VecDeque<PatternInterval>,
    /// Interval currently accumulating.
    pub open: PatternInterval,
    /// Last classified phase.
    pub phase: Phase,
    /// Standing prediction, if any.
    pub prediction: Option<Prediction>,
    /// Saturating confidence in the prediction.
    pub confidence: u8,
    /// Long-latency events seen for this key.
    pub events: u64,
}

impl PatternEntry {
    /// Creates an entry with an interval opened at `now`.
    pub fn open_at(now: Cycle, trigger_issue: Cycle, history_len: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_len),
            open: PatternInterval {
                start: now,
                trigger_issue,
                ..PatternInterval::default()
            },
            ..Self::default()
        }
    }

    /// Closes the open interval at `now` and pushes it into the ring.
    pub fn close_interval(&mut self, now: Cycle, mix: InstMix, history_len: usize) {
        let mut closed = self.open;
        closed.end = now;
        closed.life = now.saturating_sub(closed.start);
        closed.mix = mix;
        if self.history.len() == history_len {
            let _ = self.history.pop_front();
        }
        self.history.push_back(closed);
    }

    /// Starts a new interval at `now`.
    pub fn reopen(&mut self, now: Cycle, trigger_issue: Cycle) {
        self.open = PatternInterval {
            start: now,
            trigger_issue,
            ..PatternInterval::default()
        };
    }

    /// Last three closed life times, oldest first, once four intervals exist.
    pub fn recent_lives(&self) -> Option<(u64, u64, u64)> {
        let n = self.history.len();
        if n < 4 {
            return None;
        }
        Some((
            self.history[n - 3].life,
            self.history[n - 2].life,
            self.history[n - 1].life,
        ))
    }

    /// Grades the standing prediction against an event at `now` and adjusts
    /// confidence.
    pub fn grade(&mut self, now: Cycle, tolerance: u64, max_confidence: u8) -> Option<Verdict> {
        let p = self.prediction?;
        if now.abs_diff(p.expected()) <= tolerance {
            self.confidence = (self.confidence + 1).min(max_confidence);
            Some(Verdict::Confirmed)
        } else {
            self.confidence = self.confidence.saturating_sub(1);
            Some(Verdict::Missed)
        }
    }

    /// Remaining cycles of the standing prediction at `now`, unless it is
    /// stale (its expected cycle plus `tolerance` has passed).
    pub fn live_remaining(&self, now: Cycle, tolerance: u64) -> Option<u64> {
        let p = self.prediction?;
        if p.expected() + tolerance < now {
            None
        } else {
            Some(p.expected().saturating_sub(now))
        }
    }
}
