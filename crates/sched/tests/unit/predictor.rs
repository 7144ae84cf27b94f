//! Long-Latency Predictor Tests.
//!
//! Verifies phase classification from event timestamps, prediction grading,
//! event detection over the event queue, and the choice of the sibling
//! thread predicted to stall next.

use pretty_assertions::assert_eq;
use rstest::rstest;
use smtsched_core::common::{ContextId, NodeId};
use smtsched_core::config::PredictorConfig;
use smtsched_core::core::Cpu;
use smtsched_core::core::pipeline::{EventQueue, MicroOp, UopKind};
use smtsched_core::core::units::llp::{EventOutcome, LongLatencyPredictor, Phase, Verdict};

use crate::common::builder::{ConfigBuilder, load};

const KEY: u64 = 0x40_0000;

fn predictor() -> LongLatencyPredictor {
    LongLatencyPredictor::new(&PredictorConfig::default())
}

/// Feeds events for `KEY` at the given cycles and returns the last outcome.
fn feed(p: &mut LongLatencyPredictor, cycles: &[u64]) -> Option<EventOutcome> {
    cycles
        .iter()
        .map(|&c| p.long_latency_event(KEY, c, c))
        .last()
}

// ══════════════════════════════════════════════════════════
// 1. Phase classification
// ══════════════════════════════════════════════════════════

/// Phases are only classified once four intervals are closed.
#[rstest]
#[case(&[0, 100, 200, 300, 400], Phase::Equal)]
#[case(&[0, 100, 150, 250, 300], Phase::Alternating)]
#[case(&[0, 100, 200, 304, 414], Phase::Stable)]
#[case(&[0, 100, 200, 250, 450], Phase::Irregular)]
fn classifies_last_three_lives(#[case] events: &[u64], #[case] phase: Phase) {
    let mut p = predictor();
    let out = feed(&mut p, events);
    assert_eq!(out, Some(EventOutcome::Closed { phase, verdict: None }));
}

/// Three closed intervals are not enough for a prediction.
#[test]
fn no_prediction_before_four_intervals() {
    let mut p = predictor();
    let _ = feed(&mut p, &[0, 100, 200, 300]);
    assert_eq!(p.entry(KEY, 0).map(|e| e.phase), Some(Phase::Unknown));
    assert_eq!(p.predicted_remaining(350), None);
}

/// An equal phase predicts the next event one life time ahead.
#[test]
fn equal_phase_forecast() {
    let mut p = predictor();
    let _ = feed(&mut p, &[0, 100, 200, 300, 400]);
    assert_eq!(p.predicted_remaining(450), Some(50));
    let f = p.forecast(450).unwrap();
    assert_eq!((f.made_at, f.key), (400, KEY));
}

// ══════════════════════════════════════════════════════════
// 2. Confirmation
// ══════════════════════════════════════════════════════════

/// An event on time confirms; a late one misses and costs confidence.
#[test]
fn grading_adjusts_confidence() {
    let mut p = predictor();
    let _ = feed(&mut p, &[0, 100, 200, 300, 400]);
    assert_eq!(
        p.long_latency_event(KEY, 500, 500),
        EventOutcome::Closed {
            phase: Phase::Equal,
            verdict: Some(Verdict::Confirmed)
        }
    );
    assert_eq!(p.entry(KEY, 0).map(|e| e.confidence), Some(1));

    let out = p.long_latency_event(KEY, 650, 650);
    assert!(matches!(
        out,
        EventOutcome::Closed {
            verdict: Some(Verdict::Missed),
            ..
        }
    ));
    assert_eq!(p.entry(KEY, 0).map(|e| e.confidence), Some(0));
}

/// A prediction whose time passed beyond the tolerance is no longer live.
#[test]
fn stale_prediction_is_dropped() {
    let mut p = predictor();
    let _ = feed(&mut p, &[0, 100, 200, 300, 400]);
    let tol = PredictorConfig::default().tolerance;
    assert_eq!(p.predicted_remaining(500 + tol), Some(0));
    assert_eq!(p.predicted_remaining(501 + tol), None);
}

// ══════════════════════════════════════════════════════════
// 3. Event queue scan
// ══════════════════════════════════════════════════════════

/// A load counts one miss past the miss threshold and one event past the
/// long-latency threshold, never more.
#[test]
fn scan_raises_each_event_once() {
    let cfg = PredictorConfig::default();
    let mut p = predictor();
    let mut q = EventQueue::new();
    let _ = q.issue(load(ContextId(1), 0x400, 0x9000, 0, 1000));
    let _ = q.issue(MicroOp::new(0, ContextId(1), 0x500, UopKind::Int, 0).ready_at(1000));

    let miss_at = cfg.miss_threshold + 1;
    let event_at = cfg.long_latency_threshold + 1;

    assert_eq!(p.scan(&mut q, 0, miss_at - 1).misses, 0);
    assert_eq!(p.scan(&mut q, 0, miss_at).misses, 1);
    assert_eq!(p.scan(&mut q, 0, miss_at + 1).misses, 0);
    assert_eq!(p.scan(&mut q, 0, event_at - 1).events, 0);
    assert_eq!(p.scan(&mut q, 0, event_at).events, 1);
    assert_eq!(p.scan(&mut q, 0, event_at + 1).events, 0);
    assert_eq!(p.len(), 1);
}

/// Only the scanned thread's ops are considered.
#[test]
fn scan_ignores_other_threads() {
    let mut p = predictor();
    let mut q = EventQueue::new();
    let mut op = load(ContextId(2), 0x400, 0x9000, 0, 1000);
    op.thread = 1;
    let _ = q.issue(op);
    let report = p.scan(&mut q, 0, 500);
    assert_eq!((report.misses, report.events), (0, 0));
    assert!(p.is_empty());
}

/// Stores raise long-latency events but are never counted as misses.
#[test]
fn stores_are_not_misses() {
    let mut p = predictor();
    let mut q = EventQueue::new();
    let _ = q.issue(MicroOp::new(0, ContextId(1), 0x400, UopKind::Store, 0).ready_at(1000));
    let report = p.scan(&mut q, 0, 500);
    assert_eq!((report.misses, report.events), (0, 1));
}

// ══════════════════════════════════════════════════════════
// 4. Next stalling thread
// ══════════════════════════════════════════════════════════

fn predict(cpu: &mut Cpu, thread: usize, events: &[u64]) {
    let t = cpu.thread_mut(NodeId::new(0, thread)).unwrap();
    for &c in events {
        let _ = t.predictor.long_latency_event(KEY, c, c);
    }
}

/// The sibling with the soonest live prediction wins; the caller is skipped.
#[test]
fn nearest_sibling_is_chosen() {
    let mut cpu = Cpu::new(&ConfigBuilder::new().grid(1, 3).build());
    predict(&mut cpu, 1, &[0, 100, 200, 300, 400]); // next at 500
    predict(&mut cpu, 2, &[0, 50, 100, 150, 200]); // next at 250
    cpu.cycle = 210;
    assert_eq!(cpu.predict_next_stalling_thread(0, 0), Ok(Some(2)));
    assert_eq!(cpu.predict_next_stalling_thread(0, 2), Ok(Some(1)));
}

/// Equal distances go to the lowest thread index.
#[test]
fn ties_go_to_lowest_thread() {
    let mut cpu = Cpu::new(&ConfigBuilder::new().grid(1, 3).build());
    predict(&mut cpu, 1, &[0, 100, 200, 300, 400]);
    predict(&mut cpu, 2, &[0, 100, 200, 300, 400]);
    cpu.cycle = 420;
    assert_eq!(cpu.predict_next_stalling_thread(0, 0), Ok(Some(1)));
}

/// Without any live prediction there is nothing to choose.
#[test]
fn no_prediction_no_target() {
    let cpu = Cpu::new(&ConfigBuilder::new().grid(1, 2).build());
    assert_eq!(cpu.predict_next_stalling_thread(0, 0), Ok(None));
    assert!(cpu.predict_next_stalling_thread(3, 0).is_err());
}
