//! Inactive-Context Buffer Tests.
//!
//! Verifies slot management (insert, reuse, remove, capacity), idle-time
//! aging, the starvation override under every ranking policy, and the
//! selection order of each policy.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use smtsched_core::common::{ContextId, NodeId, SchedError};
use smtsched_core::config::{RankingPolicyKind, SchedulerConfig};
use smtsched_core::core::units::ctxbuf::{InactiveContextBuffer, SlotState};

const NODE: NodeId = NodeId::new(0, 0);

fn buffer(capacity: usize, starvation: u64, ranking: RankingPolicyKind) -> InactiveContextBuffer {
    InactiveContextBuffer::new(
        NODE,
        &SchedulerConfig {
            buffer_capacity: capacity,
            starvation_threshold: starvation,
            ranking,
            ..SchedulerConfig::default()
        },
    )
}

fn ctx(n: u32) -> ContextId {
    ContextId(n)
}

// ══════════════════════════════════════════════════════════
// 1. Slots and capacity
// ══════════════════════════════════════════════════════════

/// `can_admit` flips exactly when occupancy reaches capacity.
#[test]
fn can_admit_tracks_occupancy() {
    let mut buf = buffer(2, u64::MAX, RankingPolicyKind::RoundRobin);
    assert!(buf.can_admit());
    let _ = buf.insert(ctx(1), 0).unwrap();
    assert!(buf.can_admit());
    let _ = buf.insert(ctx(2), 0).unwrap();
    assert!(!buf.can_admit());
    buf.remove(ctx(1)).unwrap();
    assert!(buf.can_admit());
    assert_eq!(buf.occupancy(), 1);
}

/// Re-inserting a running (consumed) context reuses its slot on a full buffer.
#[test]
fn reinsert_on_full_buffer_reuses_slot() {
    let mut buf = buffer(2, u64::MAX, RankingPolicyKind::RoundRobin);
    let _ = buf.insert(ctx(1), 0).unwrap();
    let _ = buf.insert(ctx(2), 0).unwrap();
    let sel = buf.select_next(1, |_| true).unwrap();
    assert_eq!(buf.entries()[sel.index].state, SlotState::Consumed);
    assert_eq!(buf.insert(sel.ctx, 5), Ok(sel.index));
    assert_eq!(buf.occupancy(), 2);
    assert_eq!(buf.entries()[sel.index].state, SlotState::Ready);
}

/// Removing an absent id is the one fatal precondition violation.
#[test]
fn remove_absent_is_error() {
    let mut buf = buffer(2, u64::MAX, RankingPolicyKind::MostRecentlyEvicted);
    let _ = buf.insert(ctx(1), 0).unwrap();
    assert_eq!(
        buf.remove(ctx(3)),
        Err(SchedError::NotBuffered {
            ctx: ctx(3),
            node: NODE
        })
    );
    buf.remove(ctx(1)).unwrap();
    assert!(buf.remove(ctx(1)).is_err(), "double remove must fail");
}

/// Run counts accumulate across evictions of the same context.
#[test]
fn run_count_accumulates() {
    let mut buf = buffer(1, u64::MAX, RankingPolicyKind::RoundRobin);
    for cycle in [0, 10, 20] {
        let _ = buf.insert(ctx(4), cycle).unwrap();
        let _ = buf.select_next(cycle + 1, |_| true).unwrap();
    }
    assert_eq!(buf.entry(ctx(4)).map(|e| e.runs), Some(3));
    assert_eq!(buf.entry(ctx(4)).map(|e| e.eviction_cycle), Some(20));
}

// ══════════════════════════════════════════════════════════
// 2. Starvation override
// ══════════════════════════════════════════════════════════

/// An entry whose idle time reached the threshold wins under every policy.
#[rstest]
#[case(RankingPolicyKind::MostRecentlyEvicted)]
#[case(RankingPolicyKind::Random)]
#[case(RankingPolicyKind::RoundRobin)]
fn starving_entry_wins(#[case] ranking: RankingPolicyKind) {
    let mut buf = buffer(3, 100, ranking);
    let _ = buf.insert(ctx(1), 0).unwrap();
    let _ = buf.insert(ctx(2), 50).unwrap();
    let _ = buf.insert(ctx(3), 150).unwrap();
    // ctx1 idled 150, ctx2 100, ctx3 0.
    let sel = buf.select_next(150, |_| true).unwrap();
    assert_eq!(sel.ctx, ctx(1));
    assert!(sel.starved);
}

/// Reaching the threshold exactly is enough, and the earliest slot wins.
#[rstest]
#[case(RankingPolicyKind::MostRecentlyEvicted)]
#[case(RankingPolicyKind::Random)]
#[case(RankingPolicyKind::RoundRobin)]
fn threshold_is_inclusive(#[case] ranking: RankingPolicyKind) {
    let mut buf = buffer(3, 100, ranking);
    let _ = buf.insert(ctx(1), 0).unwrap();
    let _ = buf.insert(ctx(2), 50).unwrap();
    let _ = buf.insert(ctx(3), 150).unwrap();
    buf.remove(ctx(1)).unwrap();
    let sel = buf.select_next(150, |_| true).unwrap();
    assert_eq!(sel.ctx, ctx(2));
    assert!(sel.starved);
}

/// Ineligible contexts never starve their way in.
#[test]
fn starvation_respects_eligibility() {
    let mut buf = buffer(3, 10, RankingPolicyKind::RoundRobin);
    let _ = buf.insert(ctx(1), 0).unwrap();
    let _ = buf.insert(ctx(2), 100).unwrap();
    let sel = buf.select_next(100, |c| c != ctx(1)).unwrap();
    assert_eq!(sel.ctx, ctx(2));
    assert!(!sel.starved);
}

// ══════════════════════════════════════════════════════════
// 3. Ranking policies
// ══════════════════════════════════════════════════════════

/// Round-robin visits `(i+1) mod N, (i+2) mod N, ...`.
#[test]
fn round_robin_cycles_through_slots() {
    let mut buf = buffer(4, u64::MAX, RankingPolicyKind::RoundRobin);
    for n in 0..4 {
        let _ = buf.insert(ctx(n), 0).unwrap();
    }
    let mut order = Vec::new();
    for cycle in 1..=6 {
        let sel = buf.select_next(cycle, |_| true).unwrap();
        order.push(sel.index);
        // Evicted again right away.
        let _ = buf.insert(sel.ctx, cycle).unwrap();
    }
    assert_eq!(order, vec![1, 2, 3, 0, 1, 2]);
}

/// A single-slot buffer always re-selects its only context.
#[rstest]
#[case(RankingPolicyKind::MostRecentlyEvicted)]
#[case(RankingPolicyKind::Random)]
#[case(RankingPolicyKind::RoundRobin)]
fn single_slot_reselects(#[case] ranking: RankingPolicyKind) {
    let mut buf = buffer(1, u64::MAX, ranking);
    for cycle in [0, 7, 19] {
        let _ = buf.insert(ctx(9), cycle).unwrap();
        assert_eq!(buf.select_next(cycle, |_| true).map(|s| s.ctx), Some(ctx(9)));
    }
}

/// After evicting A then B, most-recently-evicted skips outgoing B and returns A.
#[test]
fn mru_skips_outgoing() {
    let mut buf = buffer(2, u64::MAX, RankingPolicyKind::MostRecentlyEvicted);
    let a = ctx(1);
    let b = ctx(2);
    let _ = buf.insert(a, 10).unwrap();
    let _ = buf.insert(b, 20).unwrap();
    // Slot 0 is the initial outgoing slot, so B runs first.
    assert_eq!(buf.select_next(21, |_| true).map(|s| s.ctx), Some(b));
    let _ = buf.insert(b, 30).unwrap();
    assert_eq!(buf.select_next(31, |_| true).map(|s| s.ctx), Some(a));
}

/// Among non-outgoing entries the latest eviction wins; ties keep scan order.
#[test]
fn mru_latest_eviction_and_tie_order() {
    let mut buf = buffer(4, u64::MAX, RankingPolicyKind::MostRecentlyEvicted);
    for n in 0..4 {
        let _ = buf.insert(ctx(n), 5).unwrap();
    }
    // Outgoing is slot 0; slots 1..3 tie at cycle 5, slot 1 is scanned first.
    assert_eq!(buf.select_next(6, |_| true).map(|s| s.index), Some(1));
    let _ = buf.insert(ctx(1), 6).unwrap();
    let _ = buf.insert(ctx(3), 8).unwrap();
    // Outgoing is slot 1: candidates 2 (5), 3 (8), 0 (5).
    assert_eq!(buf.select_next(9, |_| true).map(|s| s.index), Some(3));
}

/// Random ranking is a pure function of the cycle and the slot layout.
#[test]
fn random_is_reproducible() {
    let pick = |cycle| {
        let mut buf = buffer(4, u64::MAX, RankingPolicyKind::Random);
        for n in 0..4 {
            let _ = buf.insert(ctx(n), 0).unwrap();
        }
        buf.select_next(cycle, |_| true).map(|s| s.index)
    };
    for cycle in [1, 99, 12345] {
        let first = pick(cycle);
        assert_eq!(first, pick(cycle));
        assert_ne!(first, Some(0), "outgoing slot must be skipped");
    }
}

/// Nothing eligible means nothing selected.
#[rstest]
#[case(RankingPolicyKind::MostRecentlyEvicted)]
#[case(RankingPolicyKind::Random)]
#[case(RankingPolicyKind::RoundRobin)]
fn empty_selection(#[case] ranking: RankingPolicyKind) {
    let mut buf = buffer(2, u64::MAX, ranking);
    assert!(buf.select_next(0, |_| true).is_none());
    let _ = buf.insert(ctx(1), 0).unwrap();
    assert!(buf.select_next(0, |_| false).is_none());
}

// ══════════════════════════════════════════════════════════
// 4. Occupancy bounds
// ══════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
enum Op {
    Insert(u32),
    Remove(u32),
    Select,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..6).prop_map(Op::Insert),
        (0u32..6).prop_map(Op::Remove),
        Just(Op::Select),
    ]
}

proptest! {
    /// Occupancy never exceeds capacity and always equals the number of
    /// non-vacant slots, whatever the operation sequence.
    #[test]
    fn occupancy_is_bounded(ops in prop::collection::vec(op(), 1..64)) {
        let mut buf = buffer(3, 50, RankingPolicyKind::MostRecentlyEvicted);
        for (cycle, op) in ops.into_iter().enumerate() {
            let cycle = cycle as u64;
            let before = buf.occupancy();
            match op {
                Op::Insert(n) => {
                    let known = buf.entry(ctx(n)).is_some();
                    let res = buf.insert(ctx(n), cycle);
                    prop_assert_eq!(res.is_ok(), known || before < 3);
                }
                Op::Remove(n) => {
                    let known = buf.entry(ctx(n)).is_some();
                    prop_assert_eq!(buf.remove(ctx(n)).is_ok(), known);
                }
                Op::Select => {
                    let _ = buf.select_next(cycle, |_| true);
                }
            }
            let occupied = buf.entries().iter().filter(|e| e.state != SlotState::Vacant).count();
            prop_assert!(buf.occupancy() <= buf.capacity());
            prop_assert_eq!(buf.occupancy(), occupied);
            prop_assert_eq!(buf.can_admit(), buf.occupancy() < buf.capacity());
        }
    }
}
