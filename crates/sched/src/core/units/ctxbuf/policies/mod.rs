//! Re-admission Ranking Policies.
//!
//! Implements the algorithms that pick which buffered context runs next when
//! no context is starving.
//!
//! # Policies
//!
//! - `MostRecentlyEvicted`: Latest eviction cycle wins.
//! - `Random`: Largest weight from a cycle-seeded generator wins.
//! - `RoundRobin`: Next entry after the outgoing one wins.

/// Most-recently-evicted ranking.
pub mod mru;

/// Cycle-seeded random ranking.
pub mod random;

/// Round-robin ranking.
pub mod round_robin;

use std::fmt;

pub use mru::MostRecentlyEvicted;
pub use random::RandomRanking;
pub use round_robin::RoundRobin;

use crate::common::{ContextId, Cycle};
use crate::config::RankingPolicyKind;

/// A buffered context eligible for re-admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Slot index in the buffer.
    pub index: usize,
    /// Context held in the slot.
    pub ctx: ContextId,
    /// Cycle the context was last evicted (or first registered).
    pub eviction_cycle: Cycle,
    /// Idle cycles accumulated since the context last ran.
    pub idle_cycles: u64,
}

/// What a ranking policy gets to look at.
#[derive(Clone, Copy, Debug)]
pub struct RankView<'a> {
    /// Eligible entries, in slot order.
    pub candidates: &'a [Candidate],
    /// Current fill length of the buffer (the modulus for cyclic scans).
    pub fill_len: usize,
    /// Slot of the previous best candidate.
    pub outgoing: usize,
    /// Current simulation cycle.
    pub cycle: Cycle,
}

impl RankView<'_> {
    /// Looks up the candidate occupying slot `index`.
    pub fn at(&self, index: usize) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.index == index)
    }

    /// Candidates in cyclic slot order starting right after the outgoing
    /// slot. The outgoing slot, if eligible, comes last.
    pub fn cyclic(&self) -> impl Iterator<Item = &Candidate> {
        let len = self.fill_len.max(1);
        (1..=len).filter_map(move |k| self.at((self.outgoing + k) % len))
    }

    /// The outgoing slot's candidate, if it is the only one left.
    pub fn sole_outgoing(&self) -> Option<usize> {
        match self.candidates {
            [only] if only.index == self.outgoing => Some(only.index),
            _ => None,
        }
    }
}

/// Trait for re-admission ranking policies.
///
/// A policy sees the eligible candidates and returns the slot index to run
/// next. It never sees vacant or consumed slots.
pub trait RankingPolicy: Send + Sync + fmt::Debug {
    /// Selects the slot to re-admit.
    ///
    /// # Arguments
    ///
    /// * `view` - Eligible candidates plus the buffer's fill length, outgoing slot, and cycle.
    ///
    /// # Returns
    ///
    /// The chosen slot index, or `None` if there is no candidate.
    fn select(&mut self, view: &RankView<'_>) -> Option<usize>;

    /// Short policy name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Builds the configured ranking policy.
pub fn build(kind: RankingPolicyKind) -> Box<dyn RankingPolicy> {
    match kind {
        RankingPolicyKind::MostRecentlyEvicted => Box::new(MostRecentlyEvicted),
        RankingPolicyKind::Random => Box::new(RandomRanking::new()),
        RankingPolicyKind::RoundRobin => Box::new(RoundRobin),
    }
}
