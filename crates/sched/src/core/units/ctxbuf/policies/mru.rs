//! Most-Recently-Evicted Ranking.
//!
//! Re-admits the buffered context whose eviction is the most recent, on the
//! theory that its working set is the most likely to still be cache-resident.
//! The outgoing candidate is skipped so the thread does not immediately
//! re-run the context it just gave up, unless nothing else is eligible.
//!
//! Slots are scanned in cyclic order starting one past the outgoing slot,
//! modulo the buffer's fill length. A strictly later eviction is required to
//! displace the current best, so ties go to the first slot in scan order.

use super::{RankView, RankingPolicy};

/// Most-recently-evicted policy. Stateless.
#[derive(Clone, Copy, Debug, Default)]
pub struct MostRecentlyEvicted;

impl RankingPolicy for MostRecentlyEvicted {
    fn select(&mut self, view: &RankView<'_>) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for c in view.cyclic().filter(|c| c.index != view.outgoing) {
            match best {
                Some((_, cycle)) if c.eviction_cycle <= cycle => {}
                _ => best = Some((c.index, c.eviction_cycle)),
            }
        }
        best.map(|(index, _)| index).or_else(|| view.sole_outgoing())
    }

    fn name(&self) -> &'static str {
        "mru"
    }
}
