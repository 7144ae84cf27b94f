//! Round-Robin Ranking.
//!
//! Re-admits the first eligible slot after the outgoing one, wrapping at the
//! buffer's fill length. With every slot eligible this visits
//! `(i + 1) % n, (i + 2) % n, ...`. The outgoing slot is reached last, which
//! makes a single-entry buffer re-select its only context.

use super::{RankView, RankingPolicy};

/// Round-robin policy. Stateless; the cursor is the buffer's outgoing slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobin;

impl RankingPolicy for RoundRobin {
    fn select(&mut self, view: &RankView<'_>) -> Option<usize> {
        view.cyclic().next().map(|c| c.index)
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}
