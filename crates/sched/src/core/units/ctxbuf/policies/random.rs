//! Random Ranking.
//!
//! Draws one weight per buffer slot from an xorshift generator seeded with
//! the current cycle and re-admits the eligible slot with the largest weight.
//! Seeding from the cycle keeps runs reproducible without carrying generator
//! state across calls.

use super::{RankView, RankingPolicy};

/// Random policy state.
#[derive(Clone, Debug, Default)]
pub struct RandomRanking {
    weights: Vec<u64>,
}

impl RandomRanking {
    /// Creates a new random policy instance.
    pub const fn new() -> Self {
        Self {
            weights: Vec::new(),
        }
    }

    /// Fills `weights` with one draw per slot for the given seed.
    fn draw(&mut self, seed: u64, slots: usize) {
        // xorshift gets stuck at zero; fold in a non-zero constant.
        let mut x = seed ^ 0x9E37_79B9_7F4A_7C15;
        self.weights.clear();
        for _ in 0..slots {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.weights.push(x);
        }
    }
}

impl RankingPolicy for RandomRanking {
    fn select(&mut self, view: &RankView<'_>) -> Option<usize> {
        self.draw(view.cycle, view.fill_len);
        let mut best: Option<(usize, u64)> = None;
        for c in view.candidates.iter().filter(|c| c.index != view.outgoing) {
            let w = self.weights.get(c.index).copied().unwrap_or(0);
            match best {
                Some((_, bw)) if w <= bw => {}
                _ => best = Some((c.index, w)),
            }
        }
        best.map(|(index, _)| index).or_else(|| view.sole_outgoing())
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
