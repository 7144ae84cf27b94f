//! Stall-Driven Prefetcher.
//!
//! When the long-latency predictor says a sibling thread is about to stall,
//! the prefetcher replays the target thread's memory summary into the cache
//! hierarchy so the context that runs next finds its working set warm:
//! 1. **Strides:** One block-aligned load per block spanned by each stride run,
//!    or a single load when the run fits in one block.
//! 2. **Data Tags:** One load per valid data MRU tag.
//! 3. **Instruction Tags:** One fetch per valid instruction MRU tag.
//!
//! # Performance
//!
//! - **Time Complexity:** `plan()`: O(B * (S + N)) for B buckets, S blocks per stride, N ways
//! - **Hardware Cost:** None beyond the logger; requests are fire-and-forget

/// Per-thread address bucketing, stride detection and MRU sets.
pub mod logger;

/// N-way MRU tag set with decrement-on-miss aging.
pub mod mru;

pub use self::logger::{MemoryPatternLogger, StrideEntry, longest_stride_run};
pub use self::mru::{MruSet, MruTouch};

use crate::common::{AccessKind, Cycle};
use crate::config::PrefetchConfig;
use crate::core::units::llp::Forecast;
use crate::soc::MemoryPort;

/// One request the prefetcher wants issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefetchRequest {
    /// Load or fetch.
    pub kind: AccessKind,
    /// Block-aligned address.
    pub addr: u64,
}

impl PrefetchRequest {
    const fn load(addr: u64) -> Self {
        Self {
            kind: AccessKind::Load,
            addr,
        }
    }
}

/// Stall-driven prefetcher.
#[derive(Clone, Debug)]
pub struct Prefetcher {
    enabled: bool,
    lead_cycles: u64,
    max_blocks: usize,
}

impl Prefetcher {
    /// Creates a prefetcher from its configuration.
    pub fn new(config: &PrefetchConfig) -> Self {
        Self {
            enabled: config.enabled,
            lead_cycles: config.lead_cycles,
            max_blocks: config.max_blocks_per_stride.max(1),
        }
    }

    /// Returns true if prefetching is switched on.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Decides whether `forecast` warrants a burst.
    ///
    /// The predicted stall must be within the lead window, and the same
    /// prediction (identified by its timestamp) never fires twice.
    pub fn should_fire(&self, forecast: &Forecast, last_fired: Option<Cycle>) -> bool {
        self.enabled
            && forecast.remaining <= self.lead_cycles
            && last_fired != Some(forecast.made_at)
    }

    /// Builds the request list for `logger` without issuing anything.
    pub fn plan(&self, logger: &MemoryPatternLogger) -> Vec<PrefetchRequest> {
        let block = logger.block_size();
        let mask = !(block - 1);
        let mut out = Vec::new();

        for entry in logger.strides() {
            let span = entry.span();
            if span.unsigned_abs() > block {
                let end = entry.initial.wrapping_add_signed(span);
                let (lo, hi) = if span < 0 {
                    (end, entry.initial)
                } else {
                    (entry.initial, end)
                };
                let mut addr = lo & mask;
                let mut issued = 0;
                while addr < hi && issued < self.max_blocks {
                    out.push(PrefetchRequest::load(addr));
                    addr = addr.saturating_add(block);
                    issued += 1;
                }
            } else {
                out.push(PrefetchRequest::load(entry.initial & mask));
            }
        }

        out.extend(logger.data_tags().map(PrefetchRequest::load));
        out.extend(logger.inst_tags().map(|addr| PrefetchRequest {
            kind: AccessKind::Fetch,
            addr,
        }));
        out
    }

    /// Issues the plan for `logger` through `port`. Returns the number of
    /// requests issued.
    pub fn issue(&self, logger: &MemoryPatternLogger, port: &mut dyn MemoryPort) -> usize {
        let plan = self.plan(logger);
        for req in &plan {
            port.issue(req.kind, req.addr);
        }
        plan.len()
    }
}
