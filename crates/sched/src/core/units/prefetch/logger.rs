//! Memory Pattern Logger.
//!
//! Records a thread's recent memory addresses and summarizes them for the
//! prefetcher. Addresses are hashed into buckets by block number. Each bucket
//! keeps:
//! 1. **Address Ring:** The last `ring_length` data addresses.
//! 2. **Stride Entry:** The longest constant-delta run found the last time the ring filled.
//! 3. **MRU Sets:** Separate data and instruction tag sets.

use tracing::trace;

use super::mru::{MruSet, MruTouch};
use crate::config::LoggerConfig;

/// A detected constant-stride run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrideEntry {
    /// Address delta between consecutive accesses.
    pub stride: i64,
    /// First address of the run.
    pub initial: u64,
    /// Number of equal deltas in the run.
    pub count: usize,
}

impl StrideEntry {
    /// Signed byte span covered, `stride * count`.
    pub const fn span(&self) -> i64 {
        self.stride.saturating_mul(self.count as i64)
    }
}

/// Finds the longest run of equal consecutive deltas in `addrs`.
///
/// A run needs at least `min_run` equal deltas. The earliest of equally long
/// runs wins.
///
/// ```
/// use smtsched_core::core::units::prefetch::logger::{longest_stride_run, StrideEntry};
///
/// let run = longest_stride_run(&[100, 104, 108, 112], 3);
/// assert_eq!(run, Some(StrideEntry { stride: 4, initial: 100, count: 3 }));
/// assert_eq!(longest_stride_run(&[100, 104, 109, 112], 3), None);
/// ```
pub fn longest_stride_run(addrs: &[u64], min_run: usize) -> Option<StrideEntry> {
    let mut best: Option<StrideEntry> = None;
    let mut run_start = 0;
    let mut run_len = 0;
    let mut run_delta = 0i64;

    for (i, pair) in addrs.windows(2).enumerate() {
        let delta = pair[1].wrapping_sub(pair[0]) as i64;
        if run_len > 0 && delta == run_delta {
            run_len += 1;
        } else {
            run_start = i;
            run_len = 1;
            run_delta = delta;
        }
        if run_len >= min_run && best.is_none_or(|b| run_len > b.count) {
            best = Some(StrideEntry {
                stride: run_delta,
                initial: addrs[run_start],
                count: run_len,
            });
        }
    }
    best
}

/// One address bucket.
#[derive(Clone, Debug)]
struct Bucket {
    ring: Vec<u64>,
    stride: Option<StrideEntry>,
    data: MruSet,
    inst: MruSet,
}

/// Per-thread memory pattern logger.
#[derive(Clone, Debug)]
pub struct MemoryPatternLogger {
    buckets: Vec<Bucket>,
    ring_length: usize,
    block_shift: u32,
    min_run: usize,
}

impl MemoryPatternLogger {
    /// Creates an empty logger.
    pub fn new(config: &LoggerConfig) -> Self {
        let bucket = Bucket {
            ring: Vec::with_capacity(config.ring_length),
            stride: None,
            data: MruSet::new(config.associativity, config.block_shift),
            inst: MruSet::new(config.associativity, config.block_shift),
        };
        Self {
            buckets: vec![bucket; config.buckets.max(1)],
            ring_length: config.ring_length.max(2),
            block_shift: config.block_shift,
            min_run: config.min_stride_run,
        }
    }

    /// Bucket index of `addr`.
    #[inline]
    pub fn bucket_of(&self, addr: u64) -> usize {
        ((addr >> self.block_shift) % self.buckets.len() as u64) as usize
    }

    /// Block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> u64 {
        1 << self.block_shift
    }

    /// Records an access.
    ///
    /// Instruction addresses only update the instruction MRU set. Data
    /// addresses go into the ring and the data MRU set; a full ring is scanned
    /// for a stride and then restarted. Returns the stride recorded by this
    /// access, if any.
    pub fn record(&mut self, addr: u64, is_instruction: bool) -> Option<StrideEntry> {
        let index = self.bucket_of(addr);
        let ring_length = self.ring_length;
        let min_run = self.min_run;
        let bucket = &mut self.buckets[index];

        if is_instruction {
            let touch = bucket.inst.touch(addr);
            trace!(addr, bucket = index, ?touch, "instruction access");
            return None;
        }

        if let MruTouch::Replace { victim, .. } = bucket.data.touch(addr) {
            trace!(addr, bucket = index, victim, "data mru replacement");
        }

        bucket.ring.push(addr);
        if bucket.ring.len() < ring_length {
            return None;
        }
        let found = longest_stride_run(&bucket.ring, min_run);
        bucket.ring.clear();
        if let Some(entry) = found {
            bucket.stride = Some(entry);
            trace!(bucket = index, stride = entry.stride, initial = entry.initial, count = entry.count, "stride recorded");
        }
        found
    }

    /// Stride entries currently recorded, in bucket order.
    pub fn strides(&self) -> impl Iterator<Item = StrideEntry> + '_ {
        self.buckets.iter().filter_map(|b| b.stride)
    }

    /// Stride entry of one bucket.
    pub fn stride(&self, bucket: usize) -> Option<StrideEntry> {
        self.buckets.get(bucket).and_then(|b| b.stride)
    }

    /// Valid data tags, bucket by bucket.
    pub fn data_tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.iter().flat_map(|b| b.data.tags())
    }

    /// Valid instruction tags, bucket by bucket.
    pub fn inst_tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.iter().flat_map(|b| b.inst.tags())
    }
}
