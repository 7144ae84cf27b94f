//! MRU Tag Set.
//!
//! An N-way set of block tags with decrement-on-miss aging. Counters of the
//! filled ways always form a permutation of `0..filled`, with `N - 1` the most
//! recently confirmed tag and `0` the next victim.
//!
//! # Performance
//!
//! - **Time Complexity:** `touch()`: O(N)
//! - **Space Complexity:** O(N)

/// One way of the set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MruWay {
    /// Block-aligned address held by the way.
    pub tag: u64,
    /// Recency rank; higher is more recent.
    pub counter: usize,
    /// The way holds a tag.
    pub valid: bool,
}

/// What a [`MruSet::touch`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MruTouch {
    /// The tag was present in this way.
    Hit(usize),
    /// The tag went into an empty way.
    Fill(usize),
    /// The tag replaced `victim` in this way.
    Replace {
        /// Way re-tagged.
        way: usize,
        /// Block address evicted.
        victim: u64,
    },
}

/// N-way MRU tag set.
#[derive(Clone, Debug)]
pub struct MruSet {
    ways: Vec<MruWay>,
    block_mask: u64,
}

impl MruSet {
    /// Creates an empty set of `ways` ways over blocks of `1 << block_shift` bytes.
    pub fn new(ways: usize, block_shift: u32) -> Self {
        Self {
            ways: vec![MruWay::default(); ways.max(1)],
            block_mask: !((1u64 << block_shift) - 1),
        }
    }

    /// Associativity.
    pub fn ways(&self) -> usize {
        self.ways.len()
    }

    /// Number of valid ways.
    pub fn filled(&self) -> usize {
        self.ways.iter().filter(|w| w.valid).count()
    }

    /// Raw way state.
    pub fn way(&self, index: usize) -> Option<&MruWay> {
        self.ways.get(index)
    }

    /// Valid block addresses, in way order.
    pub fn tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.ways.iter().filter(|w| w.valid).map(|w| w.tag)
    }

    /// Returns true if the block holding `addr` is present.
    pub fn contains(&self, addr: u64) -> bool {
        let tag = addr & self.block_mask;
        self.ways.iter().any(|w| w.valid && w.tag == tag)
    }

    /// Records an access to `addr`.
    pub fn touch(&mut self, addr: u64) -> MruTouch {
        let tag = addr & self.block_mask;
        let top = self.ways.len() - 1;

        if let Some(way) = self.ways.iter().position(|w| w.valid && w.tag == tag) {
            let rank = self.ways[way].counter;
            let filled = self.filled();
            for w in self.ways.iter_mut().filter(|w| w.valid && w.counter > rank) {
                w.counter -= 1;
            }
            self.ways[way].counter = filled - 1;
            return MruTouch::Hit(way);
        }

        if let Some(way) = self.ways.iter().position(|w| !w.valid) {
            let filled = self.filled();
            self.ways[way] = MruWay {
                tag,
                counter: filled,
                valid: true,
            };
            return MruTouch::Fill(way);
        }

        // Full set: everything ages by one, and the way that wraps is replaced.
        let mut replaced = (0, 0);
        for (i, w) in self.ways.iter_mut().enumerate() {
            if w.counter == 0 {
                replaced = (i, w.tag);
                w.tag = tag;
                w.counter = top;
            } else {
                w.counter -= 1;
            }
        }
        MruTouch::Replace {
            way: replaced.0,
            victim: replaced.1,
        }
    }
}
