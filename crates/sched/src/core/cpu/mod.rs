//! Multi-core CPU Scheduling State.
//!
//! This module defines the central `Cpu` structure, which owns every core,
//! hardware thread and context. It coordinates the following:
//! 1. **Scheduling:** The per-cycle pass that maps, allocates and unmaps contexts.
//! 2. **Eviction:** The two-phase signal/effective eviction protocol.
//! 3. **Prediction:** Micro-op issue, predictor scans, and stall-driven prefetch.
//!
//! All of it runs on the caller's thread, one cycle at a time.

/// Eviction signaling and effective eviction.
pub mod eviction;

/// Micro-op issue, predictor scans, access logging, prefetch and recovery.
pub mod prediction;

/// The scheduling pass, mapping, unmapping and allocation.
pub mod schedule;

use crate::common::{Affinity, ContextId, Cycle, NodeId, SchedError};
use crate::config::Config;
use crate::core::context::{ArchSnapshot, ContextTable};
use crate::core::thread::{Core, HardwareThread};
use crate::core::units::prefetch::Prefetcher;
use crate::stats::SchedStats;

/// Processor-wide scheduling state.
#[derive(Debug)]
pub struct Cpu {
    /// Configuration the CPU was built from.
    pub config: Config,
    /// Cores, each with its threads and event queue.
    pub cores: Vec<Core>,
    /// Every live context.
    pub contexts: ContextTable,
    /// Current simulation cycle.
    pub cycle: Cycle,
    /// A state change requires a scheduling pass.
    pub schedule_signal: bool,
    /// Earliest allocation cycle among allocated, non-signaled contexts.
    pub min_alloc_cycle: Option<Cycle>,
    /// Stall-driven prefetcher.
    pub prefetcher: Prefetcher,
    /// Run statistics.
    pub stats: SchedStats,
}

impl Cpu {
    /// Builds the core/thread grid described by `config`.
    ///
    /// The configuration is assumed valid; see [`Config::validate`].
    pub fn new(config: &Config) -> Self {
        Self {
            cores: (0..config.general.cores)
                .map(|c| Core::new(c, config))
                .collect(),
            contexts: ContextTable::new(),
            cycle: 0,
            schedule_signal: false,
            min_alloc_cycle: None,
            prefetcher: Prefetcher::new(&config.prefetch),
            stats: SchedStats::default(),
            config: config.clone(),
        }
    }

    /// Hardware threads per core.
    #[inline]
    pub const fn threads_per_core(&self) -> usize {
        self.config.general.threads
    }

    /// All node coordinates, core-major.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.cores
            .iter()
            .flat_map(|c| c.threads.iter().map(|t| t.node))
            .collect()
    }

    /// Flattened index of `node`, the bit used in affinity sets.
    #[inline]
    pub const fn flat(&self, node: NodeId) -> usize {
        node.flat(self.threads_per_core())
    }

    /// Looks up a thread.
    pub fn thread(&self, node: NodeId) -> Result<&HardwareThread, SchedError> {
        self.cores
            .get(node.core)
            .and_then(|c| c.threads.get(node.thread))
            .ok_or(SchedError::UnknownNode(node))
    }

    /// Looks up a thread for mutation.
    pub fn thread_mut(&mut self, node: NodeId) -> Result<&mut HardwareThread, SchedError> {
        self.cores
            .get_mut(node.core)
            .and_then(|c| c.threads.get_mut(node.thread))
            .ok_or(SchedError::UnknownNode(node))
    }

    /// Looks up a core.
    pub fn core(&self, core: usize) -> Result<&Core, SchedError> {
        self.cores
            .get(core)
            .ok_or(SchedError::UnknownNode(NodeId::new(core, 0)))
    }

    /// Spawns a running context with the given affinity and entry point.
    pub fn spawn(&mut self, affinity: Affinity, ip: u64) -> ContextId {
        self.contexts.spawn(affinity, ArchSnapshot::at(ip))
    }

    /// Spawns a running context allowed on every node.
    pub fn spawn_anywhere(&mut self, ip: u64) -> ContextId {
        let nodes = self.cores.len() * self.threads_per_core();
        self.spawn(Affinity::all(nodes), ip)
    }

    /// Node `ctx` is allocated on, if any.
    pub fn allocated_node(&self, ctx: ContextId) -> Option<NodeId> {
        self.nodes()
            .into_iter()
            .find(|&n| self.thread(n).is_ok_and(|t| t.ctx == Some(ctx)))
    }
}
