//! Configuration system for the scheduling core.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the scheduler and its predictors. It provides:
//! 1. **Defaults:** Baseline constants (grid size, quantum, buffer capacity, thresholds).
//! 2. **Structures:** Hierarchical config for general, scheduler, predictor, logger, and prefetch.
//! 3. **Enums:** Ranking policy selection for the inactive-context buffer.
//! 4. **Validation:** Rejection of configurations the structures cannot be built from.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`.

use serde::Deserialize;
use thiserror::Error;

/// Default configuration constants.
///
/// These values define the baseline configuration when a field is not
/// explicitly present in the JSON document.
mod defaults {
    /// Number of cores in the simulated processor.
    pub const CORES: usize = 1;

    /// Hardware threads (SMT slots) per core.
    pub const THREADS: usize = 2;

    /// Cycles a context may stay allocated before eviction is considered.
    pub const QUANTUM: u64 = 100_000;

    /// Slots in each thread's inactive-context buffer.
    pub const BUFFER_CAPACITY: usize = 4;

    /// Idle cycles after which a buffered context is forced to run next.
    pub const STARVATION_THRESHOLD: u64 = 1_000_000;

    /// Pattern entries per thread in the long-latency predictor.
    pub const PREDICTOR_ENTRIES: usize = 64;

    /// Closed intervals remembered per predictor entry.
    pub const PREDICTOR_HISTORY: usize = 8;

    /// Cycles a memory op must be outstanding to count as a long-latency event.
    pub const LONG_LATENCY_THRESHOLD: u64 = 20;

    /// Cycles a load must be outstanding to count as a cache miss.
    pub const MISS_THRESHOLD: u64 = 5;

    /// Sum of absolute interval deltas under which a pattern is stable.
    pub const STABLE_THRESHOLD: u64 = 16;

    /// Distance from the predicted event within which a prediction is confirmed.
    pub const CONFIRM_TOLERANCE: u64 = 8;

    /// Saturation point of the prediction confidence counter.
    pub const MAX_CONFIDENCE: u8 = 3;

    /// Address buckets per thread in the memory pattern logger.
    pub const BUCKETS: usize = 64;

    /// Addresses kept per bucket before stride detection runs.
    pub const RING_LENGTH: usize = 256;

    /// log2 of the block size (64-byte blocks).
    pub const BLOCK_SHIFT: u32 = 6;

    /// Ways in each MRU tag set.
    pub const ASSOCIATIVITY: usize = 4;

    /// Minimum number of equal consecutive deltas that make a stride.
    pub const MIN_STRIDE_RUN: usize = 3;

    /// Cycles ahead of a predicted stall within which prefetching starts.
    pub const PREFETCH_LEAD: u64 = 64;

    /// Upper bound on block reads issued for a single stride entry.
    pub const MAX_BLOCKS_PER_STRIDE: usize = 256;
}

/// Ranking policy of the inactive-context buffer.
///
/// Exactly one policy is active at a time. It decides which buffered
/// context is re-admitted when no context is starving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RankingPolicyKind {
    /// Pick the entry with the latest eviction cycle.
    #[default]
    #[serde(alias = "Mru", alias = "MRU")]
    MostRecentlyEvicted,
    /// Pick the entry with the largest weight drawn from a cycle-seeded generator.
    Random,
    /// Pick the entry after the outgoing one, cyclically.
    #[serde(alias = "RR")]
    RoundRobin,
}

/// Root configuration structure containing all scheduler settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use smtsched_core::config::{Config, RankingPolicyKind};
///
/// let config = Config::default();
/// assert_eq!(config.general.threads, 2);
/// assert_eq!(config.scheduler.ranking, RankingPolicyKind::MostRecentlyEvicted);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use smtsched_core::config::{Config, RankingPolicyKind};
///
/// let json = r#"{
///     "general": { "cores": 2, "threads": 4 },
///     "scheduler": {
///         "quantum": 5000,
///         "buffer_capacity": 3,
///         "starvation_threshold": 40000,
///         "ranking": "RoundRobin"
///     },
///     "logger": { "ring_length": 32 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.cores, 2);
/// assert_eq!(config.scheduler.ranking, RankingPolicyKind::RoundRobin);
/// assert_eq!(config.logger.ring_length, 32);
/// assert_eq!(config.logger.associativity, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Processor grid
    #[serde(default)]
    pub general: GeneralConfig,
    /// Context scheduling and inactive-context buffer
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Long-latency event predictor
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Memory pattern logger
    #[serde(default)]
    pub logger: LoggerConfig,
    /// Stall-driven prefetcher
    #[serde(default)]
    pub prefetch: PrefetchConfig,
}

/// Configuration rejected by [`Config::from_json`] or [`Config::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the scheduler cannot be built with.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value is rejected.
        reason: &'static str,
    },
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every structure can be built from this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.general.cores == 0, "general.cores", "must be at least 1"),
            (self.general.threads == 0, "general.threads", "must be at least 1"),
            (
                self.scheduler.buffer_capacity == 0,
                "scheduler.buffer_capacity",
                "must be at least 1",
            ),
            (
                self.predictor.history_len < 4,
                "predictor.history_len",
                "phase classification needs at least 4 intervals",
            ),
            (self.logger.buckets == 0, "logger.buckets", "must be at least 1"),
            (
                self.logger.ring_length < 2,
                "logger.ring_length",
                "stride detection needs at least 2 addresses",
            ),
            (
                self.logger.block_shift >= 64,
                "logger.block_shift",
                "must be below 64",
            ),
            (
                self.logger.associativity == 0,
                "logger.associativity",
                "must be at least 1",
            ),
        ];
        match checks.into_iter().find(|(bad, _, _)| *bad) {
            Some((_, field, reason)) => Err(ConfigError::Invalid { field, reason }),
            None => Ok(()),
        }
    }

    /// Total number of hardware threads (nodes).
    #[inline]
    pub const fn nodes(&self) -> usize {
        self.general.cores * self.general.threads
    }
}

/// Processor grid: how many cores and hardware threads exist.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Number of cores
    #[serde(default = "GeneralConfig::default_cores")]
    pub cores: usize,

    /// Hardware threads per core
    #[serde(default = "GeneralConfig::default_threads")]
    pub threads: usize,
}

impl GeneralConfig {
    /// Returns the default core count.
    const fn default_cores() -> usize {
        defaults::CORES
    }

    /// Returns the default threads-per-core count.
    const fn default_threads() -> usize {
        defaults::THREADS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES,
            threads: defaults::THREADS,
        }
    }
}

/// Context scheduling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Cycles a context may stay allocated before eviction is considered
    #[serde(default = "SchedulerConfig::default_quantum")]
    pub quantum: u64,

    /// Slots in every thread's inactive-context buffer
    #[serde(default = "SchedulerConfig::default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Idle cycles after which a buffered context overrides the ranking policy
    #[serde(default = "SchedulerConfig::default_starvation_threshold")]
    pub starvation_threshold: u64,

    /// Active ranking policy
    #[serde(default)]
    pub ranking: RankingPolicyKind,
}

impl SchedulerConfig {
    /// Returns the default quantum in cycles.
    const fn default_quantum() -> u64 {
        defaults::QUANTUM
    }

    /// Returns the default inactive-context buffer capacity.
    const fn default_buffer_capacity() -> usize {
        defaults::BUFFER_CAPACITY
    }

    /// Returns the default starvation threshold in cycles.
    const fn default_starvation_threshold() -> u64 {
        defaults::STARVATION_THRESHOLD
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: defaults::QUANTUM,
            buffer_capacity: defaults::BUFFER_CAPACITY,
            starvation_threshold: defaults::STARVATION_THRESHOLD,
            ranking: RankingPolicyKind::default(),
        }
    }
}

/// Long-latency predictor parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Pattern entries per thread
    #[serde(default = "PredictorConfig::default_table_size")]
    pub table_size: usize,

    /// Closed intervals remembered per entry
    #[serde(default = "PredictorConfig::default_history_len")]
    pub history_len: usize,

    /// Cycles outstanding before a memory op is a long-latency event
    #[serde(default = "PredictorConfig::default_long_latency_threshold")]
    pub long_latency_threshold: u64,

    /// Cycles outstanding before a load counts as a cache miss
    #[serde(default = "PredictorConfig::default_miss_threshold")]
    pub miss_threshold: u64,

    /// Stable-phase bound on the sum of absolute interval deltas
    #[serde(default = "PredictorConfig::default_stable_threshold")]
    pub stable_threshold: u64,

    /// Distance from the predicted cycle that still confirms a prediction
    #[serde(default = "PredictorConfig::default_tolerance")]
    pub tolerance: u64,

    /// Saturation point of the confidence counter
    #[serde(default = "PredictorConfig::default_max_confidence")]
    pub max_confidence: u8,
}

impl PredictorConfig {
    /// Returns the default table size.
    const fn default_table_size() -> usize {
        defaults::PREDICTOR_ENTRIES
    }

    /// Returns the default history depth.
    const fn default_history_len() -> usize {
        defaults::PREDICTOR_HISTORY
    }

    /// Returns the default long-latency threshold.
    const fn default_long_latency_threshold() -> u64 {
        defaults::LONG_LATENCY_THRESHOLD
    }

    /// Returns the default miss threshold.
    const fn default_miss_threshold() -> u64 {
        defaults::MISS_THRESHOLD
    }

    /// Returns the default stable-phase threshold.
    const fn default_stable_threshold() -> u64 {
        defaults::STABLE_THRESHOLD
    }

    /// Returns the default confirmation tolerance.
    const fn default_tolerance() -> u64 {
        defaults::CONFIRM_TOLERANCE
    }

    /// Returns the default confidence saturation point.
    const fn default_max_confidence() -> u8 {
        defaults::MAX_CONFIDENCE
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            table_size: defaults::PREDICTOR_ENTRIES,
            history_len: defaults::PREDICTOR_HISTORY,
            long_latency_threshold: defaults::LONG_LATENCY_THRESHOLD,
            miss_threshold: defaults::MISS_THRESHOLD,
            stable_threshold: defaults::STABLE_THRESHOLD,
            tolerance: defaults::CONFIRM_TOLERANCE,
            max_confidence: defaults::MAX_CONFIDENCE,
        }
    }
}

/// Memory pattern logger geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Address buckets per thread
    #[serde(default = "LoggerConfig::default_buckets")]
    pub buckets: usize,

    /// Addresses recorded per bucket before stride detection
    #[serde(default = "LoggerConfig::default_ring_length")]
    pub ring_length: usize,

    /// log2 of the block size
    #[serde(default = "LoggerConfig::default_block_shift")]
    pub block_shift: u32,

    /// Ways per MRU tag set
    #[serde(default = "LoggerConfig::default_associativity")]
    pub associativity: usize,

    /// Equal consecutive deltas needed to record a stride
    #[serde(default = "LoggerConfig::default_min_stride_run")]
    pub min_stride_run: usize,
}

impl LoggerConfig {
    /// Returns the default bucket count.
    const fn default_buckets() -> usize {
        defaults::BUCKETS
    }

    /// Returns the default ring length.
    const fn default_ring_length() -> usize {
        defaults::RING_LENGTH
    }

    /// Returns the default block shift.
    const fn default_block_shift() -> u32 {
        defaults::BLOCK_SHIFT
    }

    /// Returns the default associativity.
    const fn default_associativity() -> usize {
        defaults::ASSOCIATIVITY
    }

    /// Returns the default minimum stride run.
    const fn default_min_stride_run() -> usize {
        defaults::MIN_STRIDE_RUN
    }

    /// Block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> u64 {
        1 << self.block_shift
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            buckets: defaults::BUCKETS,
            ring_length: defaults::RING_LENGTH,
            block_shift: defaults::BLOCK_SHIFT,
            associativity: defaults::ASSOCIATIVITY,
            min_stride_run: defaults::MIN_STRIDE_RUN,
        }
    }
}

/// Stall-driven prefetch parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchConfig {
    /// Issue prefetches when a sibling stall is predicted
    #[serde(default = "PrefetchConfig::default_enabled")]
    pub enabled: bool,

    /// Cycles before the predicted stall within which prefetching starts
    #[serde(default = "PrefetchConfig::default_lead")]
    pub lead_cycles: u64,

    /// Cap on block reads issued for one stride entry
    #[serde(default = "PrefetchConfig::default_max_blocks")]
    pub max_blocks_per_stride: usize,
}

impl PrefetchConfig {
    /// Prefetching is on unless disabled.
    const fn default_enabled() -> bool {
        true
    }

    /// Returns the default lead window.
    const fn default_lead() -> u64 {
        defaults::PREFETCH_LEAD
    }

    /// Returns the default per-stride block cap.
    const fn default_max_blocks() -> usize {
        defaults::MAX_BLOCKS_PER_STRIDE
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_cycles: defaults::PREFETCH_LEAD,
            max_blocks_per_stride: defaults::MAX_BLOCKS_PER_STRIDE,
        }
    }
}
