//! Configuration Tests.
//!
//! Verifies defaults, JSON deserialization with partial documents and
//! aliases, and validation of values the scheduler cannot be built with.

use pretty_assertions::assert_eq;
use smtsched_core::config::{Config, ConfigError, RankingPolicyKind};

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

/// The default configuration is valid and matches the documented baseline.
#[test]
fn defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.nodes(), 2);
    assert_eq!(config.scheduler.quantum, 100_000);
    assert_eq!(config.scheduler.buffer_capacity, 4);
    assert_eq!(config.predictor.long_latency_threshold, 20);
    assert_eq!(config.predictor.miss_threshold, 5);
    assert_eq!(config.logger.block_size(), 64);
    assert!(config.prefetch.enabled);
}

// ══════════════════════════════════════════════════════════
// 2. JSON
// ══════════════════════════════════════════════════════════

/// An empty document yields the defaults.
#[test]
fn empty_document_is_default() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.general.threads, 2);
    assert_eq!(config.scheduler.ranking, RankingPolicyKind::MostRecentlyEvicted);
}

/// Short policy aliases are accepted.
#[test]
fn ranking_aliases() {
    let rr = Config::from_json(r#"{ "scheduler": { "ranking": "RR" } }"#).unwrap();
    assert_eq!(rr.scheduler.ranking, RankingPolicyKind::RoundRobin);
    let mru = Config::from_json(r#"{ "scheduler": { "ranking": "MRU" } }"#).unwrap();
    assert_eq!(mru.scheduler.ranking, RankingPolicyKind::MostRecentlyEvicted);
}

/// An unknown policy name is a parse error.
#[test]
fn unknown_ranking_is_parse_error() {
    let err = Config::from_json(r#"{ "scheduler": { "ranking": "Lottery" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ══════════════════════════════════════════════════════════
// 3. Validation
// ══════════════════════════════════════════════════════════

/// A zero-capacity buffer is rejected with the offending field named.
#[test]
fn zero_capacity_is_rejected() {
    let err = Config::from_json(r#"{ "scheduler": { "buffer_capacity": 0 } }"#).unwrap_err();
    match err {
        ConfigError::Invalid { field, .. } => assert_eq!(field, "scheduler.buffer_capacity"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Phase classification needs four intervals of history.
#[test]
fn short_history_is_rejected() {
    let err = Config::from_json(r#"{ "predictor": { "history_len": 3 } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "predictor.history_len",
            ..
        }
    ));
}

/// A block shift that would overflow the block mask is rejected before any
/// structure is built.
#[test]
fn oversized_block_shift_is_rejected() {
    let err = Config::from_json(r#"{ "logger": { "block_shift": 64 } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "logger.block_shift",
            ..
        }
    ));
    assert!(Config::from_json(r#"{ "logger": { "block_shift": 63 } }"#).is_ok());
}
