//! Simulator Tests.
//!
//! Verifies construction and validation, the per-cycle tick order as seen
//! from the statistics, prefetch requests reaching the memory port, and the
//! statistics report.

use smtsched_core::Simulator;
use smtsched_core::common::{AccessKind, NodeId};
use smtsched_core::config::Config;
use smtsched_core::soc::RequestLog;

use crate::common::builder::ConfigBuilder;
use crate::common::harness::init_tracing;

/// A simulator built from JSON advances one cycle per tick.
#[test]
fn runs_from_json_config() {
    init_tracing();
    let config = Config::from_json(r#"{ "general": { "cores": 2, "threads": 2 } }"#).unwrap();
    let mut sim = Simulator::new(&config).unwrap();
    let id = sim.cpu.spawn_anywhere(0x8000_0000);
    sim.run(3).unwrap();
    assert_eq!(sim.cpu.cycle, 3);
    assert_eq!(sim.cpu.stats.cycles, 3);
    assert_eq!(sim.cpu.stats.schedule_passes, 1);
    assert_eq!(sim.cpu.stats.skipped_passes, 2);
    assert_eq!(sim.cpu.allocated_node(id), Some(NodeId::new(0, 0)));
}

/// Invalid configurations never produce a simulator.
#[test]
fn invalid_config_is_rejected() {
    let mut config = Config::default();
    config.general.threads = 0;
    assert!(Simulator::new(&config).is_err());
}

/// Any `Fn(NodeId) -> bool` works as a pipeline probe.
#[test]
fn closure_probe() {
    let config = ConfigBuilder::new().grid(1, 1).capacity(2).quantum(5).build();
    let mut sim = Simulator::with_parts(&config, RequestLog::new(), |_: NodeId| false).unwrap();
    let _ = sim.cpu.spawn_anywhere(0);
    let _ = sim.cpu.spawn_anywhere(0);
    sim.run(20).unwrap();
    // The pipeline never drains, so the first eviction never completes.
    assert_eq!(sim.cpu.stats.evict_signals, 1);
    assert_eq!(sim.cpu.stats.evictions_deferred, 0);
    assert_eq!(sim.cpu.stats.allocations, 1);
}

/// A predicted sibling stall sends one burst to the memory port.
#[test]
fn prefetch_reaches_memory_port() {
    init_tracing();
    let config = ConfigBuilder::new().grid(1, 2).logger(1, 4).build();
    let mut sim = Simulator::new(&config).unwrap();
    let target = NodeId::new(0, 1);
    for addr in [0, 64, 128, 192] {
        let _ = sim.cpu.record_access(target, addr, false).unwrap();
    }
    let _ = sim.cpu.record_access(target, 0x4000, true).unwrap();
    let t = sim.cpu.thread_mut(target).unwrap();
    for c in [0, 100, 200, 300, 400] {
        let _ = t.predictor.long_latency_event(0x40, c, c);
    }

    sim.cpu.cycle = 420;
    sim.run(40).unwrap();
    assert_eq!(sim.memory.len(), 8);
    assert_eq!(sim.memory.count(AccessKind::Fetch), 1);
    assert_eq!(sim.cpu.stats.prefetch_triggers, 1);
}

/// The report carries its header and the cycle count.
#[test]
fn stats_report() {
    let mut sim = Simulator::new(&Config::default()).unwrap();
    sim.run(5).unwrap();
    let report = sim.cpu.stats.to_string();
    assert!(report.contains("SMT SCHEDULER STATISTICS"));
    assert!(report.contains("sim_cycles"));
    assert_eq!(sim.cpu.stats.cycles, 5);
}
