//! Simulator: owns the scheduling CPU and its two collaborators side by side.
//!
//! Keeping the memory port and pipeline probe next to the `Cpu`, rather than
//! inside it, lets each tick lend them to the CPU without borrow juggling.

use tracing::trace;

use crate::common::SchedError;
use crate::config::{Config, ConfigError};
use crate::core::Cpu;
use crate::soc::{DrainedPipeline, MemoryPort, PipelineProbe, RequestLog};

/// Top-level simulator: scheduling state + memory port + pipeline probe.
#[derive(Debug)]
pub struct Simulator<M: MemoryPort = RequestLog, P: PipelineProbe = DrainedPipeline> {
    /// Scheduling state (cores, threads, contexts, stats).
    pub cpu: Cpu,
    /// Where prefetch requests go.
    pub memory: M,
    /// Pipeline occupancy oracle.
    pub probe: P,
}

impl Simulator {
    /// Creates a simulator with a recording memory port and no pipeline state
    /// outside the event queues.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_parts(config, RequestLog::new(), DrainedPipeline)
    }
}

impl<M: MemoryPort, P: PipelineProbe> Simulator<M, P> {
    /// Creates a simulator around the given collaborators.
    pub fn with_parts(config: &Config, memory: M, probe: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cpu: Cpu::new(config),
            memory,
            probe,
        })
    }

    /// Advances the simulator by one clock cycle.
    ///
    /// Order within a cycle: deferred evictions, the scheduling pass,
    /// predictor scans, prefetch decisions for every thread, retirement of
    /// completed ops, and finally the clock edge.
    pub fn tick(&mut self) -> Result<(), SchedError> {
        let _ = self.cpu.drain_evictions(&self.probe)?;
        let _ = self.cpu.schedule(&self.probe)?;
        let _ = self.cpu.scan_predictors();
        for node in self.cpu.nodes() {
            let _ = self
                .cpu
                .maybe_prefetch(node.core, node.thread, &mut self.memory)?;
        }
        for core in 0..self.cpu.cores.len() {
            let retired = self.cpu.retire_ready(core)?;
            if !retired.is_empty() {
                trace!(core, count = retired.len(), cycle = self.cpu.cycle, "ops retired");
            }
        }
        self.cpu.cycle += 1;
        self.cpu.stats.cycles += 1;
        Ok(())
    }

    /// Runs `cycles` ticks, stopping at the first invariant violation.
    pub fn run(&mut self, cycles: u64) -> Result<(), SchedError> {
        for _ in 0..cycles {
            self.tick()?;
        }
        Ok(())
    }
}
