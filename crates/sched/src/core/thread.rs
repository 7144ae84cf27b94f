//! Hardware thread (node) state and the core that groups them.

use crate::common::{ContextId, Cycle, NodeId};
use crate::config::Config;
use crate::core::pipeline::EventQueue;
use crate::core::units::ctxbuf::InactiveContextBuffer;
use crate::core::units::llp::LongLatencyPredictor;
use crate::core::units::prefetch::MemoryPatternLogger;

/// One SMT slot.
#[derive(Debug)]
pub struct HardwareThread {
    /// Coordinates of this slot.
    pub node: NodeId,
    /// Display name, `c{core}t{thread}`.
    pub name: String,
    /// Context occupying the pipeline.
    pub ctx: Option<ContextId>,
    /// Contexts mapped here, in mapping order.
    pub mapped: Vec<ContextId>,
    /// Evicted-but-mapped contexts awaiting re-admission.
    pub buffer: InactiveContextBuffer,
    /// Recent memory behavior of this thread.
    pub logger: MemoryPatternLogger,
    /// Long-latency recurrence table.
    pub predictor: LongLatencyPredictor,
    /// Next fetch address of the allocated context.
    pub fetch_ip: u64,
    /// Cycle of the last allocation on this slot.
    pub last_sched_cycle: Cycle,
    /// Timestamp of the prediction that last triggered a prefetch burst
    /// targeting this thread.
    pub last_prefetch: Option<Cycle>,
}

impl HardwareThread {
    /// Creates an idle thread.
    pub fn new(node: NodeId, config: &Config) -> Self {
        Self {
            node,
            name: node.to_string(),
            ctx: None,
            mapped: Vec::new(),
            buffer: InactiveContextBuffer::new(node, &config.scheduler),
            logger: MemoryPatternLogger::new(&config.logger),
            predictor: LongLatencyPredictor::new(&config.predictor),
            fetch_ip: 0,
            last_sched_cycle: 0,
            last_prefetch: None,
        }
    }

    /// Returns true if `ctx` is in the mapped list.
    pub fn is_mapped(&self, ctx: ContextId) -> bool {
        self.mapped.contains(&ctx)
    }
}

/// One core: its threads plus the event queue they share.
#[derive(Debug)]
pub struct Core {
    /// Core index.
    pub id: usize,
    /// SMT slots.
    pub threads: Vec<HardwareThread>,
    /// In-flight micro-ops of every thread on this core.
    pub event_queue: EventQueue,
}

impl Core {
    /// Creates a core with `config.general.threads` idle threads.
    pub fn new(id: usize, config: &Config) -> Self {
        Self {
            id,
            threads: (0..config.general.threads)
                .map(|t| HardwareThread::new(NodeId::new(id, t), config))
                .collect(),
            event_queue: EventQueue::new(),
        }
    }
}
