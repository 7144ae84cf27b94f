use std::collections::HashSet;

use smtsched_core::common::NodeId;
use smtsched_core::soc::PipelineProbe;

/// Pipeline probe whose busy nodes are set by the test.
#[derive(Debug, Default)]
pub struct StallProbe {
    busy: HashSet<NodeId>,
}

impl StallProbe {
    /// Reports `node` as holding in-flight work until released.
    pub fn stall(&mut self, node: NodeId) {
        let _ = self.busy.insert(node);
    }

    /// Reports `node` as drained again.
    pub fn release(&mut self, node: NodeId) {
        let _ = self.busy.remove(&node);
    }
}

impl PipelineProbe for StallProbe {
    fn is_drained(&self, node: NodeId) -> bool {
        !self.busy.contains(&node)
    }
}
