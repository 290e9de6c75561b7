//! Mutable runtime state that persists across network evaluations.

use crate::types::NodeId;
use hashbrown::HashMap;
use rigkit_api_core::{AttrPath, Value, WriteBatch};

/// Scene value staged by the host for consumption by [`NodeType::Input`](crate::types::NodeType::Input).
#[derive(Debug, Clone)]
pub struct StagedInput {
    pub value: Value,
    pub epoch: u64,
}

/// Runtime data shared by all node evaluations.
#[derive(Debug, Default)]
pub struct GraphRuntime {
    pub outputs: HashMap<NodeId, HashMap<String, Value>>,
    pub writes: WriteBatch,
    pub staged_inputs: HashMap<AttrPath, StagedInput>,
    pub input_epoch: u64,
}

impl GraphRuntime {
    /// Advance the staging epoch. Values staged for `epoch + 1` become visible for the
    /// upcoming evaluation; older entries are dropped so stale scene data cannot leak through.
    pub fn advance_epoch(&mut self) {
        self.input_epoch = self.input_epoch.saturating_add(1);
        let current = self.input_epoch;
        self.staged_inputs.retain(|_, staged| staged.epoch == current);
    }

    /// Stage a scene value for the next evaluation epoch.
    pub fn set_input(&mut self, path: AttrPath, value: Value) -> Option<StagedInput> {
        let staged = StagedInput {
            value,
            epoch: self.input_epoch.saturating_add(1),
        };
        self.staged_inputs.insert(path, staged)
    }

    /// Fetch a staged input for the current evaluation epoch, if present.
    pub fn get_input(&self, path: &AttrPath) -> Option<&StagedInput> {
        self.staged_inputs
            .get(path)
            .filter(|staged| staged.epoch == self.input_epoch)
    }

    /// Output value of `node` on `port` from the latest evaluation.
    pub fn output(&self, node: &str, port: &str) -> Option<&Value> {
        self.outputs.get(node).and_then(|ports| ports.get(port))
    }
}
