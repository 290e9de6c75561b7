use thiserror::Error;

use crate::types::NodeId;

/// Failures raised while ordering or evaluating a network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("cycle detected in graph")]
    Cycle,

    #[error("node '{node}' references unknown node '{missing}'")]
    DanglingConnection { node: NodeId, missing: NodeId },

    #[error("{kind} node '{node}' missing required '{param}' parameter")]
    MissingParam {
        node: NodeId,
        kind: &'static str,
        param: &'static str,
    },

    #[error("input node '{node}' has no staged value for '{path}'")]
    MissingInput { node: NodeId, path: String },
}
