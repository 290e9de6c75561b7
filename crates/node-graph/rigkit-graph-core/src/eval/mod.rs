//! Evaluation pipeline for the rigkit dependency network.
//!
//! The `eval` module turns a [`GraphSpec`](crate::types::GraphSpec) into concrete values by
//! walking the network in topological order:
//!
//! - [`graph_runtime`] tracks node outputs, staged scene inputs and queued writes.
//! - [`numeric`] and [`variadic`] provide shared math helpers.
//! - [`eval_node`] houses the dispatch logic for individual [`NodeType`](crate::types::NodeType)s.
//!
//! Hosts stage the scene attributes read by `Input` nodes, call [`evaluate_all`], then apply the
//! resulting [`WriteBatch`] to the scene.

use crate::error::GraphError;
use crate::types::GraphSpec;
use rigkit_api_core::WriteBatch;

pub mod eval_node;
mod graph_runtime;
mod numeric;
mod variadic;

pub use eval_node::eval_node;
pub use graph_runtime::{GraphRuntime, StagedInput};

#[cfg(test)]
mod tests;

/// Evaluate every node in `spec`, updating `rt` in-place.
///
/// Outputs and writes are cleared before evaluation and repopulated as nodes are visited in
/// topological order. Any error propagated from an individual node halts evaluation.
pub fn evaluate_all(rt: &mut GraphRuntime, spec: &GraphSpec) -> Result<(), GraphError> {
    rt.advance_epoch();
    rt.outputs.clear();
    rt.writes = WriteBatch::new();

    let order = crate::topo::topo_order(&spec.nodes)?;
    for id in order {
        if let Some(node) = spec.node(&id) {
            eval_node::eval_node(rt, node)?;
        }
    }
    Ok(())
}
