//! Translation of scene connections into a dependency network, and the settle loop that
//! alternates network evaluation with constraint and IK solves.

use hashbrown::HashSet;
use log::{debug, warn};
use rigkit_api_core::{coercion, AttrPath, Value};
use rigkit_graph_core::{evaluate_all, GraphSpec, NodeSpec, NodeType};
use serde::{Deserialize, Serialize};

use crate::attrs::{CONVERSION_FACTOR, UTILITY_OUTPUT};
use crate::error::SceneError;
use crate::node::NodeKind;
use crate::scene::Scene;

/// Outcome of [`Scene::evaluate_impl`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub passes: usize,
    pub settled: bool,
    /// Largest change observed in the final pass.
    pub residual: f64,
}

fn is_finite(value: &Value) -> bool {
    match value {
        Value::Float(v) => v.is_finite(),
        Value::Vec3(v) => v.iter().all(|c| c.is_finite()),
        _ => true,
    }
}

fn output_id(dst: &AttrPath) -> String {
    format!(">{dst}")
}

impl Scene {
    fn utility_kind(&self, name: &str) -> Option<NodeType> {
        match self.nodes.get(name)?.kind {
            NodeKind::Utility(kind) => Some(kind),
            _ => None,
        }
    }

    /// Build the network for the current connections.
    ///
    /// Utility nodes keep their scene names as ids. Scene attributes read by the network become
    /// `Input` nodes keyed by their path, and scene attributes written by it become `Output` nodes
    /// keyed `>{path}`. Unconnected utility ports read their own static value.
    pub(crate) fn build_network(&self) -> Result<GraphSpec, SceneError> {
        let mut spec = GraphSpec::default();
        let mut inputs: HashSet<String> = HashSet::new();
        let mut add_input = |spec: &mut GraphSpec, path: &AttrPath| -> String {
            let id = path.to_string();
            if inputs.insert(id.clone()) {
                spec.nodes
                    .push(NodeSpec::new(id.clone(), NodeType::Input).with_path(path.clone()));
            }
            id
        };

        for (name, node) in &self.nodes {
            let NodeKind::Utility(kind) = node.kind else {
                continue;
            };
            let mut utility = NodeSpec::new(name.clone(), kind);
            for (port, extra) in &node.extra {
                if kind == NodeType::UnitConversion && port == CONVERSION_FACTOR {
                    utility.params.factor = Some(coercion::to_float(&extra.value));
                    continue;
                }
                let dst = AttrPath::attr(name, port)?;
                let source = match self.connections.get(&dst) {
                    Some(src) if self.utility_kind(&src.node_name()).is_some() => src.node_name(),
                    Some(src) => add_input(&mut spec, src),
                    None => add_input(&mut spec, &dst),
                };
                utility = utility.with_input(port, source);
            }
            spec.nodes.push(utility);
        }

        for (dst, src) in &self.connections {
            let dst_node = dst.node_name();
            match self.nodes.get(&dst_node).map(|n| n.kind) {
                Some(NodeKind::Utility(_)) | Some(NodeKind::Constraint(_)) | None => continue,
                Some(_) => {}
            }
            let source = if self.utility_kind(&src.node_name()).is_some() {
                if src.attribute() != UTILITY_OUTPUT {
                    continue;
                }
                src.node_name()
            } else {
                add_input(&mut spec, src)
            };
            spec.nodes.push(
                NodeSpec::new(output_id(dst), NodeType::Output)
                    .with_path(dst.clone())
                    .with_input("in", source),
            );
        }
        debug!("rebuilt dependency network ({} nodes)", spec.nodes.len());
        Ok(spec)
    }

    /// Stage inputs, evaluate the network and apply its writes; returns the largest change.
    pub(crate) fn run_network(&mut self) -> Result<f64, SceneError> {
        let spec = match self.network.take() {
            Some(spec) => spec,
            None => self.build_network()?,
        };
        for node in &spec.nodes {
            let (NodeType::Input, Some(path)) = (node.kind, node.params.path.as_ref()) else {
                continue;
            };
            let value = self.get_attr_impl(path).unwrap_or_else(|err| {
                warn!("network input {path} unreadable: {err}");
                Value::Float(0.0)
            });
            self.runtime.set_input(path.clone(), value);
        }
        let evaluated = evaluate_all(&mut self.runtime, &spec);
        self.network = Some(spec);
        evaluated?;

        let writes = std::mem::take(&mut self.runtime.writes);
        let mut delta: f64 = 0.0;
        for op in writes.into_vec() {
            if !is_finite(&op.value) {
                warn!("skipping non-finite write to {}", op.path);
                continue;
            }
            delta = delta.max(self.write_attr(&op.path, op.value)?);
        }
        Ok(delta)
    }

    /// Run network, constraints and IK until nothing moves or the pass budget runs out.
    pub(crate) fn evaluate_impl(&mut self) -> Result<EvalReport, SceneError> {
        let max_passes = self.config.max_passes.max(1);
        let mut residual = 0.0;
        for pass in 1..=max_passes {
            let mut delta = self.run_network()?;
            delta = delta.max(self.solve_constraints()?);
            delta = delta.max(self.solve_ik_handles()?);
            residual = delta;
            if delta <= self.config.tolerance {
                return Ok(EvalReport {
                    passes: pass,
                    settled: true,
                    residual,
                });
            }
        }
        warn!("scene did not settle after {max_passes} passes (residual {residual:e})");
        Ok(EvalReport {
            passes: max_passes,
            settled: false,
            residual,
        })
    }
}
