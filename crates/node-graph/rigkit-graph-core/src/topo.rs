use crate::error::GraphError;
use crate::types::*;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Kahn ordering of `nodes`. Ties are broken by declaration order so repeated
/// evaluations of the same network visit nodes identically.
pub fn topo_order(nodes: &[NodeSpec]) -> Result<Vec<NodeId>, GraphError> {
    let mut indeg: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();

    for n in nodes {
        indeg.entry(n.id.as_str()).or_insert(0);
    }
    for n in nodes {
        for conn in n.inputs.values() {
            if !indeg.contains_key(conn.node_id.as_str()) {
                return Err(GraphError::DanglingConnection {
                    node: n.id.clone(),
                    missing: conn.node_id.clone(),
                });
            }
            adj.entry(conn.node_id.as_str()).or_default().push(n.id.as_str());
            *indeg.entry(n.id.as_str()).or_default() += 1;
        }
    }

    let mut q: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| indeg.get(id).copied() == Some(0))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(u) = q.pop_front() {
        order.push(u.to_string());
        if let Some(vs) = adj.get(u) {
            for v in vs {
                if let Some(d) = indeg.get_mut(v) {
                    *d -= 1;
                    if *d == 0 {
                        q.push_back(*v);
                    }
                }
            }
        }
    }

    if order.len() != indeg.len() {
        return Err(GraphError::Cycle);
    }
    Ok(order)
}
