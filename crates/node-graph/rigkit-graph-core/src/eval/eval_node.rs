//! Per-node evaluation logic for the rigkit dependency network.

use crate::error::GraphError;
use crate::eval::graph_runtime::GraphRuntime;
use crate::eval::variadic::compare_variadic_keys;
use crate::types::{InputConnection, NodeParams, NodeSpec, NodeType};
use hashbrown::HashMap;
use rigkit_api_core::{Value, WriteOp};

use super::numeric::{binary_numeric, distance, unary_numeric};
use super::variadic::fold_numeric_variadic;

type OutputMap = HashMap<String, Value>;

/// Build an output map for the default `out` port.
fn single_output(value: Value) -> OutputMap {
    let mut map = HashMap::with_capacity(1);
    map.insert("out".to_string(), value);
    map
}

/// Evaluate a single node, updating `rt` with new outputs and queued writes.
pub fn eval_node(rt: &mut GraphRuntime, spec: &NodeSpec) -> Result<(), GraphError> {
    let inputs = read_inputs(rt, &spec.inputs);
    let outputs = evaluate_kind(rt, spec, &inputs)?;

    // Only explicit sink nodes publish scene writes.
    if matches!(spec.kind, NodeType::Output) {
        let path = spec.params.path.clone().ok_or(GraphError::MissingParam {
            node: spec.id.clone(),
            kind: spec.kind.name(),
            param: "path",
        })?;
        if let Some(value) = outputs.get("out") {
            rt.writes.push(WriteOp::new(path, value.clone()));
        }
    }
    rt.outputs.insert(spec.id.clone(), outputs);
    Ok(())
}

fn evaluate_kind(
    rt: &GraphRuntime,
    spec: &NodeSpec,
    inputs: &HashMap<String, Value>,
) -> Result<OutputMap, GraphError> {
    let params = &spec.params;
    match &spec.kind {
        NodeType::Constant => Ok(eval_constant(params)),
        NodeType::Input => eval_input_node(rt, spec),
        NodeType::Output => Ok(single_output(input_or_default(inputs, "in"))),
        node_type @ (NodeType::Add
        | NodeType::Subtract
        | NodeType::Multiply
        | NodeType::Divide
        | NodeType::Max) => Ok(eval_arithmetic(node_type, inputs)),
        NodeType::Reverse => Ok(single_output(unary_numeric(
            &input_or_default(inputs, "in"),
            |x| 1.0 - x,
        ))),
        NodeType::DistanceBetween => {
            let a = input_or_default(inputs, "point1");
            let b = input_or_default(inputs, "point2");
            Ok(single_output(Value::Float(distance(&a, &b))))
        }
        NodeType::UnitConversion => {
            let factor = params.factor.ok_or(GraphError::MissingParam {
                node: spec.id.clone(),
                kind: spec.kind.name(),
                param: "factor",
            })?;
            Ok(single_output(unary_numeric(
                &input_or_default(inputs, "in"),
                |x| x * factor,
            )))
        }
    }
}

fn input_or_default(inputs: &HashMap<String, Value>, key: &str) -> Value {
    inputs.get(key).cloned().unwrap_or(Value::Float(0.0))
}

fn eval_constant(params: &NodeParams) -> OutputMap {
    single_output(params.value.clone().unwrap_or(Value::Float(0.0)))
}

/// Variadic inputs in stable key order.
fn ordered_values(inputs: &HashMap<String, Value>) -> Vec<Value> {
    let mut keys: Vec<&String> = inputs.keys().collect();
    keys.sort_by(|a, b| compare_variadic_keys(a, b));
    keys.into_iter()
        .filter_map(|k| inputs.get(k).cloned())
        .collect()
}

fn eval_arithmetic(kind: &NodeType, inputs: &HashMap<String, Value>) -> OutputMap {
    match kind {
        NodeType::Add => {
            let values = ordered_values(inputs);
            single_output(fold_numeric_variadic(
                &values,
                |x, y| x + y,
                Value::Float(0.0),
            ))
        }
        NodeType::Multiply => {
            let values = ordered_values(inputs);
            single_output(fold_numeric_variadic(
                &values,
                |x, y| x * y,
                Value::Float(1.0),
            ))
        }
        NodeType::Subtract => {
            let lhs = input_or_default(inputs, "lhs");
            let rhs = input_or_default(inputs, "rhs");
            single_output(binary_numeric(&lhs, &rhs, |x, y| x - y))
        }
        NodeType::Divide => {
            let lhs = input_or_default(inputs, "lhs");
            let rhs = input_or_default(inputs, "rhs");
            single_output(binary_numeric(&lhs, &rhs, |x, y| {
                if y != 0.0 {
                    x / y
                } else {
                    f64::NAN
                }
            }))
        }
        NodeType::Max => {
            let lhs = input_or_default(inputs, "lhs");
            let rhs = input_or_default(inputs, "rhs");
            single_output(binary_numeric(&lhs, &rhs, f64::max))
        }
        _ => unreachable!(),
    }
}

fn eval_input_node(rt: &GraphRuntime, spec: &NodeSpec) -> Result<OutputMap, GraphError> {
    let params = &spec.params;
    let path = params.path.as_ref().ok_or(GraphError::MissingParam {
        node: spec.id.clone(),
        kind: spec.kind.name(),
        param: "path",
    })?;

    if let Some(staged) = rt.get_input(path) {
        return Ok(single_output(staged.value.clone()));
    }
    if let Some(default_value) = params.value.clone() {
        return Ok(single_output(default_value));
    }
    Err(GraphError::MissingInput {
        node: spec.id.clone(),
        path: path.to_string(),
    })
}

/// Gather the most recent outputs for each of the node's input connections.
fn read_inputs(
    rt: &GraphRuntime,
    inputs: &HashMap<String, InputConnection>,
) -> HashMap<String, Value> {
    let mut resolved = HashMap::with_capacity(inputs.len());
    for (input_key, conn) in inputs.iter() {
        let value = rt
            .output(&conn.node_id, &conn.output_key)
            .cloned()
            .unwrap_or(Value::Float(0.0));
        resolved.insert(input_key.clone(), value);
    }
    resolved
}
