use super::*;
use crate::types::{GraphSpec, NodeSpec, NodeType};
use rigkit_api_core::{coercion, AttrPath, Value};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn path(s: &str) -> AttrPath {
    AttrPath::parse(s).expect("valid path")
}

fn constant(id: &str, v: f64) -> NodeSpec {
    NodeSpec::new(id, NodeType::Constant).with_value(Value::Float(v))
}

fn out_of(rt: &GraphRuntime, id: &str) -> Value {
    rt.output(id, "out").cloned().expect("node output")
}

fn float_of(rt: &GraphRuntime, id: &str) -> f64 {
    coercion::to_float(&out_of(rt, id))
}

#[test]
fn stretch_ratio_network_writes_child_offset() {
    // distance / originalLength, clamped by max(ratio, 1), times the child's rest offset.
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("root", NodeType::Input).with_path(path("m:rootLoc.worldPosition")),
            NodeSpec::new("end", NodeType::Input).with_path(path("m:endLoc.worldPosition")),
            NodeSpec::new("dist", NodeType::DistanceBetween)
                .with_input("point1", "root")
                .with_input("point2", "end"),
            constant("len", 4.0),
            NodeSpec::new("ratio", NodeType::Divide)
                .with_input("lhs", "dist")
                .with_input("rhs", "len"),
            constant("one", 1.0),
            NodeSpec::new("clamp", NodeType::Max)
                .with_input("lhs", "ratio")
                .with_input("rhs", "one"),
            constant("offset", 4.0),
            NodeSpec::new("scaled", NodeType::Multiply)
                .with_input("in_0", "clamp")
                .with_input("in_1", "offset"),
            NodeSpec::new("write", NodeType::Output)
                .with_input("in", "scaled")
                .with_path(path("m:end_joint.translateX")),
        ],
    };

    let mut rt = GraphRuntime::default();
    rt.set_input(path("m:rootLoc.worldPosition"), Value::vec3(0.0, 0.0, 0.0));
    rt.set_input(path("m:endLoc.worldPosition"), Value::vec3(6.0, 0.0, 0.0));
    evaluate_all(&mut rt, &spec).expect("evaluate");

    let writes: Vec<_> = rt.writes.iter().collect();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path.to_string(), "m:end_joint.translateX");
    assert!(approx(coercion::to_float(&writes[0].value), 6.0));

    // Compressed: the Max node keeps the chain at rest length.
    rt.set_input(path("m:rootLoc.worldPosition"), Value::vec3(0.0, 0.0, 0.0));
    rt.set_input(path("m:endLoc.worldPosition"), Value::vec3(2.0, 0.0, 0.0));
    evaluate_all(&mut rt, &spec).expect("evaluate");
    assert!(approx(float_of(&rt, "scaled"), 4.0));
}

#[test]
fn staged_inputs_expire_after_one_evaluation() {
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("in", NodeType::Input)
            .with_path(path("m:ctrl.translateX"))
            .with_value(Value::Float(-1.0))],
    };
    let mut rt = GraphRuntime::default();
    rt.set_input(path("m:ctrl.translateX"), Value::Float(3.0));
    evaluate_all(&mut rt, &spec).unwrap();
    assert!(approx(float_of(&rt, "in"), 3.0));

    evaluate_all(&mut rt, &spec).unwrap();
    assert!(approx(float_of(&rt, "in"), -1.0));
}

#[test]
fn unstaged_input_without_default_is_an_error() {
    let spec = GraphSpec {
        nodes: vec![NodeSpec::new("in", NodeType::Input).with_path(path("m:ctrl.translateX"))],
    };
    let mut rt = GraphRuntime::default();
    let err = evaluate_all(&mut rt, &spec).unwrap_err();
    assert!(matches!(err, GraphError::MissingInput { .. }));
}

#[test]
fn scalars_broadcast_over_vectors() {
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new("v", NodeType::Constant).with_value(Value::vec3(1.0, 2.0, 3.0)),
            constant("s", 2.0),
            NodeSpec::new("mul", NodeType::Multiply)
                .with_input("in_0", "v")
                .with_input("in_1", "s"),
            NodeSpec::new("sub", NodeType::Subtract)
                .with_input("lhs", "mul")
                .with_input("rhs", "s"),
        ],
    };
    let mut rt = GraphRuntime::default();
    evaluate_all(&mut rt, &spec).unwrap();
    assert_eq!(out_of(&rt, "mul"), Value::vec3(2.0, 4.0, 6.0));
    assert_eq!(out_of(&rt, "sub"), Value::vec3(0.0, 2.0, 4.0));
}

#[test]
fn reverse_and_unit_conversion() {
    let mut convert = NodeSpec::new("conv", NodeType::UnitConversion).with_input("in", "w");
    convert.params.factor = Some(std::f64::consts::PI / 180.0);
    let spec = GraphSpec {
        nodes: vec![
            constant("w", 0.25),
            NodeSpec::new("rev", NodeType::Reverse).with_input("in", "w"),
            convert,
        ],
    };
    let mut rt = GraphRuntime::default();
    evaluate_all(&mut rt, &spec).unwrap();
    assert!(approx(float_of(&rt, "rev"), 0.75));
    assert!(approx(
        float_of(&rt, "conv"),
        0.25 * std::f64::consts::PI / 180.0
    ));
}

#[test]
fn unit_conversion_requires_factor() {
    let spec = GraphSpec {
        nodes: vec![
            constant("w", 1.0),
            NodeSpec::new("conv", NodeType::UnitConversion).with_input("in", "w"),
        ],
    };
    let mut rt = GraphRuntime::default();
    assert!(matches!(
        evaluate_all(&mut rt, &spec),
        Err(GraphError::MissingParam { param: "factor", .. })
    ));
}

#[test]
fn divide_by_zero_yields_nan() {
    let spec = GraphSpec {
        nodes: vec![
            constant("a", 1.0),
            constant("z", 0.0),
            NodeSpec::new("div", NodeType::Divide)
                .with_input("lhs", "a")
                .with_input("rhs", "z"),
        ],
    };
    let mut rt = GraphRuntime::default();
    evaluate_all(&mut rt, &spec).unwrap();
    assert!(float_of(&rt, "div").is_nan());
}

#[test]
fn graph_spec_round_trips_through_json() {
    let json = r#"{
        "nodes": [
            { "id": "a", "type": "constant", "params": { "value": { "type": "Float", "data": 2.0 } } },
            { "id": "b", "type": "reverse", "inputs": { "in": { "node_id": "a" } } }
        ]
    }"#;
    let spec: GraphSpec = serde_json::from_str(json).expect("parse graph");
    assert_eq!(spec.nodes[1].inputs["in"].output_key, "out");
    let mut rt = GraphRuntime::default();
    evaluate_all(&mut rt, &spec).unwrap();
    assert!(approx(float_of(&rt, "b"), -1.0));
}
