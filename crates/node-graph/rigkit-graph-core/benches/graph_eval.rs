//! Dependency network evaluation benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rigkit_api_core::{AttrPath, Value};
use rigkit_graph_core::{evaluate_all, GraphRuntime, GraphSpec, NodeSpec, NodeType};

fn path(s: &str) -> AttrPath {
    AttrPath::parse(s).expect("valid path")
}

/// One stretchy segment network per joint pair, chained `segments` times.
fn stretch_network(segments: usize) -> GraphSpec {
    let mut nodes = Vec::new();
    for i in 0..segments {
        let root = format!("root{i}");
        let end = format!("end{i}");
        nodes.push(
            NodeSpec::new(root.clone(), NodeType::Input)
                .with_path(path(&format!("m:root{i}.worldPosition"))),
        );
        nodes.push(
            NodeSpec::new(end.clone(), NodeType::Input)
                .with_path(path(&format!("m:end{i}.worldPosition"))),
        );
        nodes.push(
            NodeSpec::new(format!("dist{i}"), NodeType::DistanceBetween)
                .with_input("point1", root)
                .with_input("point2", end),
        );
        nodes.push(NodeSpec::new(format!("len{i}"), NodeType::Constant).with_value(Value::Float(4.0)));
        nodes.push(
            NodeSpec::new(format!("ratio{i}"), NodeType::Divide)
                .with_input("lhs", format!("dist{i}"))
                .with_input("rhs", format!("len{i}")),
        );
        nodes.push(
            NodeSpec::new(format!("scaled{i}"), NodeType::Multiply)
                .with_input("in_0", format!("ratio{i}"))
                .with_input("in_1", format!("len{i}")),
        );
        nodes.push(
            NodeSpec::new(format!("write{i}"), NodeType::Output)
                .with_input("in", format!("scaled{i}"))
                .with_path(path(&format!("m:joint{i}.translateX"))),
        );
    }
    GraphSpec { nodes }
}

fn bench_stretch_network(c: &mut Criterion) {
    let spec = stretch_network(64);
    let mut rt = GraphRuntime::default();

    c.bench_function("stretch_network_64", |b| {
        b.iter(|| {
            for i in 0..64 {
                rt.set_input(path(&format!("m:root{i}.worldPosition")), Value::vec3(0.0, 0.0, 0.0));
                rt.set_input(path(&format!("m:end{i}.worldPosition")), Value::vec3(6.0, 0.0, 0.0));
            }
            evaluate_all(&mut rt, black_box(&spec)).expect("evaluate");
        })
    });
}

criterion_group!(benches, bench_stretch_network);
criterion_main!(benches);
