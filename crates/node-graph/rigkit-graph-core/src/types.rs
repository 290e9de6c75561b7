use hashbrown::HashMap;
use rigkit_api_core::{AttrPath, Value};
use serde::{Deserialize, Serialize};

pub type NodeId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Sources / sinks bound to scene attributes
    Constant,
    Input,
    Output,

    // Arithmetic (scalars broadcast over vec3)
    Add,      // sums every input, ordered by key
    Subtract, // lhs - rhs
    Multiply, // product of every input
    Divide,   // lhs / rhs
    Reverse,  // 1 - in
    Max,      // component-wise max(lhs, rhs)

    // Geometry
    DistanceBetween, // |point1 - point2|

    // Adapter inserted between angular and linear plugs
    UnitConversion, // in * factor
}

impl NodeType {
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Constant => "constant",
            NodeType::Input => "input",
            NodeType::Output => "output",
            NodeType::Add => "add",
            NodeType::Subtract => "subtract",
            NodeType::Multiply => "multiply",
            NodeType::Divide => "divide",
            NodeType::Reverse => "reverse",
            NodeType::Max => "max",
            NodeType::DistanceBetween => "distance_between",
            NodeType::UnitConversion => "unit_conversion",
        }
    }

    /// Input ports the node reads. Variadic nodes accept any key.
    pub fn input_ports(&self) -> &'static [&'static str] {
        match self {
            NodeType::Constant | NodeType::Input => &[],
            NodeType::Output | NodeType::Reverse | NodeType::UnitConversion => &["in"],
            NodeType::Subtract | NodeType::Divide | NodeType::Max => &["lhs", "rhs"],
            NodeType::Add | NodeType::Multiply => &["in_0", "in_1"],
            NodeType::DistanceBetween => &["point1", "point2"],
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, NodeType::Add | NodeType::Multiply)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NodeParams {
    /// Constant payload, or the fallback for an unstaged Input.
    pub value: Option<Value>,
    /// Scene attribute read by Input / written by Output.
    pub path: Option<AttrPath>,
    /// Multiplier used by UnitConversion.
    pub factor: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConnection {
    pub node_id: NodeId,
    #[serde(default = "default_output_key")]
    pub output_key: String,
}

impl InputConnection {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            output_key: default_output_key(),
        }
    }
}

fn default_output_key() -> String {
    "out".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default)]
    pub params: NodeParams,
    #[serde(default)]
    pub inputs: HashMap<String, InputConnection>,
}

impl NodeSpec {
    pub fn new(id: impl Into<NodeId>, kind: NodeType) -> Self {
        Self {
            id: id.into(),
            kind,
            params: NodeParams::default(),
            inputs: HashMap::new(),
        }
    }

    pub fn with_input(mut self, port: &str, source: impl Into<NodeId>) -> Self {
        self.inputs
            .insert(port.to_string(), InputConnection::new(source));
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.params.value = Some(value);
        self
    }

    pub fn with_path(mut self, path: AttrPath) -> Self {
        self.params.path = Some(path);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
}

impl GraphSpec {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
