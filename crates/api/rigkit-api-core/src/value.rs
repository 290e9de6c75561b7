//! Value: runtime instances stored on scene attributes and flowing through the
//! dependency network. Numeric data is `f64`; angles are degrees.

use serde::{Deserialize, Serialize};

/// Lightweight kind enum for quick dispatch without matching on payloads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Bool,
    Int,
    Vec3,
    Enum,
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// Scalar float
    Float(f64),

    /// Boolean
    Bool(bool),

    /// Integer (rotation orders, indices)
    Int(i64),

    /// 3D vector (translate, rotate, scale, world positions)
    Vec3([f64; 3]),

    /// Enum with tag and nested value
    Enum(String, Box<Value>),

    /// Text / string
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Enum(_, _) => ValueKind::Enum,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Convenience constructors
    pub fn f(v: f64) -> Self {
        Value::Float(v)
    }

    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Value::Vec3([x, y, z])
    }

    /// Enum placeholder carrying only a tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Value::Enum(tag.into(), Box::new(Value::Bool(true)))
    }

    /// True when both values are numerically equal within `tolerance`.
    /// Non-numeric values compare by equality.
    pub fn approx_eq(&self, other: &Value, tolerance: f64) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => (a - b).abs() <= tolerance,
            (Value::Vec3(a), Value::Vec3(b)) => a
                .iter()
                .zip(b.iter())
                .all(|(x, y)| (x - y).abs() <= tolerance),
            _ => self == other,
        }
    }
}
