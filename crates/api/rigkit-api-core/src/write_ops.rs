//! Attribute writes produced by one network evaluation.
//!
//! Serialized form of a [`WriteOp`]:
//! `{ "path": "ns:end_joint.translateX", "value": { "type": "Float", "data": 8.0 } }`

use serde::{Deserialize, Serialize};

use crate::{attr_path::AttrPath, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOp {
    pub path: AttrPath,
    pub value: Value,
}

impl WriteOp {
    pub fn new(path: AttrPath, value: Value) -> Self {
        Self { path, value }
    }
}

/// Writes in the order the network's output nodes were evaluated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteBatch(Vec<WriteOp>);

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.0.push(op);
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<WriteOp> {
        self.0
    }
}
