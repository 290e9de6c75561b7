//! Identifiers for modules, joints and controls.
//!
//! Everything a module owns lives in one namespace, `{type}__{name}`, so identifiers are
//! names and the scene stays the single source of truth.

use std::fmt;

use rigkit_api_core::split_namespace;
use serde::{Deserialize, Serialize};

const MODULE_SEPARATOR: &str = "__";
const TRANSLATION_SUFFIX: &str = "_translation_control";
const ORIENTATION_SUFFIX: &str = "_orientation_control";

/// A module instance, identified by its namespace.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(type_id: &str, name: &str) -> Self {
        Self(format!("{type_id}{MODULE_SEPARATOR}{name}"))
    }

    /// Accepts `{type}__{name}` with both halves non-empty.
    pub fn parse(namespace: &str) -> Option<Self> {
        let (type_id, name) = namespace.split_once(MODULE_SEPARATOR)?;
        (!type_id.is_empty() && !name.is_empty() && !namespace.contains(':'))
            .then(|| Self(namespace.to_string()))
    }

    /// Module owning a scene node, judged by the node's namespace.
    pub fn of_node(node: &str) -> Option<Self> {
        split_namespace(node).and_then(|(ns, _)| Self::parse(ns))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn type_id(&self) -> &str {
        self.0.split_once(MODULE_SEPARATOR).map_or("", |(t, _)| t)
    }

    pub fn name(&self) -> &str {
        self.0.split_once(MODULE_SEPARATOR).map_or("", |(_, n)| n)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JointId {
    pub module: ModuleId,
    /// Name inside the module namespace (`root_joint`).
    pub name: String,
}

impl JointId {
    pub fn new(module: &ModuleId, name: impl Into<String>) -> Self {
        Self {
            module: module.clone(),
            name: name.into(),
        }
    }

    pub fn parse(node: &str) -> Option<Self> {
        let (ns, short) = split_namespace(node)?;
        Some(Self {
            module: ModuleId::parse(ns)?,
            name: short.to_string(),
        })
    }

    /// Full scene name, `ns:joint`.
    pub fn node(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }

    /// The joint rebuilt in its place when the module locks.
    pub fn frozen(&self) -> String {
        format!("{}:blueprint_{}", self.module, self.name)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Translation,
    Orientation,
}

/// A user-facing control attached to one joint.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ControlId {
    pub joint: JointId,
    pub kind: ControlKind,
}

impl ControlId {
    pub fn translation(joint: JointId) -> Self {
        Self {
            joint,
            kind: ControlKind::Translation,
        }
    }

    pub fn orientation(joint: JointId) -> Self {
        Self {
            joint,
            kind: ControlKind::Orientation,
        }
    }

    /// Recognise a control from its node name.
    pub fn parse(node: &str) -> Option<Self> {
        let (ns, short) = split_namespace(node)?;
        let module = ModuleId::parse(ns)?;
        let (joint, kind) = if let Some(joint) = short.strip_suffix(TRANSLATION_SUFFIX) {
            (joint, ControlKind::Translation)
        } else if let Some(joint) = short.strip_suffix(ORIENTATION_SUFFIX) {
            (joint, ControlKind::Orientation)
        } else {
            return None;
        };
        (!joint.is_empty()).then(|| Self {
            joint: JointId::new(&module, joint),
            kind,
        })
    }

    pub fn node(&self) -> String {
        let suffix = match self.kind {
            ControlKind::Translation => TRANSLATION_SUFFIX,
            ControlKind::Orientation => ORIENTATION_SUFFIX,
        };
        format!("{}{suffix}", self.joint.node())
    }

    pub fn container(&self) -> String {
        format!("{}_container", self.node())
    }

    /// Alias the control's channel is published under.
    pub fn alias(&self) -> String {
        match self.kind {
            ControlKind::Translation => format!("{}_T", self.joint.name),
            ControlKind::Orientation => format!("{}_orientation", self.joint.name),
        }
    }
}
