//! The module types a [`crate::Rigger`] can install.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::blueprint::{HingeJoint, ModuleBlueprint, SingleJoint, SingleJointSegment};
use crate::error::RigError;

/// What a UI shows for a module type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub type_id: String,
    pub title: String,
    pub description: String,
    /// Icon path relative to the tool's asset root.
    #[serde(default)]
    pub icon: String,
}

type Factory = fn() -> Box<dyn ModuleBlueprint>;

fn single_joint_segment() -> Box<dyn ModuleBlueprint> {
    Box::new(SingleJointSegment)
}

fn hinge_joint() -> Box<dyn ModuleBlueprint> {
    Box::new(HingeJoint)
}

fn single_joint() -> Box<dyn ModuleBlueprint> {
    Box::new(SingleJoint)
}

const BUILTIN: [(&str, &str, &str, &str, Factory); 3] = [
    (
        "SingleJointSegment",
        "Single Joint Segment",
        "Two joints with controls for the joint orientation and rotate order. Ideal use: clavicle.",
        "Icons/_singleJointSeg.xpm",
        single_joint_segment,
    ),
    (
        "HingeJoint",
        "Hinge Joint",
        "Three joints bending at the middle joint around a shared pole. Ideal use: arm or leg.",
        "Icons/_hinge.xpm",
        hinge_joint,
    ),
    (
        "SingleJoint",
        "Single Joint",
        "One joint that keeps translation and scale once locked. Ideal use: root or prop.",
        "Icons/_singleJoint.xpm",
        single_joint,
    ),
];

struct Entry {
    info: ModuleInfo,
    blueprint: Box<dyn ModuleBlueprint>,
}

#[derive(Default)]
pub struct ModuleCatalog {
    entries: IndexMap<String, Entry>,
}

impl ModuleCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (type_id, title, description, icon, factory) in BUILTIN {
            catalog.register(
                ModuleInfo {
                    type_id: type_id.to_string(),
                    title: title.to_string(),
                    description: description.to_string(),
                    icon: icon.to_string(),
                },
                factory(),
            );
        }
        catalog
    }

    /// Add or replace a module type.
    pub fn register(&mut self, info: ModuleInfo, blueprint: Box<dyn ModuleBlueprint>) {
        self.entries
            .insert(info.type_id.clone(), Entry { info, blueprint });
    }

    pub fn lookup(&self, type_id: &str) -> Result<&dyn ModuleBlueprint, RigError> {
        self.entries
            .get(type_id)
            .map(|e| e.blueprint.as_ref())
            .ok_or_else(|| RigError::ModuleTypeNotFound(type_id.to_string()))
    }

    pub fn info(&self, type_id: &str) -> Option<&ModuleInfo> {
        self.entries.get(type_id).map(|e| &e.info)
    }

    /// Registered types in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.entries.values().map(|e| &e.info)
    }
}
