//! Scene names of the fixed parts of a module.

use crate::ids::{JointId, ModuleId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleLayout {
    pub module: ModuleId,
}

impl ModuleLayout {
    pub fn new(module: &ModuleId) -> Self {
        Self {
            module: module.clone(),
        }
    }

    pub fn node(&self, short: &str) -> String {
        format!("{}:{short}", self.module)
    }

    pub fn joint(&self, short: &str) -> JointId {
        JointId::new(&self.module, short)
    }

    pub fn container(&self) -> String {
        self.node("module_container")
    }

    pub fn module_grp(&self) -> String {
        self.node("module_grp")
    }

    pub fn joints_grp(&self) -> String {
        self.node("joints_grp")
    }

    pub fn hierarchy_grp(&self) -> String {
        self.node("hierarchy_representation_grp")
    }

    pub fn orientation_grp(&self) -> String {
        self.node("orientationControls_grp")
    }

    pub fn module_transform(&self) -> String {
        self.node("module_transform")
    }

    pub fn unhooked_target(&self) -> String {
        self.node("unhookedTarget")
    }

    pub fn hook_grp(&self) -> String {
        self.node("hook_grp")
    }

    /// Point constraint whose driver is the module's hook target.
    pub fn hook_constraint(&self) -> String {
        self.node("hook_pointConstraint")
    }

    pub fn hook_in(&self) -> String {
        self.node("HOOK_IN")
    }

    pub fn settings(&self) -> String {
        self.node("SETTINGS")
    }
}
