//! Allocation of module namespaces.

use indexmap::IndexMap;
use log::info;
use rigkit_scene_core::SceneHost;

use crate::error::RigError;
use crate::ids::ModuleId;

/// Reject names that cannot form a `{type}__{name}` namespace.
pub fn validate_name(name: &str) -> Result<(), RigError> {
    let invalid = |reason| RigError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains("__") {
        return Err(invalid("'__' separates module type and name"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("only letters, digits and '_' are allowed"));
    }
    Ok(())
}

/// Module names in use, keyed by user name. Uniqueness is global across module types.
#[derive(Debug, Default, Clone)]
pub struct NamespaceRegistry {
    names: IndexMap<String, ModuleId>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.names.values()
    }

    pub fn allocate(
        &mut self,
        host: &mut dyn SceneHost,
        type_id: &str,
        name: &str,
    ) -> Result<ModuleId, RigError> {
        validate_name(name)?;
        let module = ModuleId::new(type_id, name);
        if self.contains(name) || host.namespace_exists(module.as_str()) {
            return Err(RigError::NameConflict(name.to_string()));
        }
        host.add_namespace(module.as_str())?;
        self.names.insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Move `module` to a new name; on failure the module keeps its old namespace.
    pub fn rename(
        &mut self,
        host: &mut dyn SceneHost,
        module: &ModuleId,
        new_name: &str,
    ) -> Result<ModuleId, RigError> {
        validate_name(new_name)?;
        if !self.contains(module.name()) {
            return Err(RigError::ModuleNotFound(module.to_string()));
        }
        let renamed = ModuleId::new(module.type_id(), new_name);
        if self.contains(new_name) || host.namespace_exists(renamed.as_str()) {
            return Err(RigError::NameConflict(new_name.to_string()));
        }
        host.rename_namespace(module.as_str(), renamed.as_str())?;
        if let Some(index) = self.names.get_index_of(module.name()) {
            self.names.shift_remove_index(index);
            self.names.shift_insert(index, new_name.to_string(), renamed.clone());
        }
        info!("renamed module {module} -> {renamed}");
        Ok(renamed)
    }

    /// Forget `module` and remove its namespace with everything still in it.
    pub fn release(&mut self, host: &mut dyn SceneHost, module: &ModuleId) -> Result<(), RigError> {
        if host.namespace_exists(module.as_str()) {
            host.remove_namespace(module.as_str())?;
        }
        self.names.shift_remove(module.name());
        Ok(())
    }

    /// `{base}{n + 1}` where `n` is the highest numeric suffix among names starting with `base`.
    pub fn next_default_name(&self, base: &str) -> String {
        let highest = self
            .names
            .keys()
            .filter_map(|name| name.strip_prefix(base)?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{base}{}", highest + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigkit_scene_core::Scene;

    #[test]
    fn names_are_unique_across_types() {
        let mut scene = Scene::default();
        let mut registry = NamespaceRegistry::new();
        let arm = registry.allocate(&mut scene, "SingleJointSegment", "arm").unwrap();
        assert_eq!(arm.as_str(), "SingleJointSegment__arm");
        assert!(scene.namespace_exists("SingleJointSegment__arm"));
        assert_eq!(
            registry.allocate(&mut scene, "HingeJoint", "arm"),
            Err(RigError::NameConflict("arm".to_string()))
        );
        assert!(!scene.namespace_exists("HingeJoint__arm"));
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "a__b", "a:b", "a.b", "a b"] {
            assert!(matches!(validate_name(name), Err(RigError::InvalidName { .. })));
        }
        assert!(validate_name("left_arm2").is_ok());
    }

    #[test]
    fn rename_keeps_module_on_conflict() {
        let mut scene = Scene::default();
        let mut registry = NamespaceRegistry::new();
        let a = registry.allocate(&mut scene, "SingleJoint", "a").unwrap();
        registry.allocate(&mut scene, "SingleJoint", "b").unwrap();
        assert_eq!(
            registry.rename(&mut scene, &a, "b"),
            Err(RigError::NameConflict("b".to_string()))
        );
        assert!(scene.namespace_exists("SingleJoint__a"));

        let c = registry.rename(&mut scene, &a, "c").unwrap();
        assert_eq!(c.as_str(), "SingleJoint__c");
        assert!(!scene.namespace_exists("SingleJoint__a"));
        assert!(registry.contains("c") && !registry.contains("a"));
        assert_eq!(registry.modules().next(), Some(&c));
    }

    #[test]
    fn default_names_count_up_from_highest_suffix() {
        let mut scene = Scene::default();
        let mut registry = NamespaceRegistry::new();
        assert_eq!(registry.next_default_name("instance_"), "instance_1");
        registry.allocate(&mut scene, "SingleJoint", "instance_1").unwrap();
        registry.allocate(&mut scene, "SingleJoint", "instance_7").unwrap();
        registry.allocate(&mut scene, "SingleJoint", "instance_x").unwrap();
        assert_eq!(registry.next_default_name("instance_"), "instance_8");
    }

    #[test]
    fn release_frees_the_name() {
        let mut scene = Scene::default();
        let mut registry = NamespaceRegistry::new();
        let a = registry.allocate(&mut scene, "SingleJoint", "a").unwrap();
        registry.release(&mut scene, &a).unwrap();
        assert!(!scene.namespace_exists(a.as_str()));
        assert!(registry.allocate(&mut scene, "SingleJoint", "a").is_ok());
    }
}
