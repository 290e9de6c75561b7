//! The capability surface the rig layer needs from a scene host.

use glam::{DQuat, DVec3};
use rigkit_api_core::{AttrPath, Value};
use rigkit_graph_core::NodeType;

use crate::constraint::{ConstraintKind, ConstraintOptions};
use crate::error::SceneError;
use crate::network::EvalReport;
use crate::node::{AttrUnit, NodeKind};
use crate::scene::Scene;
use crate::template::ImportedTemplate;

/// Scene primitives consumed by the rigging layer.
///
/// Node names are full names (`namespace:short`). Every mutating call honours container locks:
/// members of a locked container cannot be created under, reparented, renamed or deleted, and
/// only their published attributes accept writes.
pub trait SceneHost {
    // namespaces
    fn namespace_exists(&self, namespace: &str) -> bool;
    fn add_namespace(&mut self, namespace: &str) -> Result<(), SceneError>;
    /// Delete the namespace together with every node and container inside it.
    fn remove_namespace(&mut self, namespace: &str) -> Result<(), SceneError>;
    fn rename_namespace(&mut self, old: &str, new: &str) -> Result<(), SceneError>;
    fn namespaces(&self) -> Vec<String>;

    // nodes
    /// True for both nodes and containers.
    fn exists(&self, name: &str) -> bool;
    fn create_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<&str>,
    ) -> Result<String, SceneError>;
    fn create_utility(&mut self, name: &str, kind: NodeType) -> Result<String, SceneError>;
    fn parent(
        &mut self,
        name: &str,
        parent: Option<&str>,
        preserve_world: bool,
    ) -> Result<(), SceneError>;
    fn parent_of(&self, name: &str) -> Option<String>;
    fn children(&self, name: &str) -> Vec<String>;
    fn descendants(&self, name: &str) -> Vec<String>;
    /// Delete a node with its subtree and the constraints and IK handles that depend on it.
    fn delete(&mut self, name: &str) -> Result<(), SceneError>;
    /// Rename a node or a container.
    fn rename(&mut self, old: &str, new: &str) -> Result<(), SceneError>;
    fn node_kind(&self, name: &str) -> Option<NodeKind>;
    /// Nodes inside `namespace`, or every node.
    fn list_nodes(&self, namespace: Option<&str>) -> Vec<String>;

    // transforms
    fn world_position(&self, name: &str) -> Result<DVec3, SceneError>;
    fn world_rotation(&self, name: &str) -> Result<DQuat, SceneError>;
    fn set_world_position(&mut self, name: &str, position: DVec3) -> Result<(), SceneError>;
    fn set_world_rotation(&mut self, name: &str, rotation: DQuat) -> Result<(), SceneError>;
    /// Bake a world rotation into a joint's orientation, keeping children in place.
    fn orient_joint(&mut self, name: &str, rotation: DQuat) -> Result<(), SceneError>;

    // attributes
    fn get_attr(&self, path: &AttrPath) -> Result<Value, SceneError>;
    fn set_attr(&mut self, path: &AttrPath, value: Value) -> Result<(), SceneError>;
    fn add_attr(&mut self, path: &AttrPath, default: Value, unit: AttrUnit)
        -> Result<(), SceneError>;
    fn alias_attr(&mut self, node: &str, alias: &str, attribute: &str) -> Result<(), SceneError>;
    fn has_attr(&self, path: &AttrPath) -> bool;

    // connections
    /// Connect `src -> dst`, replacing any existing source of `dst`.
    fn connect_attr(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), SceneError>;
    fn disconnect_attr(&mut self, dst: &AttrPath) -> Result<(), SceneError>;
    /// Live source of `dst`, looking through unit conversions.
    fn connection_source(&self, dst: &AttrPath) -> Option<AttrPath>;
    /// `(source, destination)` pairs touching `node` on either end.
    fn connections_of(&self, node: &str) -> Vec<(AttrPath, AttrPath)>;

    // constraints and IK
    fn create_constraint(
        &mut self,
        kind: ConstraintKind,
        driver: &str,
        driven: &str,
        options: &ConstraintOptions,
    ) -> Result<String, SceneError>;
    fn constraint_driver(&self, constraint: &str) -> Option<String>;
    /// Constraints driving `driven`.
    fn constraints_on(&self, driven: &str) -> Vec<String>;
    fn create_ik_handle(
        &mut self,
        handle: &str,
        effector: &str,
        start: &str,
        end: &str,
    ) -> Result<(), SceneError>;

    // containers
    fn create_container(&mut self, name: &str) -> Result<(), SceneError>;
    fn container_exists(&self, name: &str) -> bool;
    /// Move `names` into `container`. With `include_hidden_branches` every DAG descendant not
    /// owned elsewhere joins as well.
    fn add_to_container(
        &mut self,
        container: &str,
        names: &[String],
        include_hidden_branches: bool,
    ) -> Result<(), SceneError>;
    fn remove_from_container(&mut self, container: &str, name: &str) -> Result<(), SceneError>;
    fn publish(&mut self, container: &str, target: &AttrPath, alias: &str)
        -> Result<(), SceneError>;
    fn unpublish(&mut self, container: &str, alias: &str) -> Result<(), SceneError>;
    /// Node attribute an alias resolves to, through nested containers.
    fn resolve_published(&self, container: &str, alias: &str) -> Result<AttrPath, SceneError>;
    fn published(&self, container: &str) -> Vec<(String, AttrPath)>;
    fn set_container_locked(&mut self, container: &str, locked: bool) -> Result<(), SceneError>;
    fn is_container_locked(&self, container: &str) -> bool;
    fn container_members(&self, container: &str) -> Vec<String>;
    fn container_of(&self, name: &str) -> Option<String>;
    /// Delete a container and everything it owns.
    fn delete_container(&mut self, container: &str) -> Result<(), SceneError>;

    // templates and evaluation
    /// Instantiate a template with every node and container name prefixed by `prefix`.
    fn import_template(&mut self, id: &str, prefix: &str) -> Result<ImportedTemplate, SceneError>;
    /// Propagate connections, constraints and IK until the scene settles.
    fn evaluate(&mut self) -> Result<EvalReport, SceneError>;
}

impl SceneHost for Scene {
    fn namespace_exists(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    fn add_namespace(&mut self, namespace: &str) -> Result<(), SceneError> {
        self.add_namespace_impl(namespace)
    }

    fn remove_namespace(&mut self, namespace: &str) -> Result<(), SceneError> {
        self.remove_namespace_impl(namespace)
    }

    fn rename_namespace(&mut self, old: &str, new: &str) -> Result<(), SceneError> {
        self.rename_namespace_impl(old, new)
    }

    fn namespaces(&self) -> Vec<String> {
        self.namespaces.iter().cloned().collect()
    }

    fn exists(&self, name: &str) -> bool {
        self.is_taken(name)
    }

    fn create_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<&str>,
    ) -> Result<String, SceneError> {
        self.create_node_impl(name, kind, parent)
    }

    fn create_utility(&mut self, name: &str, kind: NodeType) -> Result<String, SceneError> {
        if matches!(kind, NodeType::Constant | NodeType::Input | NodeType::Output) {
            return Err(SceneError::WrongKind {
                node: name.to_string(),
                expected: "computing utility",
            });
        }
        self.create_node_impl(name, NodeKind::Utility(kind), None)
    }

    fn parent(
        &mut self,
        name: &str,
        parent: Option<&str>,
        preserve_world: bool,
    ) -> Result<(), SceneError> {
        self.parent_impl(name, parent, preserve_world)
    }

    fn parent_of(&self, name: &str) -> Option<String> {
        self.nodes.get(name).and_then(|n| n.parent.clone())
    }

    fn children(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn descendants(&self, name: &str) -> Vec<String> {
        self.descendants_of(name)
    }

    fn delete(&mut self, name: &str) -> Result<(), SceneError> {
        self.delete_node_impl(name)
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<(), SceneError> {
        self.rename_impl(old, new)
    }

    fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|n| n.kind)
    }

    fn list_nodes(&self, namespace: Option<&str>) -> Vec<String> {
        match namespace {
            Some(namespace) => {
                let prefix = format!("{namespace}:");
                self.nodes
                    .keys()
                    .filter(|n| n.starts_with(&prefix))
                    .cloned()
                    .collect()
            }
            None => self.nodes.keys().cloned().collect(),
        }
    }

    fn world_position(&self, name: &str) -> Result<DVec3, SceneError> {
        Scene::world_position(self, name)
    }

    fn world_rotation(&self, name: &str) -> Result<DQuat, SceneError> {
        Scene::world_rotation(self, name)
    }

    fn set_world_position(&mut self, name: &str, position: DVec3) -> Result<(), SceneError> {
        self.set_world_position_impl(name, position)
    }

    fn set_world_rotation(&mut self, name: &str, rotation: DQuat) -> Result<(), SceneError> {
        self.set_world_rotation_impl(name, rotation)
    }

    fn orient_joint(&mut self, name: &str, rotation: DQuat) -> Result<(), SceneError> {
        self.orient_joint_impl(name, rotation)
    }

    fn get_attr(&self, path: &AttrPath) -> Result<Value, SceneError> {
        self.get_attr_impl(path)
    }

    fn set_attr(&mut self, path: &AttrPath, value: Value) -> Result<(), SceneError> {
        self.set_attr_impl(path, value)
    }

    fn add_attr(
        &mut self,
        path: &AttrPath,
        default: Value,
        unit: AttrUnit,
    ) -> Result<(), SceneError> {
        self.add_attr_impl(path, default, unit)
    }

    fn alias_attr(&mut self, node: &str, alias: &str, attribute: &str) -> Result<(), SceneError> {
        self.alias_attr_impl(node, alias, attribute)
    }

    fn has_attr(&self, path: &AttrPath) -> bool {
        self.has_attr_impl(path)
    }

    fn connect_attr(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), SceneError> {
        self.connect_attr_impl(src, dst)
    }

    fn disconnect_attr(&mut self, dst: &AttrPath) -> Result<(), SceneError> {
        self.disconnect_attr_impl(dst)
    }

    fn connection_source(&self, dst: &AttrPath) -> Option<AttrPath> {
        self.connection_source_impl(dst)
    }

    fn connections_of(&self, node: &str) -> Vec<(AttrPath, AttrPath)> {
        self.connections
            .iter()
            .filter(|(dst, src)| dst.node_name() == node || src.node_name() == node)
            .map(|(dst, src)| (src.clone(), dst.clone()))
            .collect()
    }

    fn create_constraint(
        &mut self,
        kind: ConstraintKind,
        driver: &str,
        driven: &str,
        options: &ConstraintOptions,
    ) -> Result<String, SceneError> {
        self.create_constraint_impl(kind, driver, driven, options)
    }

    fn constraint_driver(&self, constraint: &str) -> Option<String> {
        self.constraint_driver_impl(constraint)
    }

    fn constraints_on(&self, driven: &str) -> Vec<String> {
        self.constraints
            .iter()
            .filter(|(_, con)| con.driven == driven)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn create_ik_handle(
        &mut self,
        handle: &str,
        effector: &str,
        start: &str,
        end: &str,
    ) -> Result<(), SceneError> {
        self.create_ik_handle_impl(handle, effector, start, end)
    }

    fn create_container(&mut self, name: &str) -> Result<(), SceneError> {
        self.create_container_impl(name)
    }

    fn container_exists(&self, name: &str) -> bool {
        self.containers.contains_key(name)
    }

    fn add_to_container(
        &mut self,
        container: &str,
        names: &[String],
        include_hidden_branches: bool,
    ) -> Result<(), SceneError> {
        self.add_to_container_impl(container, names, include_hidden_branches)
    }

    fn remove_from_container(&mut self, container: &str, name: &str) -> Result<(), SceneError> {
        self.remove_from_container_impl(container, name)
    }

    fn publish(
        &mut self,
        container: &str,
        target: &AttrPath,
        alias: &str,
    ) -> Result<(), SceneError> {
        self.publish_impl(container, target, alias)
    }

    fn unpublish(&mut self, container: &str, alias: &str) -> Result<(), SceneError> {
        self.unpublish_impl(container, alias)
    }

    fn resolve_published(&self, container: &str, alias: &str) -> Result<AttrPath, SceneError> {
        self.resolve_alias_impl(container, alias)
    }

    fn published(&self, container: &str) -> Vec<(String, AttrPath)> {
        self.containers
            .get(container)
            .map(|c| {
                c.published
                    .iter()
                    .map(|(alias, target)| (alias.clone(), target.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_container_locked(&mut self, container: &str, locked: bool) -> Result<(), SceneError> {
        self.set_container_locked_impl(container, locked)
    }

    fn is_container_locked(&self, container: &str) -> bool {
        self.containers
            .get(container)
            .map(|c| c.locked)
            .unwrap_or(false)
    }

    fn container_members(&self, container: &str) -> Vec<String> {
        self.containers
            .get(container)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn container_of(&self, name: &str) -> Option<String> {
        self.owner_of(name).map(str::to_string)
    }

    fn delete_container(&mut self, container: &str) -> Result<(), SceneError> {
        self.delete_container_impl(container)
    }

    fn import_template(&mut self, id: &str, prefix: &str) -> Result<ImportedTemplate, SceneError> {
        self.import_template_impl(id, prefix)
    }

    fn evaluate(&mut self) -> Result<EvalReport, SceneError> {
        self.evaluate_impl()
    }
}
