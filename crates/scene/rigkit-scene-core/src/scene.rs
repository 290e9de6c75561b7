//! In-memory scene: DAG nodes, namespaces and the side tables that hang off them.

use glam::DVec3;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use rigkit_api_core::{split_namespace, AttrPath, Value};
use rigkit_graph_core::{GraphRuntime, GraphSpec, NodeType};

use crate::attrs::{CONVERSION_FACTOR, CONVERSION_INPUT};
use crate::config::SceneConfig;
use crate::constraint::Constraint;
use crate::container::Container;
use crate::error::SceneError;
use crate::ik::IkHandle;
use crate::math::decompose;
use crate::node::{AttrUnit, ExtraAttr, NodeKind, SceneNode};
use crate::template::TemplateLibrary;

/// Reference scene host.
///
/// Holds every node in a flat table keyed by full name (`ns:short`). Hierarchy, containers,
/// connections, constraints and IK handles all refer to nodes by name, so renames rewrite
/// every table.
#[derive(Debug)]
pub struct Scene {
    pub(crate) config: SceneConfig,
    pub(crate) nodes: IndexMap<String, SceneNode>,
    pub(crate) namespaces: IndexSet<String>,
    pub(crate) containers: IndexMap<String, Container>,
    /// destination -> source
    pub(crate) connections: IndexMap<AttrPath, AttrPath>,
    pub(crate) constraints: IndexMap<String, Constraint>,
    pub(crate) ik_handles: IndexMap<String, IkHandle>,
    pub(crate) templates: TemplateLibrary,
    pub(crate) runtime: GraphRuntime,
    pub(crate) network: Option<GraphSpec>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            nodes: IndexMap::new(),
            namespaces: IndexSet::new(),
            containers: IndexMap::new(),
            connections: IndexMap::new(),
            constraints: IndexMap::new(),
            ik_handles: IndexMap::new(),
            templates: TemplateLibrary::builtin(),
            runtime: GraphRuntime::default(),
            network: None,
        }
    }

    /// Replace the template library used by `import_template`.
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn templates_mut(&mut self) -> &mut TemplateLibrary {
        &mut self.templates
    }

    // ----- lookup -----

    pub(crate) fn node(&self, name: &str) -> Result<&SceneNode, SceneError> {
        self.nodes
            .get(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))
    }

    pub(crate) fn node_mut(&mut self, name: &str) -> Result<&mut SceneNode, SceneError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))
    }

    pub(crate) fn is_taken(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.containers.contains_key(name)
    }

    pub(crate) fn invalidate_network(&mut self) {
        self.network = None;
    }

    /// Every DAG descendant of `name`, depth first, excluding `name` itself.
    pub fn descendants_of(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = match self.nodes.get(name) {
            Some(node) => node.children.iter().rev().map(String::as_str).collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current.to_string());
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    pub(crate) fn is_ancestor(&self, ancestor: &str, node: &str) -> bool {
        let mut cursor = self.nodes.get(node).and_then(|n| n.parent.as_deref());
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent.as_deref());
        }
        false
    }

    // ----- namespaces -----

    pub(crate) fn add_namespace_impl(&mut self, namespace: &str) -> Result<(), SceneError> {
        if namespace.is_empty() || namespace.contains(':') {
            return Err(SceneError::NamespaceNotFound(namespace.to_string()));
        }
        if !self.namespaces.insert(namespace.to_string()) {
            return Err(SceneError::NamespaceExists(namespace.to_string()));
        }
        debug!("added namespace {namespace}");
        Ok(())
    }

    /// Delete every node and container inside `namespace`, then the namespace itself.
    pub(crate) fn remove_namespace_impl(&mut self, namespace: &str) -> Result<(), SceneError> {
        if !self.namespaces.contains(namespace) {
            return Err(SceneError::NamespaceNotFound(namespace.to_string()));
        }
        let prefix = format!("{namespace}:");
        let containers: Vec<String> = self
            .containers
            .keys()
            .filter(|c| c.starts_with(&prefix))
            .cloned()
            .collect();
        for name in &containers {
            let container = &self.containers[name];
            if container.locked {
                return Err(SceneError::ContainerLocked {
                    container: name.clone(),
                    node: name.clone(),
                });
            }
        }
        for name in containers {
            if self.containers.contains_key(&name) {
                self.delete_container_impl(&name)?;
            }
        }
        let nodes: Vec<String> = self
            .nodes
            .keys()
            .filter(|n| n.starts_with(&prefix))
            .cloned()
            .collect();
        for name in nodes {
            if self.nodes.contains_key(&name) {
                self.delete_node_unchecked(&name);
            }
        }
        self.namespaces.shift_remove(namespace);
        debug!("removed namespace {namespace}");
        Ok(())
    }

    pub(crate) fn rename_namespace_impl(&mut self, old: &str, new: &str) -> Result<(), SceneError> {
        if !self.namespaces.contains(old) {
            return Err(SceneError::NamespaceNotFound(old.to_string()));
        }
        if self.namespaces.contains(new) {
            return Err(SceneError::NamespaceExists(new.to_string()));
        }
        let old_prefix = format!("{old}:");
        let renames: Vec<(String, String)> = self
            .nodes
            .keys()
            .chain(self.containers.keys())
            .filter_map(|name| {
                name.strip_prefix(&old_prefix)
                    .map(|short| (name.clone(), format!("{new}:{short}")))
            })
            .collect();
        if let Some((_, taken)) = renames.iter().find(|(_, to)| self.is_taken(to)) {
            return Err(SceneError::NameTaken(taken.clone()));
        }
        for (from, to) in renames {
            self.rename_unchecked(&from, &to);
        }
        self.namespaces.shift_remove(old);
        self.namespaces.insert(new.to_string());
        debug!("renamed namespace {old} -> {new}");
        Ok(())
    }

    pub(crate) fn check_new_name(&self, name: &str) -> Result<(), SceneError> {
        if name.is_empty() {
            return Err(SceneError::Path(rigkit_api_core::AttrPathError::Empty));
        }
        AttrPath::parse(name)?;
        if let Some((namespace, _)) = split_namespace(name) {
            if !self.namespaces.contains(namespace) {
                return Err(SceneError::NamespaceNotFound(namespace.to_string()));
            }
        }
        if self.is_taken(name) {
            return Err(SceneError::NameTaken(name.to_string()));
        }
        Ok(())
    }

    // ----- creation -----

    pub(crate) fn create_node_impl(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<&str>,
    ) -> Result<String, SceneError> {
        self.check_new_name(name)?;
        if name.contains('.') {
            return Err(SceneError::Path(rigkit_api_core::AttrPathError::Invalid {
                path: name.to_string(),
                reason: "node names may not contain '.'",
            }));
        }
        if let Some(parent) = parent {
            let parent_node = self.node(parent)?;
            if !parent_node.kind.is_dag() || !kind.is_dag() {
                return Err(SceneError::InvalidParent {
                    node: name.to_string(),
                    parent: parent.to_string(),
                    reason: "utility nodes are not part of the hierarchy",
                });
            }
            self.guard_member(parent)?;
        }
        let mut node = SceneNode::new(name, kind);
        if let NodeKind::Utility(NodeType::UnitConversion) = kind {
            for (port, value) in [(CONVERSION_FACTOR, 1.0), (CONVERSION_INPUT, 0.0)] {
                node.extra.insert(
                    port.to_string(),
                    ExtraAttr {
                        value: Value::Float(value),
                        unit: AttrUnit::Linear,
                    },
                );
            }
        }
        node.parent = parent.map(str::to_string);
        self.nodes.insert(name.to_string(), node);
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(name.to_string());
        }
        if kind.is_utility() {
            self.invalidate_network();
        }
        debug!("created {} {name}", kind.name());
        Ok(name.to_string())
    }

    // ----- hierarchy -----

    pub(crate) fn parent_impl(
        &mut self,
        name: &str,
        new_parent: Option<&str>,
        preserve_world: bool,
    ) -> Result<(), SceneError> {
        let node = self.node(name)?;
        if !node.kind.is_dag() {
            return Err(SceneError::WrongKind {
                node: name.to_string(),
                expected: "DAG node",
            });
        }
        if node.parent.as_deref() == new_parent {
            return Ok(());
        }
        self.guard_member(name)?;
        if let Some(parent) = new_parent {
            let parent_node = self.node(parent)?;
            if !parent_node.kind.is_dag() {
                return Err(SceneError::InvalidParent {
                    node: name.to_string(),
                    parent: parent.to_string(),
                    reason: "parent is not a DAG node",
                });
            }
            if parent == name || self.is_ancestor(name, parent) {
                return Err(SceneError::InvalidParent {
                    node: name.to_string(),
                    parent: parent.to_string(),
                    reason: "parent is a descendant",
                });
            }
        }

        let world = self.world_matrix(name)?;
        self.detach(name);
        if let Some(parent) = new_parent {
            self.node_mut(parent)?.children.push(name.to_string());
        }
        self.node_mut(name)?.parent = new_parent.map(str::to_string);

        if preserve_world {
            let (world_scale, rotation, translation) = decompose(&world);
            let (parent_scale, _, _) = match new_parent {
                Some(parent) => decompose(&self.world_matrix(parent)?),
                None => (DVec3::ONE, glam::DQuat::IDENTITY, DVec3::ZERO),
            };
            self.put_world_position(name, translation)?;
            self.put_world_rotation(name, rotation)?;
            let scale = world_scale / parent_scale.max(DVec3::splat(crate::math::EPSILON));
            self.node_mut(name)?.scale = scale;
        }
        Ok(())
    }

    fn detach(&mut self, name: &str) {
        let parent = self.nodes.get(name).and_then(|n| n.parent.clone());
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| c != name);
            }
        }
    }

    // ----- deletion -----

    /// Names removed when deleting `name`: its subtree, plus constraints and IK handles that
    /// depend on anything removed.
    pub(crate) fn deletion_set(&self, name: &str) -> Vec<String> {
        let mut doomed: IndexSet<String> = IndexSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(next) = pending.pop() {
            if !doomed.insert(next.clone()) {
                continue;
            }
            pending.extend(self.descendants_of(&next));
            pending.extend(
                self.constraints
                    .iter()
                    .filter(|(_, con)| con.driven == next)
                    .map(|(c, _)| c.clone()),
            );
            for (handle, ik) in &self.ik_handles {
                if ik.start == next || ik.end == next {
                    pending.push(handle.clone());
                    pending.push(ik.effector.clone());
                }
            }
        }
        doomed.into_iter().collect()
    }

    pub(crate) fn delete_node_impl(&mut self, name: &str) -> Result<(), SceneError> {
        self.node(name)?;
        let doomed = self.deletion_set(name);
        for n in &doomed {
            if self.nodes.contains_key(n) {
                self.guard_member(n)?;
            }
        }
        for n in doomed {
            if self.nodes.contains_key(&n) {
                self.delete_node_unchecked(&n);
            }
        }
        Ok(())
    }

    /// Remove `name` and its subtree from every table, ignoring container locks.
    pub(crate) fn delete_node_unchecked(&mut self, name: &str) {
        let doomed = self.deletion_set(name);
        self.detach(name);
        for n in &doomed {
            self.nodes.shift_remove(n);
            self.constraints.shift_remove(n);
            self.ik_handles.shift_remove(n);
            for container in self.containers.values_mut() {
                container.members.shift_remove(n);
            }
            self.connections
                .retain(|dst, src| dst.node_name() != *n && src.node_name() != *n);
        }
        for container in self.containers.values_mut() {
            container
                .published
                .retain(|_, target| !doomed.contains(&target.node_name()));
        }
        // children lists of surviving nodes may still point at removed names
        for node in self.nodes.values_mut() {
            node.children.retain(|c| !doomed.contains(c));
            if node
                .parent
                .as_ref()
                .map(|p| doomed.contains(p))
                .unwrap_or(false)
            {
                node.parent = None;
            }
        }
        self.invalidate_network();
        debug!("deleted {name} ({} nodes)", doomed.len());
    }

    // ----- renaming -----

    pub(crate) fn rename_impl(&mut self, old: &str, new: &str) -> Result<(), SceneError> {
        if old == new {
            return Ok(());
        }
        if !self.is_taken(old) {
            return Err(SceneError::NodeNotFound(old.to_string()));
        }
        self.check_new_name(new)?;
        if self.nodes.contains_key(old) {
            self.guard_member(old)?;
        } else {
            self.guard_container(old)?;
        }
        self.rename_unchecked(old, new);
        Ok(())
    }

    /// Rename a node or container, rewriting every reference to it.
    pub(crate) fn rename_unchecked(&mut self, old: &str, new: &str) {
        if let Some(mut node) = self.nodes.shift_remove(old) {
            node.name = new.to_string();
            self.nodes.insert(new.to_string(), node);
        }
        if let Some(mut container) = self.containers.shift_remove(old) {
            container.name = new.to_string();
            self.containers.insert(new.to_string(), container);
        }
        if let Some(con) = self.constraints.shift_remove(old) {
            self.constraints.insert(new.to_string(), con);
        }
        if let Some(ik) = self.ik_handles.shift_remove(old) {
            self.ik_handles.insert(new.to_string(), ik);
        }

        let swap = |s: &mut String| {
            if s == old {
                *s = new.to_string();
            }
        };
        for node in self.nodes.values_mut() {
            if let Some(parent) = node.parent.as_mut() {
                swap(parent);
            }
            node.children.iter_mut().for_each(swap);
        }
        for con in self.constraints.values_mut() {
            swap(&mut con.driven);
        }
        for ik in self.ik_handles.values_mut() {
            swap(&mut ik.start);
            swap(&mut ik.end);
            swap(&mut ik.effector);
        }
        for container in self.containers.values_mut() {
            if container.members.shift_remove(old) {
                container.members.insert(new.to_string());
            }
            for target in container.published.values_mut() {
                rename_path(target, old, new);
            }
        }
        let connections = std::mem::take(&mut self.connections);
        self.connections = connections
            .into_iter()
            .map(|(mut dst, mut src)| {
                rename_path(&mut dst, old, new);
                rename_path(&mut src, old, new);
                (dst, src)
            })
            .collect();
        self.runtime = GraphRuntime::default();
        self.invalidate_network();
        debug!("renamed {old} -> {new}");
    }
}

fn rename_path(path: &mut AttrPath, old: &str, new: &str) {
    if path.node_name() == old {
        if let Ok(renamed) = path.with_node_name(new) {
            *path = renamed;
        }
    }
}
