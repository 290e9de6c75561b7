//! Containers: named boundaries owning nodes (and nested containers) with a published
//! attribute surface and a lock flag.

use hashbrown::HashSet;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use rigkit_api_core::AttrPath;
use rigkit_graph_core::NodeType;

use crate::error::SceneError;
use crate::node::{BuiltinAttr, NodeKind};
use crate::scene::Scene;

#[derive(Debug, Clone, Default)]
pub struct Container {
    pub name: String,
    /// Node and nested-container names, in insertion order.
    pub members: IndexSet<String>,
    /// alias -> attribute on a member, or alias on a nested container
    pub published: IndexMap<String, AttrPath>,
    pub locked: bool,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Scene {
    /// Container directly owning `name` (a node or a container).
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.containers
            .values()
            .find(|c| c.members.contains(name))
            .map(|c| c.name.as_str())
    }

    /// Owning containers of `name`, innermost first.
    pub(crate) fn owner_chain(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.owner_of(name).map(str::to_string);
        while let Some(container) = cursor {
            if !seen.insert(container.clone()) {
                break;
            }
            cursor = self.owner_of(&container).map(str::to_string);
            chain.push(container);
        }
        chain
    }

    fn locked_owner(&self, name: &str) -> Option<String> {
        self.owner_chain(name)
            .into_iter()
            .find(|c| self.containers.get(c).map(|c| c.locked).unwrap_or(false))
    }

    /// Fail when `node` sits inside a locked container.
    pub(crate) fn guard_member(&self, node: &str) -> Result<(), SceneError> {
        match self.locked_owner(node) {
            Some(container) => Err(SceneError::ContainerLocked {
                container,
                node: node.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Fail when `container` itself or any enclosing container is locked.
    pub(crate) fn guard_container(&self, container: &str) -> Result<(), SceneError> {
        let c = self
            .containers
            .get(container)
            .ok_or_else(|| SceneError::ContainerNotFound(container.to_string()))?;
        if c.locked {
            return Err(SceneError::ContainerLocked {
                container: container.to_string(),
                node: container.to_string(),
            });
        }
        self.guard_member(container)
    }

    /// Fail when `path` is an unpublished attribute of a member of a locked container.
    pub(crate) fn guard_attr(&self, path: &AttrPath) -> Result<(), SceneError> {
        let node = path.node_name();
        let chain = self.owner_chain(&node);
        let Some(locked) = chain
            .iter()
            .find(|c| self.containers.get(*c).map(|c| c.locked).unwrap_or(false))
        else {
            return Ok(());
        };
        let canonical = self.canonical_attr(path);
        let published = chain.iter().any(|container| {
            self.containers
                .get(container)
                .map(|c| {
                    c.published.keys().any(|alias| {
                        self.resolve_alias_impl(container, alias)
                            .map(|target| self.covers(&target, &canonical))
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false)
        });
        if published {
            Ok(())
        } else {
            Err(SceneError::Unpublished {
                path: path.to_string(),
                container: locked.clone(),
            })
        }
    }

    /// Attribute path with node aliases (`globalScale`) replaced by the real attribute.
    pub(crate) fn canonical_attr(&self, path: &AttrPath) -> AttrPath {
        let attribute = path.attribute();
        match self.nodes.get(&path.node_name()) {
            Some(node) => {
                let resolved = node.resolve_alias(&attribute);
                if resolved == attribute {
                    path.clone()
                } else {
                    AttrPath::attr(&path.node_name(), resolved).unwrap_or_else(|_| path.clone())
                }
            }
            None => path.clone(),
        }
    }

    /// True when publishing `published` grants write access to `wanted`.
    fn covers(&self, published: &AttrPath, wanted: &AttrPath) -> bool {
        let published = self.canonical_attr(published);
        if published.node_name() != wanted.node_name() {
            return false;
        }
        let (p, w) = (published.attribute(), wanted.attribute());
        if p == w {
            return true;
        }
        match (BuiltinAttr::parse(&w), BuiltinAttr::parse(&p)) {
            (Some(w), Some(p)) => w.covered_by(p),
            _ => false,
        }
    }

    // ----- container operations -----

    pub(crate) fn create_container_impl(&mut self, name: &str) -> Result<(), SceneError> {
        if self.is_taken(name) {
            return Err(SceneError::NameTaken(name.to_string()));
        }
        if let Some((namespace, _)) = rigkit_api_core::split_namespace(name) {
            if !self.namespaces.contains(namespace) {
                return Err(SceneError::NamespaceNotFound(namespace.to_string()));
            }
        }
        self.containers
            .insert(name.to_string(), Container::new(name));
        debug!("created container {name}");
        Ok(())
    }

    /// Unit-conversion nodes connected to `name` in either direction.
    pub(crate) fn attached_conversions(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        for (dst, src) in &self.connections {
            for (here, there) in [(dst, src), (src, dst)] {
                if here.node_name() != name {
                    continue;
                }
                let other = there.node_name();
                let is_conversion = self
                    .nodes
                    .get(&other)
                    .map(|n| n.kind == NodeKind::Utility(NodeType::UnitConversion))
                    .unwrap_or(false);
                if is_conversion && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    pub(crate) fn add_to_container_impl(
        &mut self,
        container: &str,
        names: &[String],
        include_hidden_branches: bool,
    ) -> Result<(), SceneError> {
        self.guard_container(container)?;
        let mut to_add: Vec<String> = Vec::new();
        for name in names {
            if !self.is_taken(name) {
                return Err(SceneError::NodeNotFound(name.clone()));
            }
            if name == container {
                continue;
            }
            to_add.push(name.clone());
            if include_hidden_branches {
                for descendant in self.descendants_of(name) {
                    if self.owner_of(&descendant).is_none() && !to_add.contains(&descendant) {
                        to_add.push(descendant);
                    }
                }
            }
        }
        let mut conversions = Vec::new();
        for name in &to_add {
            for conversion in self.attached_conversions(name) {
                if self.owner_of(&conversion).is_none()
                    && !to_add.contains(&conversion)
                    && !conversions.contains(&conversion)
                {
                    conversions.push(conversion);
                }
            }
        }
        to_add.extend(conversions);

        for name in &to_add {
            if let Some(owner) = self.owner_of(name).map(str::to_string) {
                if owner == container {
                    continue;
                }
                self.guard_container(&owner)?;
            }
        }
        for name in to_add {
            for c in self.containers.values_mut() {
                if c.name != container {
                    c.members.shift_remove(&name);
                }
            }
            if let Some(c) = self.containers.get_mut(container) {
                c.members.insert(name);
            }
        }
        Ok(())
    }

    pub(crate) fn remove_from_container_impl(
        &mut self,
        container: &str,
        name: &str,
    ) -> Result<(), SceneError> {
        self.guard_container(container)?;
        if let Some(c) = self.containers.get_mut(container) {
            c.members.shift_remove(name);
        }
        Ok(())
    }

    pub(crate) fn publish_impl(
        &mut self,
        container: &str,
        target: &AttrPath,
        alias: &str,
    ) -> Result<(), SceneError> {
        let c = self
            .containers
            .get(container)
            .ok_or_else(|| SceneError::ContainerNotFound(container.to_string()))?;
        if c.published.contains_key(alias) {
            return Err(SceneError::AliasTaken {
                container: container.to_string(),
                alias: alias.to_string(),
            });
        }
        let target_node = target.node_name();
        if self.containers.contains_key(&target_node) {
            self.resolve_alias_impl(&target_node, &target.attribute())?;
        } else {
            self.get_attr_impl(target)?;
        }
        if let Some(c) = self.containers.get_mut(container) {
            c.published.insert(alias.to_string(), target.clone());
        }
        debug!("published {target} as {container}.{alias}");
        Ok(())
    }

    pub(crate) fn unpublish_impl(&mut self, container: &str, alias: &str) -> Result<(), SceneError> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| SceneError::ContainerNotFound(container.to_string()))?;
        c.published
            .shift_remove(alias)
            .map(|_| ())
            .ok_or_else(|| SceneError::AliasNotFound {
                container: container.to_string(),
                alias: alias.to_string(),
            })
    }

    /// Follow an alias through nested containers to the node attribute it exposes.
    pub(crate) fn resolve_alias_impl(
        &self,
        container: &str,
        alias: &str,
    ) -> Result<AttrPath, SceneError> {
        let mut current_container = container.to_string();
        let mut current_alias = alias.to_string();
        for _ in 0..=self.containers.len() {
            let c = self
                .containers
                .get(&current_container)
                .ok_or_else(|| SceneError::ContainerNotFound(current_container.clone()))?;
            let target = c
                .published
                .get(&current_alias)
                .ok_or_else(|| SceneError::AliasNotFound {
                    container: current_container.clone(),
                    alias: current_alias.clone(),
                })?;
            let node = target.node_name();
            if self.containers.contains_key(&node) {
                current_container = node;
                current_alias = target.attribute();
            } else {
                return Ok(target.clone());
            }
        }
        Err(SceneError::AliasNotFound {
            container: container.to_string(),
            alias: alias.to_string(),
        })
    }

    pub(crate) fn set_container_locked_impl(
        &mut self,
        container: &str,
        locked: bool,
    ) -> Result<(), SceneError> {
        let c = self
            .containers
            .get_mut(container)
            .ok_or_else(|| SceneError::ContainerNotFound(container.to_string()))?;
        c.locked = locked;
        debug!(
            "{} container {container}",
            if locked { "locked" } else { "unlocked" }
        );
        Ok(())
    }

    /// Delete a container together with everything it owns.
    pub(crate) fn delete_container_impl(&mut self, container: &str) -> Result<(), SceneError> {
        self.guard_container(container)?;
        let members: Vec<String> = self
            .containers
            .get(container)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default();
        for member in members {
            if self.containers.contains_key(&member) {
                if let Some(c) = self.containers.get_mut(&member) {
                    c.locked = false;
                }
                self.delete_container_impl(&member)?;
            } else if self.nodes.contains_key(&member) {
                self.delete_node_unchecked(&member);
            }
        }
        self.containers.shift_remove(container);
        for c in self.containers.values_mut() {
            c.members.shift_remove(container);
            c.published
                .retain(|_, target| target.node_name() != container);
        }
        debug!("deleted container {container}");
        Ok(())
    }
}
