//! Groups: positional anchors that aggregate module transforms and other groups.

use glam::DVec3;
use log::{debug, info};
use rigkit_api_core::AttrPath;
use rigkit_scene_core::SceneHost;
use serde::{Deserialize, Serialize};

use crate::boundary::{self, EncapsulationBoundary};
use crate::controls;
use crate::error::RigError;
use crate::ids::ModuleId;
use crate::namespace;

pub const GROUP_PREFIX: &str = "Group__";
pub const GROUP_CONTAINER: &str = "Group_container";
pub const GROUP_TEMPLATE: &str = "group_control";

const MODULE_TRANSFORM_SUFFIX: &str = ":module_transform";
const GROUP_ALIASES: [(&str, &str); 3] = [
    ("translate", "_T"),
    ("rotate", "_R"),
    ("globalScale", "_globalScale"),
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    #[default]
    LastSelected,
    AveragePosition,
}

pub fn group_node(name: &str) -> String {
    format!("{GROUP_PREFIX}{name}")
}

pub fn is_group(host: &dyn SceneHost, node: &str) -> bool {
    node.starts_with(GROUP_PREFIX) && !node.contains(':') && host.exists(node)
}

fn is_groupable(host: &dyn SceneHost, node: &str) -> bool {
    is_group(host, node) || (node.ends_with(MODULE_TRANSFORM_SUFFIX) && host.exists(node))
}

/// Module containers owning any of `nodes`.
fn owning_containers(host: &dyn SceneHost, nodes: &[String]) -> Vec<String> {
    let mut containers: Vec<String> = Vec::new();
    for node in nodes {
        if let Some(container) = host.container_of(node) {
            if container != GROUP_CONTAINER && !containers.contains(&container) {
                containers.push(container);
            }
        }
    }
    containers
}

fn anchor_position(
    host: &dyn SceneHost,
    members: &[String],
    mode: AnchorMode,
) -> Result<DVec3, RigError> {
    match mode {
        AnchorMode::LastSelected => match members.last() {
            Some(last) => Ok(host.world_position(last)?),
            None => Err(RigError::EmptySelection),
        },
        AnchorMode::AveragePosition => {
            let mut sum = DVec3::ZERO;
            for member in members {
                sum += host.world_position(member)?;
            }
            Ok(sum / members.len().max(1) as f64)
        }
    }
}

/// Group the module transforms and groups in `selection` under a new `Group__{name}`.
///
/// Other selected nodes are ignored. Returns the group node.
pub fn group_selection(
    host: &mut dyn SceneHost,
    selection: &[String],
    mode: AnchorMode,
    name: &str,
) -> Result<String, RigError> {
    namespace::validate_name(name)?;
    let mut members: Vec<String> = Vec::new();
    for node in selection {
        if is_groupable(host, node) && !members.contains(node) {
            members.push(node.clone());
        }
    }
    if members.is_empty() {
        return Err(RigError::EmptySelection);
    }
    let group = group_node(name);
    if host.exists(&group) {
        return Err(RigError::NameConflict(group));
    }

    let parents: Vec<Option<String>> = members.iter().map(|m| host.parent_of(m)).collect();
    let shared_parent = match parents.first() {
        Some(Some(first)) if parents.iter().all(|p| p.as_ref() == Some(first)) => {
            Some(first.clone()).filter(|p| is_group(host, p))
        }
        _ => None,
    };
    let position = anchor_position(host, &members, mode)?;

    let imported = host.import_template(GROUP_TEMPLATE, &format!("{group}__"))?;
    let root = imported.require_root()?.to_string();
    host.rename(&root, &group)?;
    if let Some(parent) = &shared_parent {
        host.parent(&group, Some(parent), false)?;
    }
    host.set_world_position(&group, position)?;
    controls::uniform_scale(host, &group)?;

    let container = if host.container_exists(GROUP_CONTAINER) {
        EncapsulationBoundary::open(host, GROUP_CONTAINER)?
    } else {
        EncapsulationBoundary::create(host, GROUP_CONTAINER)?
    };
    container.add_entities(host, std::slice::from_ref(&group), false)?;
    for (attribute, suffix) in GROUP_ALIASES {
        container.publish(
            host,
            &AttrPath::attr(&group, attribute)?,
            &format!("{group}{suffix}"),
        )?;
    }

    let locked = owning_containers(host, &members);
    {
        let mut guard = boundary::unlock_all(host, &locked)?;
        for member in &members {
            guard.parent(member, Some(&group), true)?;
        }
    }
    info!("grouped {} entities under {group}", members.len());
    Ok(group)
}

/// Unpublish `group`'s aliases and delete it.
fn remove_group(host: &mut dyn SceneHost, group: &str) -> Result<(), RigError> {
    if host.container_exists(GROUP_CONTAINER) {
        let published: Vec<String> = host
            .published(GROUP_CONTAINER)
            .into_iter()
            .filter(|(_, path)| path.node_name() == group)
            .map(|(alias, _)| alias)
            .collect();
        for alias in published {
            host.unpublish(GROUP_CONTAINER, &alias)?;
        }
    }
    host.delete(group)?;
    debug!("deleted group {group}");
    Ok(())
}

/// Drop `Group_container` once it no longer owns a group.
fn drop_container_if_unused(host: &mut dyn SceneHost) -> Result<(), RigError> {
    if !host.container_exists(GROUP_CONTAINER) {
        return Ok(());
    }
    let members = host.container_members(GROUP_CONTAINER);
    if !members.iter().any(|m| is_group(host, m)) {
        host.delete_container(GROUP_CONTAINER)?;
        debug!("deleted {GROUP_CONTAINER}");
    }
    Ok(())
}

/// Delete `start` and its ancestors while they are empty groups.
fn prune_upward(host: &mut dyn SceneHost, start: Option<String>) -> Result<(), RigError> {
    let mut cursor = start;
    while let Some(group) = cursor.filter(|g| is_group(host, g)) {
        if !host.children(&group).is_empty() {
            break;
        }
        cursor = host.parent_of(&group);
        remove_group(host, &group)?;
    }
    Ok(())
}

/// Dissolve each group in `groups`; members move to the group's former parent.
pub fn ungroup(host: &mut dyn SceneHost, groups: &[String]) -> Result<(), RigError> {
    for group in groups {
        if !is_group(host, group) {
            return Err(RigError::GroupNotFound(group.clone()));
        }
    }
    for group in groups {
        // an earlier entry may have pruned this one
        if !host.exists(group) {
            continue;
        }
        let parent = host.parent_of(group);
        let children = host.children(group);
        let locked = owning_containers(host, &children);
        {
            let mut guard = boundary::unlock_all(host, &locked)?;
            for child in &children {
                guard.parent(child, parent.as_deref(), true)?;
            }
        }
        remove_group(host, group)?;
        prune_upward(host, parent)?;
        info!("ungrouped {group}");
    }
    drop_container_if_unused(host)
}

/// Delete every group left without members, innermost first.
pub fn prune_empty_groups(host: &mut dyn SceneHost) -> Result<(), RigError> {
    let empty: Vec<String> = host
        .list_nodes(None)
        .into_iter()
        .filter(|n| is_group(host, n) && host.children(n).is_empty())
        .collect();
    for group in empty {
        if host.exists(&group) {
            let parent = host.parent_of(&group);
            remove_group(host, &group)?;
            prune_upward(host, parent)?;
        }
    }
    drop_container_if_unused(host)
}

/// Every module below `group`, nested groups included.
pub fn find_sub_modules(host: &dyn SceneHost, group: &str) -> Result<Vec<ModuleId>, RigError> {
    if !is_group(host, group) {
        return Err(RigError::GroupNotFound(group.to_string()));
    }
    Ok(host
        .descendants(group)
        .iter()
        .filter(|n| n.ends_with(MODULE_TRANSFORM_SUFFIX))
        .filter_map(|n| ModuleId::of_node(n))
        .collect())
}
