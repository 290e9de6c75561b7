//! Locking: replacing a module's blueprint rig with frozen joints in three global phases.
//!
//! Phase 1 reads every module in the batch into a [`LockPhaseRecord`] without touching the
//! scene. Phase 2 destroys each blueprint rig and rebuilds its joints with creation-pose blend
//! networks. Phase 3 re-attaches hooks to the rebuilt joints and seals every boundary. A module
//! only enters phase 2 once every module in the batch has finished phase 1.

use glam::{DQuat, DVec3};
use hashbrown::HashSet;
use indexmap::IndexMap;
use log::{debug, info};
use rigkit_api_core::{coercion, AttrPath, Value};
use rigkit_graph_core::NodeType;
use rigkit_scene_core::{
    AttrUnit, ConstraintKind, ConstraintOptions, NodeKind, RotateOrder, SceneHost, UTILITY_OUTPUT,
};
use serde::{Deserialize, Serialize};

use crate::blueprint::ModuleBlueprint;
use crate::boundary::EncapsulationBoundary;
use crate::chain::{self, ChainAxisSpec, JointDescriptor};
use crate::config::RigConfig;
use crate::error::RigError;
use crate::hook;
use crate::ids::{ControlId, ModuleId};
use crate::layout::ModuleLayout;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Blueprint,
    Collected,
    Rebuilt,
    Locked,
}

/// Per-joint orientations, or a rule to derive them from the chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointOrientations {
    /// World orientations, root first; joints past the end keep the chain orientation.
    Explicit(Vec<DQuat>),
    ChainAxis(ChainAxisSpec),
}

/// Everything phase 2 and phase 3 need to know about one module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockPhaseRecord {
    pub module: ModuleId,
    /// Joint names inside the module namespace.
    pub joints: Vec<String>,
    pub positions: Vec<DVec3>,
    pub orientations: JointOrientations,
    pub rotation_orders: Vec<RotateOrder>,
    pub preferred_angles: Option<Vec<DVec3>>,
    /// Translation control the module was hooked to.
    pub hook_target: Option<String>,
    pub root_transform: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockReport {
    pub locked: Vec<ModuleId>,
    pub records: Vec<LockPhaseRecord>,
    /// Whether the scene settled after the final evaluation.
    pub settled: bool,
}

fn aborted(module: &ModuleId, reason: impl Into<String>) -> RigError {
    RigError::LockAborted {
        module: module.to_string(),
        reason: reason.into(),
    }
}

fn attr(node: &str, attribute: &str) -> Result<AttrPath, RigError> {
    Ok(AttrPath::attr(node, attribute)?)
}

fn vec3_attr(host: &dyn SceneHost, node: &str, attribute: &str) -> Result<DVec3, RigError> {
    Ok(DVec3::from_array(coercion::to_vec3(
        &host.get_attr(&attr(node, attribute)?)?,
    )))
}

/// Phase 1 for a single module. Read-only.
pub fn collect(
    host: &dyn SceneHost,
    module: &ModuleId,
    blueprint: &dyn ModuleBlueprint,
) -> Result<LockPhaseRecord, RigError> {
    let layout = ModuleLayout::new(module);
    let joints: Vec<_> = blueprint
        .joints()
        .into_iter()
        .map(|d| layout.joint(&d.name))
        .collect();
    let mut positions = Vec::with_capacity(joints.len());
    let mut rotation_orders = Vec::with_capacity(joints.len());
    for joint in &joints {
        let node = joint.node();
        positions.push(host.world_position(&node)?);
        let index = coercion::to_int(&host.get_attr(&attr(&node, "rotateOrder")?)?);
        rotation_orders.push(RotateOrder::from_index(index).unwrap_or_default());
    }
    let preferred_angles = if blueprint.records_preferred_angles() {
        let mut angles = Vec::with_capacity(joints.len());
        for joint in &joints {
            angles.push(vec3_attr(host, &joint.node(), "preferredAngle")?);
        }
        Some(angles)
    } else {
        None
    };
    Ok(LockPhaseRecord {
        module: module.clone(),
        orientations: blueprint.lock_orientations(host, &joints)?,
        joints: joints.into_iter().map(|j| j.name).collect(),
        positions,
        rotation_orders,
        preferred_angles,
        hook_target: hook::current_target(host, &layout),
        root_transform: blueprint.root_transform(),
    })
}

/// Refuse batches whose hooks cross the batch boundary in a way locking would break.
fn validate_batch(
    host: &dyn SceneHost,
    batch: &[(ModuleId, &dyn ModuleBlueprint)],
    states: &IndexMap<ModuleId, LockState>,
) -> Result<(), RigError> {
    let in_batch: HashSet<&ModuleId> = batch.iter().map(|(m, _)| m).collect();
    for (module, _) in batch {
        match states.get(module) {
            Some(LockState::Blueprint) => {}
            Some(_) => return Err(aborted(module, "module is already locked")),
            None => return Err(aborted(module, "module is not installed")),
        }
        let Some(target) = hook::current_target(host, &ModuleLayout::new(module)) else {
            continue;
        };
        let target_module = ModuleId::of_node(&target);
        let allowed = target_module.as_ref().is_some_and(|t| {
            in_batch.contains(t) || states.get(t) == Some(&LockState::Locked)
        });
        if !allowed {
            return Err(aborted(
                module,
                format!("hooked to {target}, which is neither in the batch nor locked"),
            ));
        }
    }
    for (module, state) in states {
        if *state != LockState::Blueprint || in_batch.contains(module) {
            continue;
        }
        let hooked = hook::current_target(host, &ModuleLayout::new(module))
            .and_then(|t| ModuleId::of_node(&t));
        if let Some(target) = hooked.filter(|t| in_batch.contains(t)) {
            return Err(aborted(
                module,
                format!("hooks into {target}, which is being locked"),
            ));
        }
    }
    Ok(())
}

fn capitalize(channel: &str) -> String {
    let mut chars = channel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `channel = anim * w + creation * (1 - w)` on a frozen joint; returns the utility nodes.
fn blend_channel(
    host: &mut dyn SceneHost,
    boundary: &EncapsulationBoundary,
    joint: &str,
    alias_base: &str,
    channel: &str,
    weight: &AttrPath,
    reverse: &str,
) -> Result<Vec<String>, RigError> {
    let unit = if channel == "rotate" {
        AttrUnit::Angular
    } else {
        AttrUnit::Linear
    };
    let creation = vec3_attr(host, joint, channel)?;
    let suffix = capitalize(channel);
    let anim = attr(joint, &format!("anim{suffix}"))?;
    host.add_attr(&anim, Value::Vec3(creation.to_array()), unit)?;
    boundary.publish(host, &anim, &format!("{alias_base}_anim{suffix}"))?;

    let creation_static = match unit {
        AttrUnit::Angular => DVec3::new(
            creation.x.to_radians(),
            creation.y.to_radians(),
            creation.z.to_radians(),
        ),
        AttrUnit::Linear => creation,
    };
    let anim_weight =
        host.create_utility(&format!("{joint}_anim{suffix}_weight"), NodeType::Multiply)?;
    host.connect_attr(&anim, &attr(&anim_weight, "in_0")?)?;
    host.connect_attr(weight, &attr(&anim_weight, "in_1")?)?;
    let creation_weight =
        host.create_utility(&format!("{joint}_creation{suffix}_weight"), NodeType::Multiply)?;
    host.set_attr(
        &attr(&creation_weight, "in_0")?,
        Value::Vec3(creation_static.to_array()),
    )?;
    host.connect_attr(&attr(reverse, UTILITY_OUTPUT)?, &attr(&creation_weight, "in_1")?)?;
    let blend = host.create_utility(&format!("{joint}_{channel}_blend"), NodeType::Add)?;
    host.connect_attr(&attr(&anim_weight, UTILITY_OUTPUT)?, &attr(&blend, "in_0")?)?;
    host.connect_attr(&attr(&creation_weight, UTILITY_OUTPUT)?, &attr(&blend, "in_1")?)?;
    host.connect_attr(&attr(&blend, UTILITY_OUTPUT)?, &attr(joint, channel)?)?;
    Ok(vec![anim_weight, creation_weight, blend])
}

/// Phase 2 for a single module: tear down the blueprint rig and build the frozen one.
pub fn rebuild(
    host: &mut dyn SceneHost,
    record: &LockPhaseRecord,
    config: &RigConfig,
) -> Result<(), RigError> {
    let layout = ModuleLayout::new(&record.module);
    let container = layout.container();
    if host.container_exists(&container) {
        host.set_container_locked(&container, false)?;
        host.delete_container(&container)?;
    }
    for node in host.list_nodes(Some(record.module.as_str())) {
        if host.exists(&node) {
            host.delete(&node)?;
        }
    }

    let module_grp = host.create_node(&layout.module_grp(), NodeKind::Transform, None)?;
    let hook_in = host.create_node(&layout.hook_in(), NodeKind::Transform, Some(&module_grp))?;
    let settings = host.create_node(&layout.settings(), NodeKind::Locator, Some(&module_grp))?;
    let descriptors: Vec<JointDescriptor> = record
        .joints
        .iter()
        .zip(&record.positions)
        .map(|(joint, position)| JointDescriptor {
            name: format!("blueprint_{joint}"),
            position: *position,
        })
        .collect();
    let frozen = chain::build(host, record.module.as_str(), &descriptors, Some(&hook_in))?;
    match &record.orientations {
        JointOrientations::Explicit(rotations) => {
            for (joint, rotation) in frozen.iter().zip(rotations) {
                host.orient_joint(joint, *rotation)?;
            }
        }
        JointOrientations::ChainAxis(spec) => chain::orient_chain(host, &frozen, *spec)?,
    }
    for (joint, order) in frozen.iter().zip(&record.rotation_orders) {
        host.set_attr(&attr(joint, "rotateOrder")?, Value::Int(order.index()))?;
    }
    if let Some(angles) = &record.preferred_angles {
        for (joint, angle) in frozen.iter().zip(angles) {
            host.set_attr(&attr(joint, "preferredAngle")?, Value::Vec3(angle.to_array()))?;
        }
    }

    let boundary = EncapsulationBoundary::create(host, &container)?;
    boundary.add_entities(host, &[module_grp], true)?;
    let weight = attr(&settings, "creationPoseWeight")?;
    host.add_attr(
        &attr(&settings, "activeModule")?,
        Value::tag("None"),
        AttrUnit::Linear,
    )?;
    host.add_attr(
        &weight,
        Value::Float(config.default_creation_pose_weight),
        AttrUnit::Linear,
    )?;
    boundary.publish(host, &attr(&settings, "activeModule")?, "activeModule")?;
    boundary.publish(host, &weight, "creationPoseWeight")?;
    boundary.publish(host, &attr(&hook_in, "scaleY")?, "hierarchicalScale")?;

    let reverse = host.create_utility(
        &layout.node("creationPoseWeight_reverse"),
        NodeType::Reverse,
    )?;
    host.connect_attr(&weight, &attr(&reverse, "in")?)?;
    let mut utilities = vec![reverse.clone()];
    for (i, (joint, short)) in frozen.iter().zip(&record.joints).enumerate() {
        let channels: &[&str] = match (i, record.root_transform) {
            (0, true) => &["rotate", "translate", "scale"],
            (0, false) => &[],
            _ => &["rotate"],
        };
        for channel in channels {
            utilities.extend(blend_channel(
                host, &boundary, joint, short, channel, &weight, &reverse,
            )?);
        }
    }
    boundary.add_entities(host, &utilities, false)?;
    debug!("rebuilt {} frozen joints for {}", frozen.len(), record.module);
    Ok(())
}

/// Phase 3 hook: follow the frozen joint that replaced the recorded target control.
fn attach_hook(host: &mut dyn SceneHost, record: &LockPhaseRecord) -> Result<(), RigError> {
    let Some(target) = &record.hook_target else {
        return Ok(());
    };
    let frozen = ControlId::parse(target)
        .map(|control| control.joint.frozen())
        .filter(|joint| host.exists(joint))
        .ok_or_else(|| aborted(&record.module, format!("no frozen joint replaces {target}")))?;
    let layout = ModuleLayout::new(&record.module);
    let hook_in = layout.hook_in();
    let parent = host.create_constraint(
        ConstraintKind::Parent,
        &frozen,
        &hook_in,
        &ConstraintOptions::named(format!("{hook_in}_parentConstraint")).maintain_offset(),
    )?;
    let scale = host.create_constraint(
        ConstraintKind::Scale,
        &frozen,
        &hook_in,
        &ConstraintOptions::named(format!("{hook_in}_scaleConstraint")).maintain_offset(),
    )?;
    EncapsulationBoundary::open(host, &layout.container())?.add_entities(
        host,
        &[parent, scale],
        false,
    )?;
    Ok(())
}

/// Lock `batch`, reporting every state change through `transition`.
///
/// Validation and phase 1 leave the scene untouched on failure. Later failures stop the batch
/// where it is; phase 2 is not undone.
pub fn lock_batch(
    host: &mut dyn SceneHost,
    batch: &[(ModuleId, &dyn ModuleBlueprint)],
    states: &IndexMap<ModuleId, LockState>,
    config: &RigConfig,
    mut transition: impl FnMut(&ModuleId, LockState),
) -> Result<LockReport, RigError> {
    validate_batch(host, batch, states)?;

    let mut records = Vec::with_capacity(batch.len());
    for (module, blueprint) in batch {
        let record =
            collect(host, module, *blueprint).map_err(|err| aborted(module, err.to_string()))?;
        records.push(record);
    }
    for record in &records {
        transition(&record.module, LockState::Collected);
    }
    info!("lock phase 1: collected {} modules", records.len());

    for record in records.iter_mut() {
        record.hook_target = hook::resolve_for_lock(host, &ModuleLayout::new(&record.module))
            .map_err(|err| aborted(&record.module, err.to_string()))?;
    }
    for record in &records {
        rebuild(host, record, config).map_err(|err| aborted(&record.module, err.to_string()))?;
        transition(&record.module, LockState::Rebuilt);
    }
    info!("lock phase 2: rebuilt {} modules", records.len());

    for record in &records {
        attach_hook(host, record).map_err(|err| match err {
            RigError::LockAborted { .. } => err,
            other => aborted(&record.module, other.to_string()),
        })?;
    }
    let report = host.evaluate()?;
    for record in &records {
        EncapsulationBoundary::open(host, &ModuleLayout::new(&record.module).container())?
            .lock(host)?;
        transition(&record.module, LockState::Locked);
    }
    info!("lock phase 3: locked {} modules", records.len());

    Ok(LockReport {
        locked: records.iter().map(|r| r.module.clone()).collect(),
        records,
        settled: report.settled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_channel_names() {
        assert_eq!(capitalize("rotate"), "Rotate");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn orientations_serialize_as_one_variant() {
        let explicit = JointOrientations::Explicit(vec![DQuat::IDENTITY]);
        let json = serde_json::to_value(&explicit).unwrap();
        assert!(json.get("explicit").is_some());
        let axis = JointOrientations::ChainAxis(ChainAxisSpec::default());
        let json = serde_json::to_value(&axis).unwrap();
        assert_eq!(json["chain_axis"]["aim"], "x");
    }
}
