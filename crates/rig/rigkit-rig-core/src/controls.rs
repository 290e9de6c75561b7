//! User-facing controls and the stretchy display objects that ride the joints.
//!
//! Every control is a template instance with its own boundary. The channel an animator may
//! touch is published on that boundary and re-published under the same alias on the module
//! boundary, so it stays writable once the module locks.

use glam::DVec3;
use log::debug;
use rigkit_api_core::AttrPath;
use rigkit_scene_core::{ConstraintKind, ConstraintOptions, NodeKind, SceneHost};

use crate::boundary::EncapsulationBoundary;
use crate::error::RigError;
use crate::ids::{ControlId, JointId};
use crate::layout::ModuleLayout;

pub const TRANSLATION_TEMPLATE: &str = "translation_control";
pub const ORIENTATION_TEMPLATE: &str = "orientation_control";
pub const HIERARCHY_TEMPLATE: &str = "hierarchy_representation";
pub const MODULE_TRANSFORM_TEMPLATE: &str = "controlGroup_control";

/// A template object stretched between two joints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StretchyObject {
    pub container: String,
    pub object: String,
    /// Group parent-constrained to the parent joint; its X scale follows the child's offset.
    pub constrained_grp: String,
}

fn module_boundary(
    host: &dyn SceneHost,
    layout: &ModuleLayout,
) -> Result<EncapsulationBoundary, RigError> {
    EncapsulationBoundary::open(host, &layout.container())
}

fn attr(node: &str, attribute: &str) -> Result<AttrPath, RigError> {
    Ok(AttrPath::attr(node, attribute)?)
}

/// Scale `node` uniformly from `scaleY`, exposed as `globalScale`.
pub(crate) fn uniform_scale(host: &mut dyn SceneHost, node: &str) -> Result<(), RigError> {
    let scale_y = attr(node, "scaleY")?;
    host.connect_attr(&scale_y, &attr(node, "scaleX")?)?;
    host.connect_attr(&scale_y, &attr(node, "scaleZ")?)?;
    host.alias_attr(node, "globalScale", "scaleY")?;
    Ok(())
}

/// The module's positional anchor, parent of every translation control.
pub fn create_module_transform(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    position: DVec3,
) -> Result<String, RigError> {
    let imported = host.import_template(MODULE_TRANSFORM_TEMPLATE, &layout.node(""))?;
    let name = layout.module_transform();
    let root = imported.require_root()?.to_string();
    host.rename(&root, &name)?;
    host.set_world_position(&name, position)?;
    uniform_scale(host, &name)?;

    let boundary = module_boundary(host, layout)?;
    boundary.add_entities(host, &[name.clone()], true)?;
    for (attribute, alias) in [
        ("translate", "moduleTransform_T"),
        ("rotate", "moduleTransform_R"),
        ("globalScale", "moduleTransform_globalScale"),
    ] {
        boundary.publish(host, &attr(&name, attribute)?, alias)?;
    }
    Ok(name)
}

/// Publish a joint's `rotate` and `rotateOrder` on the module boundary.
pub fn publish_joint(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    joint: &JointId,
) -> Result<(), RigError> {
    let boundary = module_boundary(host, layout)?;
    let node = joint.node();
    boundary.publish(host, &attr(&node, "rotate")?, &format!("{}_R", joint.name))?;
    boundary.publish(
        host,
        &attr(&node, "rotateOrder")?,
        &format!("{}_rotateOrder", joint.name),
    )?;
    Ok(())
}

pub fn create_translation_control(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    joint: &JointId,
) -> Result<ControlId, RigError> {
    let control = ControlId::translation(joint.clone());
    let node = control.node();
    host.import_template(TRANSLATION_TEMPLATE, &format!("{}_", joint.node()))?;
    host.parent(&node, Some(&layout.module_transform()), true)?;
    let position = host.world_position(&joint.node())?;
    host.set_world_position(&node, position)?;

    let inner = EncapsulationBoundary::open(host, &control.container())?;
    let published = inner.publish(host, &attr(&node, "translate")?, &control.alias())?;
    let boundary = module_boundary(host, layout)?;
    boundary.add_entities(host, &[control.container()], false)?;
    boundary.republish(host, &published)?;
    debug!("translation control {node}");
    Ok(control)
}

/// Instantiate `template` between `parent` and `child`.
///
/// The object's group is parent-constrained to `parent`, takes X scale from the child's
/// `translateX` and Y/Z scale from the module transform.
pub fn create_stretchy_object(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    template: &str,
    parent: &JointId,
    child: &JointId,
) -> Result<StretchyObject, RigError> {
    let imported = host.import_template(template, &format!("{}_", parent.node()))?;
    let object = imported.require_root()?.to_string();
    let container = imported.require_container()?.to_string();

    let constrained_grp = host.create_node(
        &format!("{object}_parentConstraint_grp"),
        NodeKind::Transform,
        None,
    )?;
    host.parent(&object, Some(&constrained_grp), true)?;
    host.create_constraint(
        ConstraintKind::Parent,
        &parent.node(),
        &constrained_grp,
        &ConstraintOptions::default(),
    )?;
    host.connect_attr(
        &attr(&child.node(), "translateX")?,
        &attr(&constrained_grp, "scaleX")?,
    )?;
    host.create_constraint(
        ConstraintKind::Scale,
        &layout.module_transform(),
        &constrained_grp,
        &ConstraintOptions::default().skip_x(),
    )?;

    let inner = EncapsulationBoundary::open(host, &container)?;
    inner.add_entities(host, &[constrained_grp.clone()], true)?;
    module_boundary(host, layout)?.add_entities(host, &[container.clone()], false)?;
    Ok(StretchyObject {
        container,
        object,
        constrained_grp,
    })
}

/// The visual link drawn for a segment without an orientation control.
pub fn create_hierarchy_representation(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    parent: &JointId,
    child: &JointId,
) -> Result<StretchyObject, RigError> {
    let object = create_stretchy_object(host, layout, HIERARCHY_TEMPLATE, parent, child)?;
    host.parent(&object.constrained_grp, Some(&layout.hierarchy_grp()), true)?;
    Ok(object)
}

/// Control for the twist of `parent` about the segment axis, replacing its hierarchy
/// representation.
pub fn create_orientation_control(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    parent: &JointId,
    child: &JointId,
) -> Result<ControlId, RigError> {
    let representation = format!("{}_{HIERARCHY_TEMPLATE}_container", parent.node());
    if host.container_exists(&representation) {
        host.delete_container(&representation)?;
    }
    let object = create_stretchy_object(host, layout, ORIENTATION_TEMPLATE, parent, child)?;
    host.parent(&object.constrained_grp, Some(&layout.orientation_grp()), true)?;

    let control = ControlId::orientation(parent.clone());
    let inner = EncapsulationBoundary::open(host, &object.container)?;
    let published = inner.publish(host, &attr(&object.object, "rotateX")?, &control.alias())?;
    module_boundary(host, layout)?.republish(host, &published)?;
    debug!("orientation control {}", object.object);
    Ok(control)
}
