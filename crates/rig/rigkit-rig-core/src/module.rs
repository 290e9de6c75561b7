//! Installing a module: the blueprint rig animators shape before locking.

use log::{info, warn};
use rigkit_api_core::{AttrPath, Value};
use rigkit_scene_core::{ConstraintKind, ConstraintOptions, NodeKind, SceneHost};
use serde::{Deserialize, Serialize};

use crate::blueprint::ModuleBlueprint;
use crate::boundary::EncapsulationBoundary;
use crate::chain;
use crate::config::RigConfig;
use crate::controls;
use crate::error::RigError;
use crate::hook;
use crate::ids::{ControlId, JointId, ModuleId};
use crate::layout::ModuleLayout;
use crate::namespace::NamespaceRegistry;
use crate::stretchy::{self, StretchyOptions};

/// Result of a successful install.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledModule {
    pub module: ModuleId,
    pub joints: Vec<JointId>,
    pub controls: Vec<ControlId>,
    /// Hook target in effect after install; `None` when hooked to the default.
    pub hook_target: Option<String>,
}

/// Install a module of `type_id` named `name`.
///
/// On failure everything created so far is removed and the name is released.
pub fn install(
    host: &mut dyn SceneHost,
    registry: &mut NamespaceRegistry,
    blueprint: &dyn ModuleBlueprint,
    type_id: &str,
    name: &str,
    hook_target: Option<&str>,
    config: &RigConfig,
) -> Result<InstalledModule, RigError> {
    let module = registry.allocate(host, type_id, name)?;
    match build(host, blueprint, &module, hook_target, config) {
        Ok(installed) => {
            info!("installed {module}");
            Ok(installed)
        }
        Err(err) => {
            if let Err(cleanup) = registry.release(host, &module) {
                warn!("failed to clean up {module} after aborted install: {cleanup}");
            }
            Err(err)
        }
    }
}

fn hide(host: &mut dyn SceneHost, node: &str) -> Result<(), RigError> {
    host.set_attr(&AttrPath::attr(node, "visibility")?, Value::Bool(false))?;
    Ok(())
}

fn build(
    host: &mut dyn SceneHost,
    blueprint: &dyn ModuleBlueprint,
    module: &ModuleId,
    hook_target: Option<&str>,
    config: &RigConfig,
) -> Result<InstalledModule, RigError> {
    let layout = ModuleLayout::new(module);
    let boundary = EncapsulationBoundary::create(host, &layout.container())?;
    let module_grp = host.create_node(&layout.module_grp(), NodeKind::Transform, None)?;
    for grp in [
        layout.joints_grp(),
        layout.hierarchy_grp(),
        layout.orientation_grp(),
    ] {
        host.create_node(&grp, NodeKind::Transform, Some(&module_grp))?;
    }
    boundary.add_entities(host, &[module_grp], true)?;

    let descriptors = blueprint.joints();
    let names = chain::build(
        host,
        module.as_str(),
        &descriptors,
        Some(&layout.joints_grp()),
    )?;
    boundary.add_entities(host, &names, false)?;
    let joints: Vec<JointId> = descriptors.iter().map(|d| layout.joint(&d.name)).collect();
    for joint in &joints {
        hide(host, &joint.node())?;
        controls::publish_joint(host, &layout, joint)?;
    }

    controls::create_module_transform(host, &layout, descriptors[0].position)?;
    let translation_controls = joints
        .iter()
        .map(|joint| controls::create_translation_control(host, &layout, joint))
        .collect::<Result<Vec<_>, _>>()?;
    let root = joints[0].node();
    let root_constraint = host.create_constraint(
        ConstraintKind::Point,
        &translation_controls[0].node(),
        &root,
        &ConstraintOptions::named(format!("{root}_pointConstraint")),
    )?;
    boundary.add_entities(host, &[root_constraint], false)?;

    let mut shared_pole: Option<String> = None;
    for i in 0..joints.len().saturating_sub(1) {
        let pole = match (&shared_pole, blueprint.shares_pole()) {
            (Some(pole), true) => pole.clone(),
            _ => {
                let pole = create_pole_anchor(
                    host,
                    &layout,
                    &boundary,
                    &translation_controls[i],
                    config,
                )?;
                shared_pole = Some(pole.clone());
                pole
            }
        };
        setup_segment(
            host,
            &layout,
            &boundary,
            (&joints[i], &joints[i + 1]),
            &translation_controls[i + 1],
            pole,
            config,
        )?;
    }

    blueprint.install_custom(host, &layout, &joints, config)?;
    let hook_target = hook::initialize(
        host,
        &layout,
        &translation_controls[0].node(),
        hook_target,
        config,
    )?;
    host.evaluate()?;
    boundary.lock(host)?;
    Ok(InstalledModule {
        module: module.clone(),
        joints,
        controls: translation_controls,
        hook_target,
    })
}

/// Pole anchor riding the segment's parent control at `segment_pole_offset`.
fn create_pole_anchor(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    boundary: &EncapsulationBoundary,
    parent_control: &ControlId,
    config: &RigConfig,
) -> Result<String, RigError> {
    let pole = format!("{}_poleVectorLocator", parent_control.node());
    let grp = host.create_node(
        &format!("{pole}_parentConstraintGrp"),
        NodeKind::Transform,
        Some(&layout.module_grp()),
    )?;
    host.create_node(&pole, NodeKind::Locator, Some(&grp))?;
    host.set_attr(
        &AttrPath::attr(&pole, "translate")?,
        Value::Vec3(config.segment_pole_offset.to_array()),
    )?;
    hide(host, &pole)?;
    host.create_constraint(
        ConstraintKind::Parent,
        &parent_control.node(),
        &grp,
        &ConstraintOptions::default(),
    )?;
    boundary.add_entities(host, &[grp], true)?;
    Ok(pole)
}

/// Stretchy IK between two joints, its end anchor following the child's control.
fn setup_segment(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    boundary: &EncapsulationBoundary,
    (parent, child): (&JointId, &JointId),
    child_control: &ControlId,
    pole: String,
    config: &RigConfig,
) -> Result<(), RigError> {
    let ik = stretchy::solve(
        host,
        &parent.node(),
        &child.node(),
        boundary,
        &StretchyOptions {
            pole_vector: Some(pole),
            synthesized_pole_offset: config.synthesized_pole_offset,
            lock_minimum_length: config.lock_minimum_length,
        },
    )?;
    let follow = host.create_constraint(
        ConstraintKind::Point,
        &child_control.node(),
        &ik.end_anchor,
        &ConstraintOptions::named(format!("{}_pointConstraint", ik.end_anchor)),
    )?;
    boundary.add_entities(host, &[follow], false)?;
    for node in [&ik.ik_handle, &ik.root_anchor, &ik.end_anchor] {
        host.parent(node, Some(&layout.joints_grp()), true)?;
        hide(host, node)?;
    }
    controls::create_hierarchy_representation(host, layout, parent, child)?;
    Ok(())
}
