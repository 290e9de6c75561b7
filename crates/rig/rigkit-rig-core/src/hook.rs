//! Hooks: each module's root follows a control of another module.
//!
//! The hook is a two-joint stretchy chain from the module's root control to its target. The
//! target is never stored; it is whatever drives the `hook_pointConstraint` plugs, and the
//! default target is the module's own `unhookedTarget` locator.

use hashbrown::HashSet;
use log::{info, warn};
use rigkit_api_core::{AttrPath, Value};
use rigkit_scene_core::{ConstraintKind, ConstraintOptions, NodeKind, SceneHost, TARGET_PLUGS};
use serde::{Deserialize, Serialize};

use crate::boundary::EncapsulationBoundary;
use crate::chain::{self, JointDescriptor};
use crate::config::RigConfig;
use crate::controls;
use crate::error::RigError;
use crate::ids::{ControlId, ControlKind, ModuleId};
use crate::layout::ModuleLayout;
use crate::stretchy::{self, StretchyOptions};

const HOOK_ROOT: &str = "hook_root_joint";
const HOOK_TARGET: &str = "hook_target_joint";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HookOutcome {
    /// The module already follows the requested target.
    Unchanged,
    /// `target` is `None` for the module's internal default.
    Rehooked { target: Option<String> },
    Rejected { reason: String },
}

/// The external control the module follows, or `None` for its internal default.
pub fn current_target(host: &dyn SceneHost, layout: &ModuleLayout) -> Option<String> {
    host.constraint_driver(&layout.hook_constraint())
        .filter(|driver| *driver != layout.unhooked_target())
}

/// Check that `target` is an existing translation control of another module that does not
/// hook back into `layout`'s module.
pub fn validate_target(
    host: &dyn SceneHost,
    layout: &ModuleLayout,
    target: &str,
) -> Result<ControlId, RigError> {
    let invalid = |reason: String| RigError::InvalidHookTarget {
        target: target.to_string(),
        reason,
    };
    let control = ControlId::parse(target)
        .filter(|c| c.kind == ControlKind::Translation)
        .ok_or_else(|| invalid("not a module translation control".to_string()))?;
    if !host.exists(target) {
        return Err(invalid("no such control".to_string()));
    }
    let own = &layout.module;
    if control.joint.module == *own {
        return Err(invalid("control belongs to the module being hooked".to_string()));
    }
    let mut visited: HashSet<ModuleId> = HashSet::new();
    let mut module = control.joint.module.clone();
    while visited.insert(module.clone()) {
        let Some(next) = current_target(host, &ModuleLayout::new(&module))
            .and_then(|t| ModuleId::of_node(&t))
        else {
            break;
        };
        if next == *own {
            return Err(invalid(format!("{module} already hooks into {own}")));
        }
        module = next;
    }
    Ok(control)
}

fn retarget(host: &mut dyn SceneHost, constraint: &str, driver: &str) -> Result<(), RigError> {
    for (source, plug) in TARGET_PLUGS {
        host.connect_attr(
            &AttrPath::attr(driver, source)?,
            &AttrPath::attr(constraint, plug)?,
        )?;
    }
    Ok(())
}

/// Build the module's hook chain from `root_control` and attach it to `target`.
///
/// An invalid target is downgraded to the internal default. Returns the target in effect.
pub fn initialize(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    root_control: &str,
    target: Option<&str>,
    config: &RigConfig,
) -> Result<Option<String>, RigError> {
    let boundary = EncapsulationBoundary::open(host, &layout.container())?;
    let root_position = host.world_position(root_control)?;
    let unhooked = host.create_node(&layout.unhooked_target(), NodeKind::Locator, None)?;
    host.set_world_position(&unhooked, root_position + config.hook_anchor_offset)?;
    host.set_attr(&AttrPath::attr(&unhooked, "visibility")?, Value::Bool(false))?;
    host.create_constraint(
        ConstraintKind::Point,
        root_control,
        &unhooked,
        &ConstraintOptions::named(format!("{unhooked}_pointConstraint")).maintain_offset(),
    )?;

    let hook_grp = host.create_node(
        &layout.hook_grp(),
        NodeKind::Transform,
        Some(&layout.module_grp()),
    )?;
    let joints = chain::build(
        host,
        layout.module.as_str(),
        &[
            JointDescriptor {
                name: HOOK_ROOT.to_string(),
                position: root_position,
            },
            JointDescriptor {
                name: HOOK_TARGET.to_string(),
                position: root_position + config.hook_anchor_offset,
            },
        ],
        Some(&hook_grp),
    )?;
    boundary.add_entities(host, &[unhooked.clone(), hook_grp.clone()], true)?;

    let ik = stretchy::solve(
        host,
        &joints[0],
        &joints[1],
        &boundary,
        &StretchyOptions {
            pole_vector: None,
            synthesized_pole_offset: config.synthesized_pole_offset,
            lock_minimum_length: false,
        },
    )?;
    let root_constraint = host.create_constraint(
        ConstraintKind::Point,
        root_control,
        &joints[0],
        &ConstraintOptions::named(layout.node("hook_root_pointConstraint")),
    )?;
    let hook_constraint = host.create_constraint(
        ConstraintKind::Point,
        &unhooked,
        &ik.end_anchor,
        &ConstraintOptions::named(layout.hook_constraint()),
    )?;
    boundary.add_entities(host, &[root_constraint, hook_constraint.clone()], false)?;
    for node in [&ik.ik_handle, &ik.root_anchor, &ik.end_anchor, &ik.pole_vector] {
        host.parent(node, Some(&hook_grp), true)?;
    }
    for node in joints.iter().chain([&ik.ik_handle, &ik.root_anchor, &ik.end_anchor]) {
        host.set_attr(&AttrPath::attr(node, "visibility")?, Value::Bool(false))?;
    }
    controls::create_hierarchy_representation(
        host,
        layout,
        &layout.joint(HOOK_ROOT),
        &layout.joint(HOOK_TARGET),
    )?;

    let Some(target) = target else {
        return Ok(None);
    };
    match validate_target(host, layout, target) {
        Ok(_) => {
            retarget(host, &hook_constraint, target)?;
            Ok(Some(target.to_string()))
        }
        Err(err) => {
            warn!("{}: {err}; using the default hook", layout.module);
            Ok(None)
        }
    }
}

/// Point the hook at `target`, or back at the default when `None`.
///
/// Invalid targets are rejected and the previous hook stays in place.
pub fn rehook(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
    target: Option<&str>,
) -> Result<HookOutcome, RigError> {
    let driver = match target {
        Some(target) => match validate_target(host, layout, target) {
            Ok(_) => target.to_string(),
            Err(err) => {
                warn!("{}: rehook rejected: {err}", layout.module);
                return Ok(HookOutcome::Rejected {
                    reason: err.to_string(),
                });
            }
        },
        None => layout.unhooked_target(),
    };
    let constraint = layout.hook_constraint();
    if host.constraint_driver(&constraint).as_deref() == Some(driver.as_str()) {
        return Ok(HookOutcome::Unchanged);
    }
    let boundary = EncapsulationBoundary::open(host, &layout.container())?;
    {
        let mut guard = boundary.unlocked(host)?;
        retarget(&mut *guard, &constraint, &driver)?;
    }
    info!("{} hooked to {driver}", layout.module);
    Ok(HookOutcome::Rehooked {
        target: target.map(str::to_string),
    })
}

/// The external target carried through a lock. The live hook is reduced to the default.
pub fn resolve_for_lock(
    host: &mut dyn SceneHost,
    layout: &ModuleLayout,
) -> Result<Option<String>, RigError> {
    let target = current_target(host, layout);
    if target.is_some() {
        rehook(host, layout, None)?;
    }
    Ok(target)
}
