//! Point, parent, scale and pole-vector constraints.
//!
//! A constraint is a DAG child of the node it drives. Its driver is never stored directly: it is
//! whatever feeds the constraint's `target[0].*` plugs, so re-targeting a constraint is just a
//! matter of reconnecting those plugs.

use glam::{DMat4, DVec3};
use log::debug;
use rigkit_api_core::AttrPath;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::math::{decompose, EPSILON};
use crate::node::NodeKind;
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Point,
    Parent,
    Scale,
    PoleVector,
}

impl ConstraintKind {
    /// Suffix used for generated constraint names.
    pub fn suffix(&self) -> &'static str {
        match self {
            ConstraintKind::Point => "pointConstraint",
            ConstraintKind::Parent => "parentConstraint",
            ConstraintKind::Scale => "scaleConstraint",
            ConstraintKind::PoleVector => "poleVectorConstraint",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintOptions {
    /// Explicit node name; generated from the driven node otherwise.
    pub name: Option<String>,
    pub maintain_offset: bool,
    /// Axes (x, y, z) left untouched.
    pub skip: [bool; 3],
}

impl ConstraintOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn maintain_offset(mut self) -> Self {
        self.maintain_offset = true;
        self
    }

    pub fn skip_x(mut self) -> Self {
        self.skip[0] = true;
        self
    }
}

/// Driver attribute -> constraint plug. All four are connected together.
pub const TARGET_PLUGS: [(&str, &str); 4] = [
    ("parentMatrix", "target[0].targetParentMatrix"),
    ("translate", "target[0].targetTranslate"),
    ("rotatePivot", "target[0].targetRotatePivot"),
    ("rotatePivotTranslate", "target[0].targetRotatePivotTranslate"),
];

/// Plug whose source identifies the driver.
pub const DRIVER_PLUG: &str = "target[0].targetTranslate";

#[derive(Debug, Clone)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub driven: String,
    /// Point: world offset. Scale: per-axis ratio.
    pub offset_vec: DVec3,
    /// Parent: driven world relative to driver world at creation.
    pub offset_matrix: DMat4,
    pub skip: [bool; 3],
}

fn keep_skipped(target: DVec3, current: DVec3, skip: [bool; 3]) -> DVec3 {
    let mut out = target;
    for axis in 0..3 {
        if skip[axis] {
            out[axis] = current[axis];
        }
    }
    out
}

impl Scene {
    fn dag_node(&self, name: &str) -> Result<NodeKind, SceneError> {
        let kind = self.node(name)?.kind;
        if !kind.is_dag() {
            return Err(SceneError::WrongKind {
                node: name.to_string(),
                expected: "DAG node",
            });
        }
        Ok(kind)
    }

    fn constraint_name(&self, driven: &str, kind: ConstraintKind) -> String {
        let mut index = 1;
        loop {
            let candidate = format!("{driven}_{}{index}", kind.suffix());
            if !self.is_taken(&candidate) {
                return candidate;
            }
            index += 1;
        }
    }

    pub(crate) fn create_constraint_impl(
        &mut self,
        kind: ConstraintKind,
        driver: &str,
        driven: &str,
        options: &ConstraintOptions,
    ) -> Result<String, SceneError> {
        self.dag_node(driver)?;
        let driven_kind = self.dag_node(driven)?;
        if kind == ConstraintKind::PoleVector && driven_kind != NodeKind::IkHandle {
            return Err(SceneError::WrongKind {
                node: driven.to_string(),
                expected: "IK handle",
            });
        }
        self.guard_member(driven)?;
        let name = match &options.name {
            Some(name) => name.clone(),
            None => self.constraint_name(driven, kind),
        };
        self.check_new_name(&name)?;

        let driver_world = self.world_matrix(driver)?;
        let driven_world = self.world_matrix(driven)?;
        let (offset_vec, offset_matrix) = match kind {
            ConstraintKind::Point if options.maintain_offset => (
                driven_world.w_axis.truncate() - driver_world.w_axis.truncate(),
                DMat4::IDENTITY,
            ),
            ConstraintKind::Parent if options.maintain_offset => {
                (DVec3::ZERO, driver_world.inverse() * driven_world)
            }
            ConstraintKind::Scale if options.maintain_offset => {
                let driver_scale = decompose(&driver_world).0;
                let driven_scale = decompose(&driven_world).0;
                (
                    driven_scale / driver_scale.max(DVec3::splat(EPSILON)),
                    DMat4::IDENTITY,
                )
            }
            ConstraintKind::Scale => (DVec3::ONE, DMat4::IDENTITY),
            _ => (DVec3::ZERO, DMat4::IDENTITY),
        };

        self.create_node_impl(&name, NodeKind::Constraint(kind), Some(driven))?;
        self.constraints.insert(
            name.clone(),
            Constraint {
                kind,
                driven: driven.to_string(),
                offset_vec,
                offset_matrix,
                skip: options.skip,
            },
        );
        for (source, plug) in TARGET_PLUGS {
            self.connect_raw(AttrPath::attr(driver, source)?, AttrPath::attr(&name, plug)?);
        }
        debug!("{} {driver} -> {driven} as {name}", kind.suffix());
        Ok(name)
    }

    /// Node currently feeding the constraint's target plugs.
    pub(crate) fn constraint_driver_impl(&self, constraint: &str) -> Option<String> {
        let plug = AttrPath::attr(constraint, DRIVER_PLUG).ok()?;
        let source = self.connection_source_impl(&plug)?.node_name();
        self.nodes.contains_key(&source).then_some(source)
    }

    /// Pull every constrained node onto its driver; returns the largest change.
    pub(crate) fn solve_constraints(&mut self) -> Result<f64, SceneError> {
        let names: Vec<String> = self.constraints.keys().cloned().collect();
        let mut delta: f64 = 0.0;
        for name in names {
            let Some(driver) = self.constraint_driver_impl(&name) else {
                continue;
            };
            let Some(con) = self.constraints.get(&name).cloned() else {
                continue;
            };
            delta = delta.max(self.solve_constraint(&con, &driver)?);
        }
        Ok(delta)
    }

    fn solve_constraint(&mut self, con: &Constraint, driver: &str) -> Result<f64, SceneError> {
        let driver_world = self.world_matrix(driver)?;
        match con.kind {
            ConstraintKind::Point => {
                let target = driver_world.w_axis.truncate() + con.offset_vec;
                let current = self.world_position(&con.driven)?;
                self.put_world_position(&con.driven, keep_skipped(target, current, con.skip))
            }
            ConstraintKind::Parent => {
                let (_, rotation, translation) = decompose(&(driver_world * con.offset_matrix));
                let moved = self.put_world_position(&con.driven, translation)?;
                let turned = self.put_world_rotation(&con.driven, rotation)?;
                Ok(moved.max(turned))
            }
            ConstraintKind::Scale => {
                let wanted = decompose(&driver_world).0 * con.offset_vec;
                let parent_scale = decompose(&self.parent_world_matrix(&con.driven)?).0;
                let local = wanted / parent_scale.max(DVec3::splat(EPSILON));
                let node = self.node_mut(&con.driven)?;
                let local = keep_skipped(local, node.scale, con.skip);
                let delta = (local - node.scale).abs().max_element();
                node.scale = local;
                Ok(delta)
            }
            ConstraintKind::PoleVector => {
                let position = driver_world.w_axis.truncate();
                let Some(ik) = self.ik_handles.get_mut(&con.driven) else {
                    return Ok(0.0);
                };
                let delta = match ik.pole {
                    Some(pole) => (position - pole).abs().max_element(),
                    None => f64::INFINITY,
                };
                ik.pole = Some(position);
                Ok(delta)
            }
        }
    }
}
