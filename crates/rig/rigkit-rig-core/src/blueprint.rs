//! Module blueprints: what a module type contributes on top of the shared install and lock
//! machinery.

use glam::DQuat;
use rigkit_api_core::{coercion, AttrPath};
use rigkit_scene_core::SceneHost;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainAxisSpec, JointDescriptor};
use crate::config::RigConfig;
use crate::controls;
use crate::error::RigError;
use crate::ids::{ControlId, JointId};
use crate::layout::ModuleLayout;
use crate::lock::JointOrientations;

pub trait ModuleBlueprint {
    /// Joints in chain order, root first.
    fn joints(&self) -> Vec<JointDescriptor>;

    /// Type-specific install steps, run after the shared controls and segments exist.
    fn install_custom(
        &self,
        _host: &mut dyn SceneHost,
        _layout: &ModuleLayout,
        _joints: &[JointId],
        _config: &RigConfig,
    ) -> Result<(), RigError> {
        Ok(())
    }

    /// Orientation data recorded when the module locks.
    fn lock_orientations(
        &self,
        _host: &dyn SceneHost,
        _joints: &[JointId],
    ) -> Result<JointOrientations, RigError> {
        Ok(JointOrientations::ChainAxis(ChainAxisSpec::default()))
    }

    fn records_preferred_angles(&self) -> bool {
        false
    }

    /// Whether the frozen root also blends `translate` and `scale`.
    fn root_transform(&self) -> bool {
        false
    }

    /// Whether every segment uses the first segment's pole anchor.
    fn shares_pole(&self) -> bool {
        false
    }
}

/// Two joints with a twist control on the segment.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleJointSegment;

impl ModuleBlueprint for SingleJointSegment {
    fn joints(&self) -> Vec<JointDescriptor> {
        vec![
            JointDescriptor::new("root_joint", [0.0, 0.0, 0.0]),
            JointDescriptor::new("end_joint", [4.0, 0.0, 0.0]),
        ]
    }

    fn install_custom(
        &self,
        host: &mut dyn SceneHost,
        layout: &ModuleLayout,
        joints: &[JointId],
        _config: &RigConfig,
    ) -> Result<(), RigError> {
        controls::create_orientation_control(host, layout, &joints[0], &joints[1])?;
        Ok(())
    }

    /// The root's world orientation with the orientation control's twist applied.
    fn lock_orientations(
        &self,
        host: &dyn SceneHost,
        joints: &[JointId],
    ) -> Result<JointOrientations, RigError> {
        let root = &joints[0];
        let control = ControlId::orientation(root.clone()).node();
        let twist = coercion::to_float(&host.get_attr(&AttrPath::attr(&control, "rotateX")?)?);
        let orientation =
            host.world_rotation(&root.node())? * DQuat::from_rotation_x(twist.to_radians());
        Ok(JointOrientations::Explicit(vec![orientation.normalize()]))
    }
}

/// Three joints bending at the middle one.
#[derive(Clone, Copy, Debug, Default)]
pub struct HingeJoint;

impl ModuleBlueprint for HingeJoint {
    fn joints(&self) -> Vec<JointDescriptor> {
        vec![
            JointDescriptor::new("root_joint", [0.0, 0.0, 0.0]),
            JointDescriptor::new("hinge_joint", [4.0, 0.0, -1.0]),
            JointDescriptor::new("end_joint", [8.0, 0.0, 0.0]),
        ]
    }

    fn records_preferred_angles(&self) -> bool {
        true
    }

    fn shares_pole(&self) -> bool {
        true
    }
}

/// A lone joint that also carries translation and scale once locked.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleJoint;

impl ModuleBlueprint for SingleJoint {
    fn joints(&self) -> Vec<JointDescriptor> {
        vec![JointDescriptor::new("joint", [0.0, 0.0, 0.0])]
    }

    fn root_transform(&self) -> bool {
        true
    }
}

/// A data-driven chain, for module types registered at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainBlueprint {
    pub joints: Vec<JointDescriptor>,
    #[serde(default)]
    pub axis: ChainAxisSpec,
    #[serde(default)]
    pub root_transform: bool,
    #[serde(default)]
    pub shares_pole: bool,
    #[serde(default)]
    pub preferred_angles: bool,
}

impl ChainBlueprint {
    pub fn new(joints: Vec<JointDescriptor>) -> Self {
        Self {
            joints,
            axis: ChainAxisSpec::default(),
            root_transform: false,
            shares_pole: false,
            preferred_angles: false,
        }
    }
}

impl ModuleBlueprint for ChainBlueprint {
    fn joints(&self) -> Vec<JointDescriptor> {
        self.joints.clone()
    }

    fn lock_orientations(
        &self,
        _host: &dyn SceneHost,
        _joints: &[JointId],
    ) -> Result<JointOrientations, RigError> {
        Ok(JointOrientations::ChainAxis(self.axis))
    }

    fn records_preferred_angles(&self) -> bool {
        self.preferred_angles
    }

    fn root_transform(&self) -> bool {
        self.root_transform
    }

    fn shares_pole(&self) -> bool {
        self.shares_pole
    }
}
