//! Joint chains built from ordered `(name, position)` descriptors.

use glam::{DMat3, DQuat, DVec3};
use hashbrown::HashSet;
use log::debug;
use rigkit_scene_core::math::{aim_rotation, EPSILON};
use rigkit_scene_core::{NodeKind, SceneError, SceneHost};
use serde::{Deserialize, Serialize};

use crate::error::RigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointDescriptor {
    pub name: String,
    /// World position at creation.
    pub position: DVec3,
}

impl JointDescriptor {
    pub fn new(name: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            position: DVec3::from_array(position),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Which local axis aims down the chain and which one leans toward world up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAxisSpec {
    pub aim: Axis,
    pub up: Axis,
}

impl Default for ChainAxisSpec {
    /// `xyz` / `yup`.
    fn default() -> Self {
        Self {
            aim: Axis::X,
            up: Axis::Y,
        }
    }
}

impl ChainAxisSpec {
    /// World orientation of a joint aiming along `direction`.
    pub fn basis(&self, direction: DVec3) -> Result<DQuat, RigError> {
        if self.aim == self.up {
            return Err(RigError::InvalidChain(
                "aim and up axes must differ".to_string(),
            ));
        }
        let frame = aim_rotation(direction, DVec3::Y);
        let mut cols = [DVec3::ZERO; 3];
        cols[self.aim.index()] = frame * DVec3::X;
        cols[self.up.index()] = frame * DVec3::Y;
        let third = 3 - self.aim.index() - self.up.index();
        cols[third] = cols[(third + 1) % 3].cross(cols[(third + 2) % 3]);
        Ok(DQuat::from_mat3(&DMat3::from_cols(cols[0], cols[1], cols[2])).normalize())
    }
}

/// Create `{namespace}:{name}` joints, each parented to the previous one, then orient them.
///
/// Returns the full joint names, root first.
pub fn build(
    host: &mut dyn SceneHost,
    namespace: &str,
    descriptors: &[JointDescriptor],
    parent: Option<&str>,
) -> Result<Vec<String>, RigError> {
    if descriptors.is_empty() {
        return Err(RigError::InvalidChain("no joint descriptors".to_string()));
    }
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(RigError::InvalidChain(format!(
                "duplicate joint '{}'",
                descriptor.name
            )));
        }
        let full = format!("{namespace}:{}", descriptor.name);
        if host.exists(&full) {
            return Err(SceneError::NameTaken(full).into());
        }
        names.push(full);
    }

    let mut previous = parent.map(str::to_string);
    for (name, descriptor) in names.iter().zip(descriptors) {
        host.create_node(name, NodeKind::Joint, previous.as_deref())?;
        host.set_world_position(name, descriptor.position)?;
        previous = Some(name.clone());
    }
    orient_chain(host, &names, ChainAxisSpec::default())?;
    debug!("built joint chain {namespace}:{}", descriptors[0].name);
    Ok(names)
}

/// Orient every joint that has a successor so `spec.aim` points at it.
///
/// Children keep their world positions; the leaf is left alone.
pub fn orient_chain(
    host: &mut dyn SceneHost,
    joints: &[String],
    spec: ChainAxisSpec,
) -> Result<(), RigError> {
    for pair in joints.windows(2) {
        let direction = host.world_position(&pair[1])? - host.world_position(&pair[0])?;
        if direction.length_squared() < EPSILON {
            continue;
        }
        let rotation = spec.basis(direction)?;
        host.orient_joint(&pair[0], rotation)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigkit_api_core::{AttrPath, Value};
    use rigkit_scene_core::Scene;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    fn hinge() -> Vec<JointDescriptor> {
        vec![
            JointDescriptor::new("root_joint", [0.0, 0.0, 0.0]),
            JointDescriptor::new("hinge_joint", [4.0, 0.0, -1.0]),
            JointDescriptor::new("end_joint", [8.0, 0.0, 0.0]),
        ]
    }

    #[test]
    fn builds_parented_chain_at_descriptor_positions() {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        let joints = build(&mut scene, "m", &hinge(), None).unwrap();
        assert_eq!(joints, ["m:root_joint", "m:hinge_joint", "m:end_joint"]);
        assert_eq!(scene.parent_of("m:hinge_joint").as_deref(), Some("m:root_joint"));
        assert_eq!(scene.parent_of("m:end_joint").as_deref(), Some("m:hinge_joint"));
        for (joint, descriptor) in joints.iter().zip(hinge()) {
            assert!(close(scene.world_position(joint).unwrap(), descriptor.position));
        }
    }

    #[test]
    fn joints_aim_x_at_their_child() {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        let joints = build(&mut scene, "m", &hinge(), None).unwrap();
        for pair in joints.windows(2) {
            let x = scene.world_rotation(&pair[0]).unwrap() * DVec3::X;
            let to_child = (scene.world_position(&pair[1]).unwrap()
                - scene.world_position(&pair[0]).unwrap())
            .normalize();
            assert!(close(x, to_child));
            let child_tx = scene
                .get_attr(&AttrPath::attr(&pair[1], "translateX").unwrap())
                .unwrap();
            let Value::Float(tx) = child_tx else {
                panic!("translateX is a float");
            };
            assert!(tx > 0.0);
        }
        let leaf = AttrPath::attr(&joints[2], "jointOrient").unwrap();
        assert_eq!(scene.get_attr(&leaf).unwrap(), Value::vec3(0.0, 0.0, 0.0));
    }

    #[test]
    fn rejects_empty_and_duplicate_descriptors() {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        assert!(matches!(
            build(&mut scene, "m", &[], None),
            Err(RigError::InvalidChain(_))
        ));
        let twice = vec![
            JointDescriptor::new("a", [0.0, 0.0, 0.0]),
            JointDescriptor::new("a", [1.0, 0.0, 0.0]),
        ];
        assert!(matches!(
            build(&mut scene, "m", &twice, None),
            Err(RigError::InvalidChain(_))
        ));
        assert!(!scene.exists("m:a"));
    }

    #[test]
    fn single_joint_stays_unoriented() {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        let joints = build(
            &mut scene,
            "m",
            &[JointDescriptor::new("joint", [1.0, 2.0, 3.0])],
            None,
        )
        .unwrap();
        let rotation = scene.world_rotation(&joints[0]).unwrap();
        assert!(rotation.angle_between(DQuat::IDENTITY) < 1e-9);
    }

    #[test]
    fn axis_spec_permutes_basis() {
        let spec = ChainAxisSpec {
            aim: Axis::Y,
            up: Axis::Z,
        };
        let rotation = spec.basis(DVec3::X).unwrap();
        assert!(close(rotation * DVec3::Y, DVec3::X));
        assert!(close(rotation * DVec3::Z, DVec3::Y));
        assert!(close(rotation * DVec3::X, DVec3::Z));
        assert!(ChainAxisSpec {
            aim: Axis::X,
            up: Axis::X
        }
        .basis(DVec3::X)
        .is_err());
    }
}
