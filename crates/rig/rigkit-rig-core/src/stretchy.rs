//! Stretchy IK: an IK solve whose joints lengthen to keep reaching their target.
//!
//! A dependency network measures the distance between two anchors, divides it by the chain's
//! rest length and scales every child joint's `translateX` by the result.

use glam::DVec3;
use log::debug;
use rigkit_api_core::{coercion, AttrPath, Value};
use rigkit_graph_core::NodeType;
use rigkit_scene_core::math::EPSILON;
use rigkit_scene_core::{ConstraintKind, ConstraintOptions, NodeKind, SceneHost, UTILITY_OUTPUT};

use crate::boundary::EncapsulationBoundary;
use crate::error::RigError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StretchyOptions {
    /// Existing pole anchor; one is synthesized above the root when absent.
    pub pole_vector: Option<String>,
    /// Offset of a synthesized pole anchor from the root joint.
    pub synthesized_pole_offset: DVec3,
    /// Clamp the scale factor at 1 so the chain never shrinks below rest length.
    pub lock_minimum_length: bool,
}

/// Nodes created by [`solve`].
#[derive(Clone, Debug, PartialEq)]
pub struct StretchyIk {
    pub ik_handle: String,
    pub ik_effector: String,
    pub root_anchor: String,
    pub end_anchor: String,
    pub pole_vector: String,
    /// True when `pole_vector` was created here.
    pub synthesized_pole: bool,
    pub original_length: f64,
    pub utilities: Vec<String>,
}

fn attr(node: &str, attribute: &str) -> Result<AttrPath, RigError> {
    Ok(AttrPath::attr(node, attribute)?)
}

fn output(node: &str) -> Result<AttrPath, RigError> {
    attr(node, UTILITY_OUTPUT)
}

/// Joints from `root` to `end` inclusive, walking parents up from `end`.
fn chain(host: &dyn SceneHost, root: &str, end: &str) -> Result<Vec<String>, RigError> {
    let mut joints = vec![end.to_string()];
    let mut cursor = host.parent_of(end);
    while joints.last().map(String::as_str) != Some(root) {
        match cursor {
            Some(joint) if host.node_kind(&joint) == Some(NodeKind::Joint) => {
                cursor = host.parent_of(&joint);
                joints.push(joint);
            }
            _ => {
                return Err(RigError::InvalidChain(format!(
                    "'{root}' is not a joint above '{end}'"
                )))
            }
        }
    }
    if joints.len() < 2 {
        return Err(RigError::InvalidChain(format!(
            "'{root}' and '{end}' are the same joint"
        )));
    }
    joints.reverse();
    Ok(joints)
}

pub fn solve(
    host: &mut dyn SceneHost,
    root: &str,
    end: &str,
    boundary: &EncapsulationBoundary,
    options: &StretchyOptions,
) -> Result<StretchyIk, RigError> {
    let joints = chain(host, root, end)?;
    let mut offsets = Vec::with_capacity(joints.len() - 1);
    for child in &joints[1..] {
        offsets.push(coercion::to_float(&host.get_attr(&attr(child, "translateX")?)?));
    }
    let original_length: f64 = offsets.iter().map(|o| o.abs()).sum();
    if original_length <= EPSILON {
        return Err(RigError::DegenerateChain {
            root: root.to_string(),
            end: end.to_string(),
        });
    }

    let ik_handle = format!("{root}_ikHandle");
    let ik_effector = format!("{root}_ikEffector");
    host.create_ik_handle(&ik_handle, &ik_effector, root, end)?;
    let root_position = host.world_position(root)?;

    let (pole_vector, synthesized_pole) = match &options.pole_vector {
        Some(pole) => (pole.clone(), false),
        None => {
            let pole = host.create_node(
                &format!("{ik_handle}_poleVectorLocator"),
                NodeKind::Locator,
                None,
            )?;
            host.set_world_position(&pole, root_position + options.synthesized_pole_offset)?;
            host.set_attr(&attr(&pole, "visibility")?, Value::Bool(false))?;
            (pole, true)
        }
    };
    host.create_constraint(
        ConstraintKind::PoleVector,
        &pole_vector,
        &ik_handle,
        &ConstraintOptions::named(format!("{ik_handle}_poleVectorConstraint")),
    )?;

    let root_anchor = host.create_node(&format!("{root}_rootPosLocator"), NodeKind::Locator, None)?;
    host.set_world_position(&root_anchor, root_position)?;
    host.create_constraint(
        ConstraintKind::Point,
        root,
        &root_anchor,
        &ConstraintOptions::named(format!("{root_anchor}_pointConstraint")),
    )?;
    let end_anchor = host.create_node(&format!("{end}_endPosLocator"), NodeKind::Locator, None)?;
    let handle_position = host.world_position(&ik_handle)?;
    host.set_world_position(&end_anchor, handle_position)?;
    host.create_constraint(
        ConstraintKind::Point,
        &end_anchor,
        &ik_handle,
        &ConstraintOptions::named(format!("{ik_handle}_pointConstraint")),
    )?;

    let mut utilities = Vec::new();
    let distance = host.create_utility(&format!("{root}_stretchDistance"), NodeType::DistanceBetween)?;
    host.connect_attr(&attr(&root_anchor, "worldPosition")?, &attr(&distance, "point1")?)?;
    host.connect_attr(&attr(&end_anchor, "worldPosition")?, &attr(&distance, "point2")?)?;
    let factor = host.create_utility(&format!("{root}_stretchFactor"), NodeType::Divide)?;
    host.connect_attr(&output(&distance)?, &attr(&factor, "lhs")?)?;
    host.set_attr(&attr(&factor, "rhs")?, Value::Float(original_length))?;
    utilities.push(distance);
    let mut scale = factor.clone();
    utilities.push(factor);
    if options.lock_minimum_length {
        let clamp = host.create_utility(&format!("{root}_stretchClamp"), NodeType::Max)?;
        host.connect_attr(&output(&scale)?, &attr(&clamp, "lhs")?)?;
        host.set_attr(&attr(&clamp, "rhs")?, Value::Float(1.0))?;
        scale = clamp.clone();
        utilities.push(clamp);
    }
    for (child, offset) in joints[1..].iter().zip(offsets) {
        let stretched = host.create_utility(&format!("{child}_stretchOffset"), NodeType::Multiply)?;
        host.connect_attr(&output(&scale)?, &attr(&stretched, "in_0")?)?;
        host.set_attr(&attr(&stretched, "in_1")?, Value::Float(offset))?;
        host.connect_attr(&output(&stretched)?, &attr(child, "translateX")?)?;
        utilities.push(stretched);
    }

    let mut owned = vec![
        ik_handle.clone(),
        ik_effector.clone(),
        root_anchor.clone(),
        end_anchor.clone(),
    ];
    if synthesized_pole {
        owned.push(pole_vector.clone());
    }
    owned.extend(utilities.iter().cloned());
    boundary.add_entities(host, &owned, true)?;
    debug!("stretchy ik {root} .. {end} (rest length {original_length})");

    Ok(StretchyIk {
        ik_handle,
        ik_effector,
        root_anchor,
        end_anchor,
        pole_vector,
        synthesized_pole,
        original_length,
        utilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{self, JointDescriptor};
    use rigkit_scene_core::Scene;

    fn rig(lock_minimum_length: bool) -> (Scene, StretchyIk) {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        let boundary = EncapsulationBoundary::create(&mut scene, "m:module_container").unwrap();
        chain::build(
            &mut scene,
            "m",
            &[
                JointDescriptor::new("root_joint", [0.0, 0.0, 0.0]),
                JointDescriptor::new("mid_joint", [2.0, 0.0, 0.0]),
                JointDescriptor::new("end_joint", [5.0, 0.0, 0.0]),
            ],
            None,
        )
        .unwrap();
        let options = StretchyOptions {
            synthesized_pole_offset: DVec3::new(0.0, 1.0, 0.0),
            lock_minimum_length,
            ..StretchyOptions::default()
        };
        let ik = solve(&mut scene, "m:root_joint", "m:end_joint", &boundary, &options).unwrap();
        (scene, ik)
    }

    fn tx(scene: &Scene, joint: &str) -> f64 {
        coercion::to_float(&scene.get_attr(&attr(joint, "translateX").unwrap()).unwrap())
    }

    #[test]
    fn rest_distance_keeps_offsets() {
        let (mut scene, ik) = rig(false);
        assert_eq!(ik.original_length, 5.0);
        assert!(ik.synthesized_pole);
        scene.evaluate().unwrap();
        assert!((tx(&scene, "m:mid_joint") - 2.0).abs() < 1e-9);
        assert!((tx(&scene, "m:end_joint") - 3.0).abs() < 1e-9);
    }

    #[test]
    fn offsets_scale_with_anchor_distance() {
        let (mut scene, ik) = rig(false);
        scene
            .set_world_position(&ik.end_anchor, DVec3::new(10.0, 0.0, 0.0))
            .unwrap();
        let report = scene.evaluate().unwrap();
        assert!(report.settled);
        assert!((tx(&scene, "m:mid_joint") - 4.0).abs() < 1e-6);
        assert!((tx(&scene, "m:end_joint") - 6.0).abs() < 1e-6);
        let end = scene.world_position("m:end_joint").unwrap();
        assert!((end - DVec3::new(10.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn minimum_length_clamps_compression() {
        let (mut scene, ik) = rig(true);
        scene
            .set_world_position(&ik.end_anchor, DVec3::new(2.5, 0.0, 0.0))
            .unwrap();
        scene.evaluate().unwrap();
        assert!((tx(&scene, "m:mid_joint") - 2.0).abs() < 1e-9);
        assert!((tx(&scene, "m:end_joint") - 3.0).abs() < 1e-9);
    }

    #[test]
    fn everything_joins_the_boundary() {
        let (scene, ik) = rig(false);
        for node in [&ik.ik_handle, &ik.root_anchor, &ik.pole_vector]
            .into_iter()
            .chain(ik.utilities.iter())
        {
            assert_eq!(scene.container_of(node).as_deref(), Some("m:module_container"));
        }
        assert_eq!(
            scene.container_of("m:root_joint_ikHandle_pointConstraint").as_deref(),
            Some("m:module_container")
        );
    }

    #[test]
    fn zero_length_chain_is_degenerate() {
        let mut scene = Scene::default();
        scene.add_namespace("m").unwrap();
        let boundary = EncapsulationBoundary::create(&mut scene, "box").unwrap();
        chain::build(
            &mut scene,
            "m",
            &[
                JointDescriptor::new("a", [1.0, 1.0, 1.0]),
                JointDescriptor::new("b", [1.0, 1.0, 1.0]),
            ],
            None,
        )
        .unwrap();
        assert_eq!(
            solve(&mut scene, "m:a", "m:b", &boundary, &StretchyOptions::default()),
            Err(RigError::DegenerateChain {
                root: "m:a".to_string(),
                end: "m:b".to_string()
            })
        );
        assert!(matches!(
            solve(&mut scene, "m:b", "m:a", &boundary, &StretchyOptions::default()),
            Err(RigError::InvalidChain(_))
        ));
    }
}
