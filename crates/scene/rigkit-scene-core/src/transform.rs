//! World-space transform queries and setters.

use glam::{DMat4, DQuat, DVec3};
use rigkit_api_core::AttrPath;

use crate::error::SceneError;
use crate::math::{decompose, euler_delta, euler_to_quat, local_matrix, quat_to_euler, RotateOrder};
use crate::node::NodeKind;
use crate::scene::Scene;

impl Scene {
    pub(crate) fn local_matrix_of(&self, name: &str) -> Result<DMat4, SceneError> {
        let node = self.node(name)?;
        let joint_orient = if node.kind == NodeKind::Joint {
            node.joint_orient
        } else {
            DVec3::ZERO
        };
        Ok(local_matrix(
            node.translate,
            joint_orient,
            node.rotate,
            node.scale,
            node.rotate_order,
        ))
    }

    pub fn world_matrix(&self, name: &str) -> Result<DMat4, SceneError> {
        let node = self.node(name)?;
        if node.kind == NodeKind::IkEffector {
            if let Some(ik) = self.ik_handles.values().find(|ik| ik.effector == name) {
                return self.world_matrix(&ik.end);
            }
        }
        let local = self.local_matrix_of(name)?;
        match node.parent.as_deref() {
            Some(parent) => Ok(self.world_matrix(parent)? * local),
            None => Ok(local),
        }
    }

    pub(crate) fn parent_world_matrix(&self, name: &str) -> Result<DMat4, SceneError> {
        match self.node(name)?.parent.as_deref() {
            Some(parent) => self.world_matrix(parent),
            None => Ok(DMat4::IDENTITY),
        }
    }

    pub fn world_position(&self, name: &str) -> Result<DVec3, SceneError> {
        Ok(self.world_matrix(name)?.w_axis.truncate())
    }

    pub fn world_rotation(&self, name: &str) -> Result<DQuat, SceneError> {
        Ok(decompose(&self.world_matrix(name)?).1)
    }

    /// Move `name` so its world position is `position`; returns the translate change.
    pub(crate) fn put_world_position(
        &mut self,
        name: &str,
        position: DVec3,
    ) -> Result<f64, SceneError> {
        let local = self
            .parent_world_matrix(name)?
            .inverse()
            .transform_point3(position);
        let node = self.node_mut(name)?;
        let delta = (local - node.translate).abs().max_element();
        node.translate = local;
        Ok(delta)
    }

    /// Rotate `name` so its world rotation is `rotation`, writing the `rotate` channel.
    /// Returns the change in degrees.
    pub(crate) fn put_world_rotation(
        &mut self,
        name: &str,
        rotation: DQuat,
    ) -> Result<f64, SceneError> {
        let parent_rotation = decompose(&self.parent_world_matrix(name)?).1;
        let local = parent_rotation.inverse() * rotation;
        let node = self.node_mut(name)?;
        let orient = if node.kind == NodeKind::Joint {
            euler_to_quat(node.joint_orient, RotateOrder::Xyz)
        } else {
            DQuat::IDENTITY
        };
        let rotate = quat_to_euler(orient.inverse() * local, node.rotate_order);
        let delta = euler_delta(rotate, node.rotate);
        node.rotate = rotate;
        Ok(delta)
    }

    /// Bake `rotation` into a joint's orientation (rotate becomes zero) while every child keeps
    /// its world position.
    pub(crate) fn orient_joint_impl(
        &mut self,
        name: &str,
        rotation: DQuat,
    ) -> Result<(), SceneError> {
        let node = self.node(name)?;
        if node.kind != NodeKind::Joint {
            return Err(SceneError::WrongKind {
                node: name.to_string(),
                expected: "joint",
            });
        }
        self.guard_member(name)?;
        let children = node.children.clone();
        let mut held = Vec::with_capacity(children.len());
        for child in &children {
            held.push((
                child.clone(),
                self.world_position(child)?,
                self.world_rotation(child)?,
            ));
        }
        let parent_rotation = decompose(&self.parent_world_matrix(name)?).1;
        let node = self.node_mut(name)?;
        node.joint_orient = quat_to_euler(parent_rotation.inverse() * rotation, RotateOrder::Xyz);
        node.rotate = DVec3::ZERO;
        for (child, position, child_rotation) in held {
            self.put_world_position(&child, position)?;
            self.hold_world_rotation(&child, child_rotation)?;
        }
        Ok(())
    }

    /// Restore a child's world rotation after its parent moved. Joints absorb the change in
    /// `jointOrient` so their `rotate` channel is untouched.
    fn hold_world_rotation(&mut self, name: &str, rotation: DQuat) -> Result<(), SceneError> {
        if self.node(name)?.kind != NodeKind::Joint {
            return self.put_world_rotation(name, rotation).map(|_| ());
        }
        let parent_rotation = decompose(&self.parent_world_matrix(name)?).1;
        let node = self.node_mut(name)?;
        let local = parent_rotation.inverse() * rotation;
        let rotate = euler_to_quat(node.rotate, node.rotate_order);
        node.joint_orient = quat_to_euler(local * rotate.inverse(), RotateOrder::Xyz);
        Ok(())
    }

    pub(crate) fn set_world_position_impl(
        &mut self,
        name: &str,
        position: DVec3,
    ) -> Result<(), SceneError> {
        self.guard_attr(&AttrPath::attr(name, "translate")?)?;
        self.put_world_position(name, position).map(|_| ())
    }

    pub(crate) fn set_world_rotation_impl(
        &mut self,
        name: &str,
        rotation: DQuat,
    ) -> Result<(), SceneError> {
        self.guard_attr(&AttrPath::attr(name, "rotate")?)?;
        self.put_world_rotation(name, rotation).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::angle_between;
    use crate::SceneHost;

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = Scene::default();
        scene.create_node("root", NodeKind::Transform, None).unwrap();
        scene.create_node("child", NodeKind::Transform, Some("root")).unwrap();
        scene
            .set_attr(&AttrPath::parse("root.translate").unwrap(), rigkit_api_core::Value::vec3(1.0, 2.0, 3.0))
            .unwrap();
        scene
            .set_attr(&AttrPath::parse("root.rotateZ").unwrap(), rigkit_api_core::Value::Float(90.0))
            .unwrap();
        scene
            .set_attr(&AttrPath::parse("child.translateX").unwrap(), rigkit_api_core::Value::Float(2.0))
            .unwrap();
        let p = scene.world_position("child").unwrap();
        assert!((p - DVec3::new(1.0, 4.0, 3.0)).length() < 1e-9);
    }

    #[test]
    fn orient_joint_keeps_child_positions() {
        let mut scene = Scene::default();
        scene.create_node("a", NodeKind::Joint, None).unwrap();
        scene.create_node("b", NodeKind::Joint, Some("a")).unwrap();
        scene.set_world_position("b", DVec3::new(3.0, 4.0, 0.0)).unwrap();
        let aim = crate::math::aim_rotation(DVec3::new(3.0, 4.0, 0.0), DVec3::Y);
        scene.orient_joint("a", aim).unwrap();

        let node = scene.node("b").unwrap();
        assert!((node.translate - DVec3::new(5.0, 0.0, 0.0)).length() < 1e-9);
        assert!((scene.world_position("b").unwrap() - DVec3::new(3.0, 4.0, 0.0)).length() < 1e-9);
        assert_eq!(scene.node("a").unwrap().rotate, DVec3::ZERO);
    }

    #[test]
    fn orient_joint_keeps_grandchildren_in_place() {
        let mut scene = Scene::default();
        scene.create_node("a", NodeKind::Joint, None).unwrap();
        scene.create_node("b", NodeKind::Joint, Some("a")).unwrap();
        scene.create_node("c", NodeKind::Joint, Some("b")).unwrap();
        scene.set_world_position("b", DVec3::new(4.0, 0.0, -1.0)).unwrap();
        scene.set_world_position("c", DVec3::new(8.0, 0.0, 0.0)).unwrap();
        let before = scene.world_rotation("b").unwrap();

        let aim = crate::math::aim_rotation(DVec3::new(4.0, 0.0, -1.0), DVec3::Y);
        scene.orient_joint("a", aim).unwrap();

        assert!((scene.world_position("b").unwrap() - DVec3::new(4.0, 0.0, -1.0)).length() < 1e-9);
        assert!((scene.world_position("c").unwrap() - DVec3::new(8.0, 0.0, 0.0)).length() < 1e-9);
        assert!(angle_between(scene.world_rotation("b").unwrap(), before) < 1e-6);
        assert_eq!(scene.node("b").unwrap().rotate, DVec3::ZERO);
    }

    #[test]
    fn world_rotation_lands_in_rotate_channel() {
        let mut scene = Scene::default();
        scene.create_node("j", NodeKind::Joint, None).unwrap();
        scene
            .set_attr(&AttrPath::parse("j.jointOrientZ").unwrap(), rigkit_api_core::Value::Float(30.0))
            .unwrap();
        let target = euler_to_quat(DVec3::new(0.0, 0.0, 75.0), RotateOrder::Xyz);
        scene.set_world_rotation("j", target).unwrap();
        let node = scene.node("j").unwrap();
        assert!((node.rotate.z - 45.0).abs() < 1e-6);
        assert!(angle_between(scene.world_rotation("j").unwrap(), target) < 1e-6);
    }
}
