//! IK handles solved with FABRIK, then re-aimed so every joint's X axis points down the chain.

use glam::{DQuat, DVec3};
use log::debug;

use crate::error::SceneError;
use crate::math::{aim_rotation, EPSILON};
use crate::node::NodeKind;
use crate::scene::Scene;

const FABRIK_TOLERANCE: f64 = 1e-6;
const FABRIK_MAX_ITERATIONS: usize = 16;

#[derive(Debug, Clone)]
pub struct IkHandle {
    pub start: String,
    pub end: String,
    pub effector: String,
    /// World position of the pole-vector driver, written by pole-vector constraints.
    pub pole: Option<DVec3>,
    /// Which side of the pole plane the chain's Y axis faces; fixed on the first solve.
    pub(crate) up_sign: Option<f64>,
}

/// Chain positions after reaching for `target` from a fixed `base`.
fn fabrik(mut points: Vec<DVec3>, target: DVec3) -> Vec<DVec3> {
    let n = points.len();
    if n < 2 {
        return points;
    }
    let lengths: Vec<f64> = points.windows(2).map(|w| (w[1] - w[0]).length()).collect();
    let base = points[0];
    let total: f64 = lengths.iter().sum();

    if (target - base).length() >= total {
        let direction = (target - base).normalize_or_zero();
        for i in 1..n {
            points[i] = points[i - 1] + direction * lengths[i - 1];
        }
        return points;
    }

    for _ in 0..FABRIK_MAX_ITERATIONS {
        points[n - 1] = target;
        for i in (0..n - 1).rev() {
            let dir = (points[i] - points[i + 1]).try_normalize().unwrap_or(DVec3::Y);
            points[i] = points[i + 1] + dir * lengths[i];
        }
        points[0] = base;
        for i in 1..n {
            let dir = (points[i] - points[i - 1]).try_normalize().unwrap_or(DVec3::Y);
            points[i] = points[i - 1] + dir * lengths[i - 1];
        }
        if (points[n - 1] - target).length() <= FABRIK_TOLERANCE {
            break;
        }
    }
    points
}

impl Scene {
    /// Joints from `start` down to `end`, inclusive.
    pub(crate) fn chain_of(&self, start: &str, end: &str) -> Result<Vec<String>, SceneError> {
        let invalid = || SceneError::InvalidIkChain {
            start: start.to_string(),
            end: end.to_string(),
        };
        if start == end || !self.is_ancestor(start, end) {
            return Err(invalid());
        }
        let mut chain = vec![end.to_string()];
        let mut cursor = self.node(end)?.parent.clone();
        while let Some(current) = cursor {
            if self.node(&current)?.kind != NodeKind::Joint {
                return Err(invalid());
            }
            chain.push(current.clone());
            if current == start {
                break;
            }
            cursor = self.node(&current)?.parent.clone();
        }
        chain.reverse();
        Ok(chain)
    }

    pub(crate) fn create_ik_handle_impl(
        &mut self,
        handle: &str,
        effector: &str,
        start: &str,
        end: &str,
    ) -> Result<(), SceneError> {
        for joint in [start, end] {
            if self.node(joint)?.kind != NodeKind::Joint {
                return Err(SceneError::WrongKind {
                    node: joint.to_string(),
                    expected: "joint",
                });
            }
        }
        let chain = self.chain_of(start, end)?;
        self.check_new_name(handle)?;
        self.check_new_name(effector)?;
        let effector_parent = chain[chain.len() - 2].clone();
        let end_position = self.world_position(end)?;

        self.create_node_impl(handle, NodeKind::IkHandle, None)?;
        self.put_world_position(handle, end_position)?;
        self.create_node_impl(effector, NodeKind::IkEffector, Some(&effector_parent))?;
        self.ik_handles.insert(
            handle.to_string(),
            IkHandle {
                start: start.to_string(),
                end: end.to_string(),
                effector: effector.to_string(),
                pole: None,
                up_sign: None,
            },
        );
        debug!("ik handle {handle} across {start} .. {end}");
        Ok(())
    }

    pub(crate) fn solve_ik_handles(&mut self) -> Result<f64, SceneError> {
        let names: Vec<String> = self.ik_handles.keys().cloned().collect();
        let mut delta: f64 = 0.0;
        for name in names {
            delta = delta.max(self.solve_ik(&name)?);
        }
        Ok(delta)
    }

    fn solve_ik(&mut self, name: &str) -> Result<f64, SceneError> {
        let Some(ik) = self.ik_handles.get(name).cloned() else {
            return Ok(0.0);
        };
        let chain = self.chain_of(&ik.start, &ik.end)?;
        let target = self.world_position(name)?;
        let mut points = Vec::with_capacity(chain.len());
        for joint in &chain {
            points.push(self.world_position(joint)?);
        }
        let base = points[0];
        if (target - base).length() < EPSILON {
            return Ok(0.0);
        }
        let solved = fabrik(points, target);

        let mut delta: f64 = 0.0;
        for i in 0..chain.len() - 1 {
            let aim = solved[i + 1] - solved[i];
            if aim.length_squared() < EPSILON {
                continue;
            }
            let x = aim.normalize();
            let current_up = self.world_rotation(&chain[i])? * DVec3::Y;
            let up = match ik.pole {
                Some(pole) => {
                    let to_pole = pole - base;
                    let perp = to_pole - x * to_pole.dot(x);
                    if perp.length_squared() < EPSILON {
                        current_up
                    } else {
                        perp * self.up_sign(name, current_up, perp)
                    }
                }
                None => current_up,
            };
            let rotation: DQuat = aim_rotation(x, up);
            delta = delta.max(self.put_world_rotation(&chain[i], rotation)?);
        }
        Ok(delta)
    }

    fn up_sign(&mut self, handle: &str, current_up: DVec3, perp: DVec3) -> f64 {
        let Some(ik) = self.ik_handles.get_mut(handle) else {
            return 1.0;
        };
        *ik.up_sign.get_or_insert(if current_up.dot(perp) >= 0.0 {
            1.0
        } else {
            -1.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneHost;
    use rigkit_api_core::{AttrPath, Value};

    fn two_joint_chain(scene: &mut Scene) {
        scene.create_node("root", NodeKind::Joint, None).unwrap();
        scene.create_node("end", NodeKind::Joint, Some("root")).unwrap();
        scene
            .set_attr(&AttrPath::parse("end.translateX").unwrap(), Value::Float(4.0))
            .unwrap();
        scene.create_ik_handle("ik", "effector", "root", "end").unwrap();
    }

    #[test]
    fn fabrik_reaches_target_inside_range() {
        let points = vec![DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0), DVec3::new(4.0, 0.0, 0.0)];
        let target = DVec3::new(2.0, 2.0, 0.0);
        let solved = fabrik(points, target);
        assert!((solved[2] - target).length() < 1e-4);
        assert!(((solved[1] - solved[0]).length() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fabrik_extends_straight_when_out_of_reach() {
        let points = vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)];
        let solved = fabrik(points, DVec3::new(0.0, 5.0, 0.0));
        assert!((solved[1] - DVec3::new(0.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn handle_starts_at_end_joint_and_effector_tracks_it() {
        let mut scene = Scene::default();
        two_joint_chain(&mut scene);
        assert!((scene.world_position("ik").unwrap() - DVec3::new(4.0, 0.0, 0.0)).length() < 1e-12);
        assert_eq!(scene.node("effector").unwrap().parent.as_deref(), Some("root"));
        assert_eq!(
            scene.world_position("effector").unwrap(),
            scene.world_position("end").unwrap()
        );
    }

    #[test]
    fn moving_handle_aims_root_joint() {
        let mut scene = Scene::default();
        two_joint_chain(&mut scene);
        scene.set_world_position("ik", DVec3::new(0.0, 8.0, 0.0)).unwrap();
        let report = scene.evaluate().unwrap();
        assert!(report.settled);
        let end = scene.world_position("end").unwrap();
        assert!((end - DVec3::new(0.0, 4.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn rejects_chain_without_ancestry() {
        let mut scene = Scene::default();
        scene.create_node("a", NodeKind::Joint, None).unwrap();
        scene.create_node("b", NodeKind::Joint, None).unwrap();
        assert!(matches!(
            scene.create_ik_handle("ik", "eff", "a", "b"),
            Err(SceneError::InvalidIkChain { .. })
        ));
    }
}
