//! Transform math: rotation orders, euler conversion and aim bases.
//!
//! Angles on scene attributes are degrees. A rotate order `abc` applies the X/Y/Z rotation named
//! first, so `xyz` composes as `Rz * Ry * Rx` (intrinsic `ZYX` in glam terms).

use glam::{DMat3, DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateOrder {
    #[default]
    Xyz,
    Yzx,
    Zxy,
    Xzy,
    Yxz,
    Zyx,
}

impl RotateOrder {
    pub const ALL: [RotateOrder; 6] = [
        RotateOrder::Xyz,
        RotateOrder::Yzx,
        RotateOrder::Zxy,
        RotateOrder::Xzy,
        RotateOrder::Yxz,
        RotateOrder::Zyx,
    ];

    /// Integer value stored on the `rotateOrder` attribute.
    pub fn index(self) -> i64 {
        match self {
            RotateOrder::Xyz => 0,
            RotateOrder::Yzx => 1,
            RotateOrder::Zxy => 2,
            RotateOrder::Xzy => 3,
            RotateOrder::Yxz => 4,
            RotateOrder::Zyx => 5,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    fn euler_rot(self) -> EulerRot {
        match self {
            RotateOrder::Xyz => EulerRot::ZYX,
            RotateOrder::Yzx => EulerRot::XZY,
            RotateOrder::Zxy => EulerRot::YXZ,
            RotateOrder::Xzy => EulerRot::YZX,
            RotateOrder::Yxz => EulerRot::ZXY,
            RotateOrder::Zyx => EulerRot::XYZ,
        }
    }

    /// Reorder `(x, y, z)` into glam's (first, second, third) argument order.
    fn to_glam(self, v: DVec3) -> (f64, f64, f64) {
        match self {
            RotateOrder::Xyz => (v.z, v.y, v.x),
            RotateOrder::Yzx => (v.x, v.z, v.y),
            RotateOrder::Zxy => (v.y, v.x, v.z),
            RotateOrder::Xzy => (v.y, v.z, v.x),
            RotateOrder::Yxz => (v.z, v.x, v.y),
            RotateOrder::Zyx => (v.x, v.y, v.z),
        }
    }

    fn from_glam(self, (a, b, c): (f64, f64, f64)) -> DVec3 {
        match self {
            RotateOrder::Xyz => DVec3::new(c, b, a),
            RotateOrder::Yzx => DVec3::new(a, c, b),
            RotateOrder::Zxy => DVec3::new(b, a, c),
            RotateOrder::Xzy => DVec3::new(c, a, b),
            RotateOrder::Yxz => DVec3::new(b, c, a),
            RotateOrder::Zyx => DVec3::new(a, b, c),
        }
    }
}

/// Quaternion for euler angles in degrees under `order`.
pub fn euler_to_quat(degrees: DVec3, order: RotateOrder) -> DQuat {
    let (a, b, c) = order.to_glam(degrees * (std::f64::consts::PI / 180.0));
    DQuat::from_euler(order.euler_rot(), a, b, c)
}

/// Euler angles in degrees reproducing `q` under `order`.
pub fn quat_to_euler(q: DQuat, order: RotateOrder) -> DVec3 {
    let radians = order.from_glam(q.normalize().to_euler(order.euler_rot()));
    radians * (180.0 / std::f64::consts::PI)
}

/// Rotation whose X axis points along `aim` and whose Y axis leans toward `up`.
///
/// Falls back to world Z as the secondary reference when `aim` and `up` are parallel.
pub fn aim_rotation(aim: DVec3, up: DVec3) -> DQuat {
    let x = aim.normalize_or_zero();
    if x.length_squared() < EPSILON {
        return DQuat::IDENTITY;
    }
    let mut z = x.cross(up);
    if z.length_squared() < EPSILON {
        z = x.cross(DVec3::Z);
        if z.length_squared() < EPSILON {
            z = x.cross(DVec3::Y);
        }
    }
    let z = z.normalize();
    let y = z.cross(x);
    DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize()
}

/// `T * JO * R * S` for a node's local channels.
pub fn local_matrix(
    translate: DVec3,
    joint_orient: DVec3,
    rotate: DVec3,
    scale: DVec3,
    order: RotateOrder,
) -> DMat4 {
    let jo = euler_to_quat(joint_orient, RotateOrder::Xyz);
    let r = euler_to_quat(rotate, order);
    DMat4::from_scale_rotation_translation(scale, jo * r, translate)
}

/// Rotation and scale parts of a world matrix.
pub fn decompose(m: &DMat4) -> (DVec3, DQuat, DVec3) {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    (scale, rotation.normalize(), translation)
}

/// Largest per-channel difference between two euler triples, wrapped to `[0, 180]`.
pub fn euler_delta(a: DVec3, b: DVec3) -> f64 {
    let d = a - b;
    d.to_array()
        .iter()
        .map(|x| (x + 180.0).rem_euclid(360.0) - 180.0)
        .fold(0.0, |acc: f64, x| acc.max(x.abs()))
}

/// Angular distance between two rotations in degrees.
pub fn angle_between(a: DQuat, b: DQuat) -> f64 {
    a.angle_between(b).to_degrees()
}
