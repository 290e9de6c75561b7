//! DAG node records and their built-in channels.

use glam::DVec3;
use indexmap::IndexMap;
use rigkit_api_core::Value;
use rigkit_graph_core::NodeType;
use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintKind;
use crate::math::RotateOrder;

/// What a scene node is. Constraint and IK payloads live in the scene's side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "of")]
pub enum NodeKind {
    Transform,
    Joint,
    Locator,
    IkHandle,
    IkEffector,
    Constraint(ConstraintKind),
    Utility(NodeType),
}

impl NodeKind {
    /// Nodes that carry a transform and take part in the DAG hierarchy.
    pub fn is_dag(&self) -> bool {
        !matches!(self, NodeKind::Utility(_))
    }

    pub fn is_utility(&self) -> bool {
        matches!(self, NodeKind::Utility(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Transform => "transform",
            NodeKind::Joint => "joint",
            NodeKind::Locator => "locator",
            NodeKind::IkHandle => "ik_handle",
            NodeKind::IkEffector => "ik_effector",
            NodeKind::Constraint(_) => "constraint",
            NodeKind::Utility(_) => "utility",
        }
    }
}

/// Whether an attribute holds an angle (degrees) or a unitless/linear quantity.
///
/// Connecting angular plugs to utility nodes inserts a unit conversion so utilities
/// always compute in radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrUnit {
    #[default]
    Linear,
    Angular,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraAttr {
    pub value: Value,
    pub unit: AttrUnit,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub translate: DVec3,
    /// Degrees.
    pub rotate: DVec3,
    pub scale: DVec3,
    /// Degrees, always composed in `xyz` order.
    pub joint_orient: DVec3,
    pub rotate_order: RotateOrder,
    pub preferred_angle: DVec3,
    pub visibility: bool,
    pub extra: IndexMap<String, ExtraAttr>,
    /// alias -> attribute
    pub aliases: IndexMap<String, String>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            translate: DVec3::ZERO,
            rotate: DVec3::ZERO,
            scale: DVec3::ONE,
            joint_orient: DVec3::ZERO,
            rotate_order: RotateOrder::Xyz,
            preferred_angle: DVec3::ZERO,
            visibility: true,
            extra: IndexMap::new(),
            aliases: IndexMap::new(),
        }
    }

    /// Resolve an alias to the attribute it stands for.
    pub fn resolve_alias<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.aliases
            .get(attribute)
            .map(String::as_str)
            .unwrap_or(attribute)
    }
}

/// Built-in channel addressed by an attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Translate,
    Rotate,
    Scale,
    JointOrient,
    PreferredAngle,
}

impl Channel {
    pub(crate) fn unit(self) -> AttrUnit {
        match self {
            Channel::Translate | Channel::Scale => AttrUnit::Linear,
            Channel::Rotate | Channel::JointOrient | Channel::PreferredAngle => AttrUnit::Angular,
        }
    }

    pub(crate) fn get(self, node: &SceneNode) -> DVec3 {
        match self {
            Channel::Translate => node.translate,
            Channel::Rotate => node.rotate,
            Channel::Scale => node.scale,
            Channel::JointOrient => node.joint_orient,
            Channel::PreferredAngle => node.preferred_angle,
        }
    }

    pub(crate) fn get_mut(self, node: &mut SceneNode) -> &mut DVec3 {
        match self {
            Channel::Translate => &mut node.translate,
            Channel::Rotate => &mut node.rotate,
            Channel::Scale => &mut node.scale,
            Channel::JointOrient => &mut node.joint_orient,
            Channel::PreferredAngle => &mut node.preferred_angle,
        }
    }
}

/// Parsed built-in attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinAttr {
    /// Whole vector channel.
    Vector(Channel),
    /// One component (0 = X) of a vector channel.
    Component(Channel, usize),
    RotateOrder,
    Visibility,
    /// Derived, read-only world-space position.
    WorldPosition,
}

impl BuiltinAttr {
    pub(crate) fn parse(attribute: &str) -> Option<Self> {
        const CHANNELS: [(&str, Channel); 5] = [
            ("translate", Channel::Translate),
            ("rotate", Channel::Rotate),
            ("scale", Channel::Scale),
            ("jointOrient", Channel::JointOrient),
            ("preferredAngle", Channel::PreferredAngle),
        ];
        match attribute {
            "rotateOrder" => return Some(BuiltinAttr::RotateOrder),
            "visibility" => return Some(BuiltinAttr::Visibility),
            "worldPosition" => return Some(BuiltinAttr::WorldPosition),
            _ => {}
        }
        for (prefix, channel) in CHANNELS {
            if let Some(rest) = attribute.strip_prefix(prefix) {
                return match rest {
                    "" => Some(BuiltinAttr::Vector(channel)),
                    "X" => Some(BuiltinAttr::Component(channel, 0)),
                    "Y" => Some(BuiltinAttr::Component(channel, 1)),
                    "Z" => Some(BuiltinAttr::Component(channel, 2)),
                    _ => None,
                };
            }
        }
        None
    }

    pub(crate) fn unit(self) -> AttrUnit {
        match self {
            BuiltinAttr::Vector(c) | BuiltinAttr::Component(c, _) => c.unit(),
            _ => AttrUnit::Linear,
        }
    }

    /// True when `self` is `other` or a component of it.
    pub(crate) fn covered_by(self, other: BuiltinAttr) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (BuiltinAttr::Component(c, _), BuiltinAttr::Vector(p)) => c == p,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtin_names() {
        assert_eq!(
            BuiltinAttr::parse("translateX"),
            Some(BuiltinAttr::Component(Channel::Translate, 0))
        );
        assert_eq!(
            BuiltinAttr::parse("jointOrient"),
            Some(BuiltinAttr::Vector(Channel::JointOrient))
        );
        assert_eq!(BuiltinAttr::parse("rotateOrder"), Some(BuiltinAttr::RotateOrder));
        assert_eq!(BuiltinAttr::parse("rotatePivot"), None);
        assert_eq!(BuiltinAttr::parse("globalScale"), None);
    }

    #[test]
    fn components_are_covered_by_their_vector() {
        let tx = BuiltinAttr::Component(Channel::Translate, 0);
        assert!(tx.covered_by(BuiltinAttr::Vector(Channel::Translate)));
        assert!(!tx.covered_by(BuiltinAttr::Vector(Channel::Rotate)));
        assert!(BuiltinAttr::RotateOrder.covered_by(BuiltinAttr::RotateOrder));
    }
}
