//! Attribute access and connections.

use glam::DVec3;
use log::debug;
use rigkit_api_core::{coercion, split_namespace, AttrPath, Value, ValueKind};
use rigkit_graph_core::NodeType;

use crate::error::SceneError;
use crate::math::RotateOrder;
use crate::node::{AttrUnit, BuiltinAttr, ExtraAttr, NodeKind};
use crate::scene::Scene;

/// Attribute carrying a utility node's evaluated result.
pub const UTILITY_OUTPUT: &str = "output";
/// Input port of a unit-conversion node.
pub const CONVERSION_INPUT: &str = "in";
/// Multiplier stored on unit-conversion nodes.
pub const CONVERSION_FACTOR: &str = "conversionFactor";

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

fn vec3(v: DVec3) -> Value {
    Value::Vec3(v.to_array())
}

fn is_numeric(value: &Value) -> bool {
    matches!(
        value.kind(),
        ValueKind::Float | ValueKind::Int | ValueKind::Bool | ValueKind::Vec3
    )
}

impl Scene {
    pub(crate) fn get_attr_impl(&self, path: &AttrPath) -> Result<Value, SceneError> {
        let name = path.node_name();
        let node = self.node(&name)?;
        let attribute = path.attribute();
        let attribute = node.resolve_alias(&attribute);

        if node.kind.is_utility() && attribute == UTILITY_OUTPUT {
            return Ok(self
                .runtime
                .output(&name, "out")
                .cloned()
                .unwrap_or(Value::Float(0.0)));
        }
        if let Some(builtin) = BuiltinAttr::parse(attribute).filter(|_| node.kind.is_dag()) {
            return Ok(match builtin {
                BuiltinAttr::Vector(channel) => vec3(channel.get(node)),
                BuiltinAttr::Component(channel, i) => Value::Float(channel.get(node)[i]),
                BuiltinAttr::RotateOrder => Value::Int(node.rotate_order.index()),
                BuiltinAttr::Visibility => Value::Bool(node.visibility),
                BuiltinAttr::WorldPosition => vec3(self.world_position(&name)?),
            });
        }
        node.extra
            .get(attribute)
            .map(|extra| extra.value.clone())
            .ok_or_else(|| SceneError::AttributeNotFound {
                node: name.clone(),
                attribute: attribute.to_string(),
            })
    }

    pub(crate) fn has_attr_impl(&self, path: &AttrPath) -> bool {
        self.get_attr_impl(path).is_ok()
    }

    /// Unit of an attribute; unknown attributes count as linear.
    pub(crate) fn attr_unit(&self, path: &AttrPath) -> AttrUnit {
        let Some(node) = self.nodes.get(&path.node_name()) else {
            return AttrUnit::Linear;
        };
        let attribute = path.attribute();
        let attribute = node.resolve_alias(&attribute);
        if node.kind.is_utility() {
            return AttrUnit::Linear;
        }
        if let Some(builtin) = BuiltinAttr::parse(attribute) {
            return builtin.unit();
        }
        node.extra
            .get(attribute)
            .map(|extra| extra.unit)
            .unwrap_or_default()
    }

    /// Externally requested write; honours container locks.
    pub(crate) fn set_attr_impl(&mut self, path: &AttrPath, value: Value) -> Result<(), SceneError> {
        self.node(&path.node_name())?;
        self.guard_attr(path)?;
        self.write_attr(path, value).map(|_| ())
    }

    /// Write a value into an attribute, returning the largest component change.
    pub(crate) fn write_attr(&mut self, path: &AttrPath, value: Value) -> Result<f64, SceneError> {
        let name = path.node_name();
        let display = path.to_string();
        let mismatch = |expected: &'static str| SceneError::TypeMismatch {
            path: display.clone(),
            expected,
        };
        let node = self.node_mut(&name)?;
        let attribute = path.attribute();
        let attribute = node.resolve_alias(&attribute).to_string();

        if node.kind.is_utility() {
            if attribute == UTILITY_OUTPUT {
                return Err(SceneError::ReadOnly(display.clone()));
            }
            if !is_numeric(&value) {
                return Err(mismatch("numeric"));
            }
            let previous = node.extra.insert(
                attribute,
                ExtraAttr {
                    value: value.clone(),
                    unit: AttrUnit::Linear,
                },
            );
            return Ok(match previous {
                Some(old) => value_delta(&old.value, &value),
                None => {
                    self.invalidate_network();
                    f64::INFINITY
                }
            });
        }

        if let Some(builtin) = BuiltinAttr::parse(&attribute) {
            return match builtin {
                BuiltinAttr::Vector(channel) => {
                    if !is_numeric(&value) {
                        return Err(mismatch("vector"));
                    }
                    let new = DVec3::from_array(coercion::to_vec3(&value));
                    let slot = channel.get_mut(node);
                    let delta = (new - *slot).abs().max_element();
                    *slot = new;
                    Ok(delta)
                }
                BuiltinAttr::Component(channel, i) => {
                    if !is_numeric(&value) {
                        return Err(mismatch("float"));
                    }
                    let new = coercion::to_float(&value);
                    let slot = channel.get_mut(node);
                    let delta = (new - slot[i]).abs();
                    slot[i] = new;
                    Ok(delta)
                }
                BuiltinAttr::RotateOrder => {
                    let order = RotateOrder::from_index(coercion::to_int(&value))
                        .filter(|_| is_numeric(&value))
                        .ok_or_else(|| mismatch("rotate order (0-5)"))?;
                    let changed = node.rotate_order != order;
                    node.rotate_order = order;
                    Ok(if changed { 1.0 } else { 0.0 })
                }
                BuiltinAttr::Visibility => {
                    let visible = coercion::to_bool(&value);
                    let changed = node.visibility != visible;
                    node.visibility = visible;
                    Ok(if changed { 1.0 } else { 0.0 })
                }
                BuiltinAttr::WorldPosition => Err(SceneError::ReadOnly(display.clone())),
            };
        }

        let extra = node
            .extra
            .get_mut(&attribute)
            .ok_or_else(|| SceneError::AttributeNotFound {
                node: name.clone(),
                attribute: attribute.clone(),
            })?;
        let coerced = match extra.value.kind() {
            ValueKind::Float if is_numeric(&value) => Value::Float(coercion::to_float(&value)),
            ValueKind::Vec3 if is_numeric(&value) => Value::Vec3(coercion::to_vec3(&value)),
            ValueKind::Int if is_numeric(&value) => Value::Int(coercion::to_int(&value)),
            ValueKind::Bool if is_numeric(&value) => Value::Bool(coercion::to_bool(&value)),
            kind if kind == value.kind() => value,
            ValueKind::Float | ValueKind::Vec3 | ValueKind::Int | ValueKind::Bool => {
                return Err(mismatch("numeric"))
            }
            ValueKind::Enum => return Err(mismatch("enum")),
            ValueKind::Text => return Err(mismatch("text")),
        };
        let delta = value_delta(&extra.value, &coerced);
        extra.value = coerced;
        Ok(delta)
    }

    pub(crate) fn add_attr_impl(
        &mut self,
        path: &AttrPath,
        default: Value,
        unit: AttrUnit,
    ) -> Result<(), SceneError> {
        let name = path.node_name();
        let attribute = path.attribute();
        self.guard_member(&name)?;
        let node = self.node_mut(&name)?;
        if attribute.is_empty()
            || BuiltinAttr::parse(&attribute).is_some()
            || node.extra.contains_key(&attribute)
            || node.aliases.contains_key(&attribute)
        {
            return Err(SceneError::AttributeExists {
                node: name,
                attribute,
            });
        }
        node.extra.insert(
            attribute.clone(),
            ExtraAttr {
                value: default,
                unit,
            },
        );
        debug!("added attribute {name}.{attribute}");
        Ok(())
    }

    pub(crate) fn alias_attr_impl(
        &mut self,
        node_name: &str,
        alias: &str,
        attribute: &str,
    ) -> Result<(), SceneError> {
        self.guard_member(node_name)?;
        let path = AttrPath::attr(node_name, attribute)?;
        if !self.has_attr_impl(&path) {
            return Err(SceneError::AttributeNotFound {
                node: node_name.to_string(),
                attribute: attribute.to_string(),
            });
        }
        let node = self.node_mut(node_name)?;
        if BuiltinAttr::parse(alias).is_some() || node.extra.contains_key(alias) {
            return Err(SceneError::AttributeExists {
                node: node_name.to_string(),
                attribute: alias.to_string(),
            });
        }
        node.aliases
            .insert(alias.to_string(), attribute.to_string());
        Ok(())
    }

    // ----- connections -----

    /// Record `src -> dst` without validation or unit handling.
    pub(crate) fn connect_raw(&mut self, src: AttrPath, dst: AttrPath) {
        self.connections.insert(dst, src);
        self.invalidate_network();
    }

    pub(crate) fn connect_attr_impl(
        &mut self,
        src: &AttrPath,
        dst: &AttrPath,
    ) -> Result<(), SceneError> {
        let src_node = self.node(&src.node_name())?.kind;
        let dst_node = self.node(&dst.node_name())?.kind;

        if let NodeKind::Constraint(_) = dst_node {
            self.guard_member(&dst.node_name())?;
            self.connect_raw(src.clone(), dst.clone());
            return Ok(());
        }

        let src = self.canonical_attr(src);
        let dst = self.canonical_attr(dst);
        if !(src_node.is_utility() && src.attribute() == UTILITY_OUTPUT) {
            self.get_attr_impl(&src)?;
        }
        if dst_node.is_utility() {
            if dst.attribute() == UTILITY_OUTPUT {
                return Err(SceneError::ReadOnly(dst.to_string()));
            }
            self.guard_member(&dst.node_name())?;
            let node = self.node_mut(&dst.node_name())?;
            node.extra
                .entry(dst.attribute())
                .or_insert_with(|| ExtraAttr {
                    value: Value::Float(0.0),
                    unit: AttrUnit::Linear,
                });
        } else {
            self.get_attr_impl(&dst)?;
            if matches!(BuiltinAttr::parse(&dst.attribute()), Some(BuiltinAttr::WorldPosition)) {
                return Err(SceneError::ReadOnly(dst.to_string()));
            }
            self.guard_attr(&dst)?;
        }

        let src_unit = self.attr_unit(&src);
        let dst_unit = self.attr_unit(&dst);
        let converts = |kind: NodeKind| {
            kind.is_utility() && kind != NodeKind::Utility(NodeType::UnitConversion)
        };
        let factor = if src_unit == AttrUnit::Angular && converts(dst_node) {
            Some(DEG_TO_RAD)
        } else if converts(src_node) && dst_unit == AttrUnit::Angular {
            Some(1.0 / DEG_TO_RAD)
        } else {
            None
        };

        match factor {
            Some(factor) => {
                let conversion = self.create_conversion(&dst.node_name(), factor)?;
                self.connect_raw(src.clone(), AttrPath::attr(&conversion, CONVERSION_INPUT)?);
                self.connect_raw(AttrPath::attr(&conversion, UTILITY_OUTPUT)?, dst.clone());
                debug!("connected {src} -> {dst} through {conversion}");
            }
            None => {
                self.connect_raw(src.clone(), dst.clone());
                debug!("connected {src} -> {dst}");
            }
        }
        Ok(())
    }

    fn create_conversion(&mut self, near: &str, factor: f64) -> Result<String, SceneError> {
        let prefix = match split_namespace(near) {
            Some((namespace, _)) => format!("{namespace}:unitConversion"),
            None => "unitConversion".to_string(),
        };
        let mut index = 1;
        while self.is_taken(&format!("{prefix}{index}")) {
            index += 1;
        }
        let name = format!("{prefix}{index}");
        self.create_node_impl(&name, NodeKind::Utility(NodeType::UnitConversion), None)?;
        self.write_attr(&AttrPath::attr(&name, CONVERSION_FACTOR)?, Value::Float(factor))?;
        Ok(name)
    }

    pub(crate) fn disconnect_attr_impl(&mut self, dst: &AttrPath) -> Result<(), SceneError> {
        let dst = self.canonical_attr(dst);
        match self.connections.shift_remove(&dst) {
            Some(_) => {
                self.invalidate_network();
                Ok(())
            }
            None => Err(SceneError::AttributeNotFound {
                node: dst.node_name(),
                attribute: dst.attribute(),
            }),
        }
    }

    /// Source plug feeding `dst`, looking through unit conversions.
    pub(crate) fn connection_source_impl(&self, dst: &AttrPath) -> Option<AttrPath> {
        let dst = self.canonical_attr(dst);
        let src = self.connections.get(&dst)?.clone();
        let is_conversion = self
            .nodes
            .get(&src.node_name())
            .map(|n| n.kind == NodeKind::Utility(NodeType::UnitConversion))
            .unwrap_or(false);
        if is_conversion {
            let input = AttrPath::attr(&src.node_name(), CONVERSION_INPUT).ok()?;
            return self.connections.get(&input).cloned().or(Some(src));
        }
        Some(src)
    }
}

fn value_delta(a: &Value, b: &Value) -> f64 {
    match (a, b) {
        (Value::Float(_) | Value::Int(_) | Value::Bool(_) | Value::Vec3(_), _)
            if is_numeric(b) =>
        {
            let a = coercion::to_vec3(a);
            let b = coercion::to_vec3(b);
            (0..3).map(|i| (a[i] - b[i]).abs()).fold(0.0, f64::max)
        }
        _ if a == b => 0.0,
        _ => 1.0,
    }
}
