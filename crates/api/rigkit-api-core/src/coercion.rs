//! Coercion helpers between Value kinds.
//! Scalar <-> vector broadcasting, bool -> float, int -> float.

use crate::Value;

/// Attempt to coerce a Value into a scalar f64.
/// Rules:
/// - Float -> its value
/// - Bool -> 1.0 / 0.0
/// - Int -> as float
/// - Vec3 -> first component
/// - Enum -> recurse into payload
pub fn to_float(v: &Value) -> f64 {
    match v {
        Value::Float(f) => *f,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Int(i) => *i as f64,
        Value::Vec3(a) => a[0],
        Value::Enum(_, boxed) => to_float(boxed),
        Value::Text(_) => 0.0,
    }
}

/// Try to coerce a Value into a Vec3; scalars broadcast to `[s, s, s]`.
pub fn to_vec3(v: &Value) -> [f64; 3] {
    match v {
        Value::Vec3(a) => *a,
        Value::Float(_) | Value::Bool(_) | Value::Int(_) => {
            let s = to_float(v);
            [s, s, s]
        }
        Value::Enum(_, boxed) => to_vec3(boxed),
        Value::Text(_) => [0.0, 0.0, 0.0],
    }
}

/// Coerce a Value into an integer, rounding floats to the nearest value.
pub fn to_int(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        other => to_float(other).round() as i64,
    }
}

/// Coerce a Value into a boolean, treating non-zero numeric entries as `true`.
pub fn to_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Text(s) => !s.is_empty(),
        Value::Vec3(a) => a.iter().any(|x| *x != 0.0),
        other => to_float(other) != 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_broadcast_to_vec3() {
        assert_eq!(to_vec3(&Value::Float(2.0)), [2.0, 2.0, 2.0]);
        assert_eq!(to_vec3(&Value::Int(1)), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn int_rounds_floats() {
        assert_eq!(to_int(&Value::Float(2.6)), 3);
        assert_eq!(to_int(&Value::Bool(true)), 1);
    }
}
