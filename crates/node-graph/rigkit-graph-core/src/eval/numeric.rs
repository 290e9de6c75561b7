//! Numeric helper utilities shared across node evaluators.

use rigkit_api_core::{coercion, Value};

/// Apply `op` pairwise to two numeric values, broadcasting scalars over vec3.
pub fn binary_numeric<F>(lhs: &Value, rhs: &Value, op: F) -> Value
where
    F: Fn(f64, f64) -> f64 + Copy,
{
    match (lhs, rhs) {
        (Value::Vec3(_), _) | (_, Value::Vec3(_)) => {
            let a = coercion::to_vec3(lhs);
            let b = coercion::to_vec3(rhs);
            Value::Vec3([op(a[0], b[0]), op(a[1], b[1]), op(a[2], b[2])])
        }
        _ => Value::Float(op(as_float(lhs), as_float(rhs))),
    }
}

/// Apply `op` to every component of `input`.
pub fn unary_numeric<F>(input: &Value, op: F) -> Value
where
    F: Fn(f64) -> f64 + Copy,
{
    match input {
        Value::Vec3(a) => Value::Vec3([op(a[0]), op(a[1]), op(a[2])]),
        other => Value::Float(op(as_float(other))),
    }
}

/// Coerce a [`Value`] to a single `f64`.
pub fn as_float(v: &Value) -> f64 {
    coercion::to_float(v)
}

/// Euclidean distance between two values coerced to vec3.
pub fn distance(a: &Value, b: &Value) -> f64 {
    let a = coercion::to_vec3(a);
    let b = coercion::to_vec3(b);
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}
