//! Helpers for dealing with variadic node inputs.

use std::cmp::Ordering;

use rigkit_api_core::Value;

use super::numeric::binary_numeric;

/// Split a variadic input key into its prefix and optional positional suffix.
pub fn parse_variadic_key(key: &str) -> (&str, Option<usize>) {
    if let Some((prefix, tail)) = key.rsplit_once('_') {
        if let Ok(idx) = tail.parse::<usize>() {
            return (prefix, Some(idx));
        }
    }
    (key, None)
}

/// Sort variadic keys lexicographically by prefix then index.
pub fn compare_variadic_keys(a: &str, b: &str) -> Ordering {
    let (prefix_a, idx_a) = parse_variadic_key(a);
    let (prefix_b, idx_b) = parse_variadic_key(b);

    match prefix_a.cmp(prefix_b) {
        Ordering::Equal => match (idx_a, idx_b) {
            (Some(ia), Some(ib)) => ia.cmp(&ib),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        },
        other => other,
    }
}

/// Fold a variadic collection of values with the provided numeric operator.
pub fn fold_numeric_variadic<F>(values: &[Value], op: F, empty_fallback: Value) -> Value
where
    F: Fn(f64, f64) -> f64 + Copy,
{
    let mut iter = values.iter();
    let Some(first) = iter.next() else {
        return empty_fallback;
    };
    iter.fold(first.clone(), |acc, v| binary_numeric(&acc, v, op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_suffixes_sort_numerically() {
        let mut keys = vec!["in_10", "in_2", "in_0"];
        keys.sort_by(|a, b| compare_variadic_keys(a, b));
        assert_eq!(keys, vec!["in_0", "in_2", "in_10"]);
    }
}
