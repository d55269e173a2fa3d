use serde::Serialize;
use serde_json::{Number, Value};
use std::borrow::Cow;

/// Nesting depth past which two values are reported as not equal.
pub const MAX_EQUAL_DEPTH: usize = 256;

/// Deep, coercive structural equality.
///
/// - Arrays are equal when they have the same length and every element pair
///   is equal, in order.
/// - Mappings are equal when they have the same key set and every value pair
///   is equal; key order is ignored.
/// - An array never equals a mapping, and a container never equals a leaf.
/// - Leaves are equal when their string forms match, so `"0"` equals `0`
///   and `"true"` equals `true`.
///
/// Values nested deeper than [`MAX_EQUAL_DEPTH`] compare as not equal.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared_store::loose_equal;
///
/// assert!(loose_equal(&json!({ "a": 1, "b": [1, 2] }), &json!({ "b": [1, 2], "a": 1 })));
/// assert!(loose_equal(&json!("0"), &json!(0)));
/// assert!(!loose_equal(&json!([1, 2]), &json!([2, 1])));
/// ```
pub fn loose_equal(a: &Value, b: &Value) -> bool {
    equal_at(a, b, 0)
}

/// [`loose_equal`] over anything serializable.
///
/// A value that fails to serialize is never equal to anything.
pub fn loose_equal_serialized<T: Serialize + ?Sized>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => loose_equal(&a, &b),
        _ => false,
    }
}

fn equal_at(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_EQUAL_DEPTH {
        return false;
    }
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equal_at(x, y, depth + 1))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| equal_at(x, y, depth + 1)))
        }
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => a == b || coerce(a) == coerce(b),
    }
}

fn coerce(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed("null"),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(number_to_string(n)),
        // containers are handled before coercion
        Value::Array(_) | Value::Object(_) => Cow::Borrowed(""),
    }
}

// Both zeros print as "0". Magnitudes from 1e-6 up to 1e21 print as plain
// decimals with the shortest round-trip digits, anything else in exponent
// form with an explicit sign: 1e21 is "1e+21", 1e-7 is "1e-7".
fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return f.to_string();
    }
    let formatted = format!("{:e}", f);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
        _ => formatted,
    }
}
