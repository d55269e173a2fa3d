//! Value predicates and structural equality.
//!
//! These are the leaf helpers everything else builds on: model validation
//! uses the predicates, bindings use [`loose_equal`] to decide whether a
//! subscriber needs to be woken.

mod equal;

pub use equal::{loose_equal, loose_equal_serialized, MAX_EQUAL_DEPTH};

use serde_json::Value;

/// True for arrays and mappings.
pub fn is_object(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// True only for key-value mappings.
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object()
}

/// True if `value` is a mapping that directly holds `key`.
pub fn has_own(value: &Value, key: &str) -> bool {
    value.as_object().is_some_and(|map| map.contains_key(key))
}
