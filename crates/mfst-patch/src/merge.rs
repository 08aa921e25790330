//! Structural merge diff over JSON value trees.
//!
//! Objects are compared and merged key by key; every other value (scalars,
//! arrays, null) is replaced wholesale. A key present in the old tree but
//! missing from the new one is expressed as `null` in the overlay, and
//! applying a `null` removes the key.

use serde_json::{Map, Value};

/// Compute the overlay turning `old` into `new`.
///
/// Returns `None` when the two trees are equal.
#[must_use]
pub fn merge_diff(old: &Value, new: &Value) -> Option<Value> {
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => {
            let mut overlay = Map::new();

            for (key, new_val) in new {
                match old.get(key) {
                    Some(old_val) => {
                        if let Some(changed) = merge_diff(old_val, new_val) {
                            overlay.insert(key.clone(), changed);
                        }
                    }
                    None => {
                        overlay.insert(key.clone(), new_val.clone());
                    }
                }
            }

            for key in old.keys() {
                if !new.contains_key(key) {
                    overlay.insert(key.clone(), Value::Null);
                }
            }

            (!overlay.is_empty()).then_some(Value::Object(overlay))
        }
        _ if old == new => None,
        _ => Some(new.clone()),
    }
}

/// Merge `overlay` onto `target` in place.
pub fn merge_apply(target: &mut Value, overlay: &Value) {
    let Value::Object(patch) = overlay else {
        *target = overlay.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        for (key, value) in patch {
            if value.is_null() {
                fields.remove(key);
            } else {
                merge_apply(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
