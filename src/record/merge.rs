//! Deep-merge for record patches.

use crate::schema::default_record;
use serde_json::Value;

/// Merge `patch` into `target`, mutating `target`.
///
/// Keys merge recursively only when both sides hold objects; in every other
/// pairing the patch value replaces the target value outright. A `null`,
/// scalar, or array in the patch therefore evicts an entire object subtree,
/// and arrays are never concatenated.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    let Some(patch_map) = patch.as_object() else {
        return;
    };
    let Some(target_map) = target.as_object_mut() else {
        *target = patch.clone();
        return;
    };
    for (key, patch_value) in patch_map {
        match target_map.get_mut(key) {
            Some(target_value) if target_value.is_object() && patch_value.is_object() => {
                deep_merge(target_value, patch_value);
            }
            Some(target_value) => *target_value = patch_value.clone(),
            None => {
                target_map.insert(key.clone(), patch_value.clone());
            }
        }
    }
}

/// Merge a normalized value onto a fresh canonical default, producing the
/// fully-populated record that gets persisted and returned to callers.
#[must_use]
pub fn merge_onto_default(normalized: &Value) -> Value {
    let mut full = default_record();
    deep_merge(&mut full, normalized);
    full
}
