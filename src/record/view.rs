//! Read-time projections of a record. Nothing here is ever persisted.

use crate::record::types::GateDecision;
use serde_json::{Value, json};

/// Scene data older than this is considered stale on read.
pub const SCENE_STALE_MS: i64 = 20_000;

/// Copy of `record` with `scene_state.confidence` halved when the last
/// vision capture is older than [`SCENE_STALE_MS`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decay_stale_scene(record: &Value, now_ms: i64) -> Value {
    let mut out = record.clone();
    let Some(scene) = out.get_mut("scene_state").and_then(Value::as_object_mut) else {
        return out;
    };
    let Some(last) = scene.get("last_vision_ts").and_then(Value::as_f64) else {
        return out;
    };
    if last <= 0.0 {
        return out;
    }
    let age = now_ms as f64 - last;
    if age > SCENE_STALE_MS as f64 {
        let confidence = scene.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
        scene.insert("confidence".into(), json!(confidence * 0.5));
    }
    out
}

/// Decide whether a new vision capture may proceed under `cooldown_ms`.
///
/// The gate opens when no capture was ever recorded (`last_vision_ts`
/// missing, null, or non-positive) or when the last one is at least
/// `cooldown_ms` old.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn vision_gate(record: &Value, now_ms: i64, cooldown_ms: i64) -> GateDecision {
    let last = record
        .get("scene_state")
        .and_then(|scene| scene.get("last_vision_ts"))
        .and_then(Value::as_f64);
    match last {
        Some(last) if last > 0.0 => {
            let age = now_ms as f64 - last;
            GateDecision {
                proceed: age >= cooldown_ms as f64,
                age_ms: Some(age as i64),
            }
        }
        _ => GateDecision {
            proceed: true,
            age_ms: None,
        },
    }
}
