//! Record schema: whitelists, normalization, and the prose hard-guard.
//!
//! Nothing in this module touches storage or time. Validation is strict by
//! design: a patch either comes out fully normalized or is rejected with the
//! exact field(s) that failed. The lenient path for previously-stored records
//! lives in [`crate::record::sanitize`], not here.

use crate::error::SchemaError;
use serde_json::{Map, Value, json};

/// Keys a record (or patch) may carry at the top level.
pub const RECORD_TOP_KEYS: [&str; 6] = [
    "meta",
    "dialogue",
    "scene_state",
    "flags",
    "speech_lock_until",
    "counters",
];

/// Keys that must never be stored anywhere in a record, at any depth.
/// These mark prose/narration leaking into structured state.
pub const FORBIDDEN_PROSE_KEYS: [&str; 8] = [
    "spoken_line",
    "narrative",
    "summary_text",
    "narration",
    "prose",
    "caption",
    "reply_text",
    "suggested_line",
];

const META_KEYS: [&str; 2] = ["last_seen", "last_route"];
const FLAGS_KEYS: [&str; 1] = ["speaker"];
const SCENE_KEYS: [&str; 9] = [
    "player",
    "environment",
    "entities",
    "updated_at",
    "spatial_notes",
    "danger",
    "confidence",
    "world_confidence",
    "last_vision_ts",
];
const SCENE_PLAYER_KEYS: [&str; 4] = ["health", "hunger", "dimension", "position"];
const SCENE_ENV_KEYS: [&str; 2] = ["biome", "weather"];
const SCENE_DANGER_KEYS: [&str; 2] = ["level", "why"];
const COUNTERS_KEYS: [&str; 1] = ["vision_calls_60s"];
const VISION_BUCKET_KEYS: [&str; 3] = ["chat", "tactical", "auto"];
const DIALOGUE_ENTRY_KEYS: [&str; 3] = ["speaker", "text", "ts"];

/// Maximum dialogue entries kept per record (ring semantics, oldest evicted).
pub const DIALOGUE_CAP: usize = 10;

/// The canonical default record. Every field a caller can read is populated.
#[must_use]
pub fn default_record() -> Value {
    json!({
        "meta": { "last_seen": null, "last_route": null },
        "dialogue": [],
        "scene_state": {
            "player": {},
            "environment": {},
            "entities": null,
            "spatial_notes": null,
            "danger": null,
            "confidence": null,
            "world_confidence": null,
            "last_vision_ts": null,
            "updated_at": 0
        },
        "flags": { "speaker": "NONE" },
        "speech_lock_until": null,
        "counters": { "vision_calls_60s": { "chat": [], "tactical": [], "auto": [] } }
    })
}

/// A patch that has passed strict validation. Field values are normalized
/// and safe to merge into a stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPatch(Map<String, Value>);

impl NormalizedPatch {
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strictly validate and normalize a patch against the record schema.
///
/// Checks run in a fixed order:
///
/// 1. the input must be a JSON object;
/// 2. top-level keys are whitelisted (all unknown keys reported at once);
/// 3. the whole tree is scanned for forbidden prose keys (every hit
///    reported with its full dotted/indexed path);
/// 4. each present field is normalized: legacy `"LLM"` speaker becomes
///    `"GPT"`, `scene_state.updated_at` defaults to `0` when omitted,
///    over-long dialogue is truncated to the most recent [`DIALOGUE_CAP`].
///
/// Fields absent from the input are absent from the output. Every top-level
/// field accepts `null`, which normalizes to `null`.
pub fn validate_patch(input: &Value) -> Result<NormalizedPatch, SchemaError> {
    let Some(patch) = input.as_object() else {
        return Err(SchemaError::NotAnObject);
    };
    check_allowed_keys("root", patch, &RECORD_TOP_KEYS)?;

    let forbidden = forbidden_key_paths(input);
    if !forbidden.is_empty() {
        return Err(SchemaError::ForbiddenKey { paths: forbidden });
    }

    let mut out = Map::new();
    if let Some(dialogue) = patch.get("dialogue") {
        out.insert("dialogue".into(), normalize_dialogue(dialogue)?);
    }
    if let Some(scene) = patch.get("scene_state") {
        out.insert("scene_state".into(), normalize_scene(scene)?);
    }
    if let Some(flags) = patch.get("flags") {
        out.insert("flags".into(), normalize_flags(flags)?);
    }
    if let Some(lock) = patch.get("speech_lock_until") {
        out.insert(
            "speech_lock_until".into(),
            number_or_null(lock, "speech_lock_until")?,
        );
    }
    if let Some(counters) = patch.get("counters") {
        out.insert("counters".into(), normalize_counters(counters)?);
    }
    if let Some(meta) = patch.get("meta") {
        out.insert("meta".into(), normalize_meta(meta)?);
    }
    Ok(NormalizedPatch(out))
}

/// Walk the full value tree and collect the path of every forbidden key,
/// e.g. `scene_state.danger.why[0].prose`. Never stops at the first hit, and
/// descends into forbidden subtrees so nested offenders are reported too.
#[must_use]
pub fn forbidden_key_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_forbidden(value, "", &mut paths);
    paths
}

fn collect_forbidden(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                if FORBIDDEN_PROSE_KEYS.contains(&key.as_str()) {
                    out.push(child_path.clone());
                }
                collect_forbidden(child, &child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_forbidden(item, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

fn check_allowed_keys(
    scope: &str,
    obj: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), SchemaError> {
    let unknown: Vec<String> = obj
        .keys()
        .filter(|key| !allowed.contains(&key.as_str()))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::UnknownKeys {
            scope: scope.to_string(),
            keys: unknown,
        })
    }
}

fn type_mismatch(path: impl Into<String>, expected: impl Into<String>) -> SchemaError {
    SchemaError::TypeMismatch {
        path: path.into(),
        expected: expected.into(),
    }
}

fn number_or_null(value: &Value, path: &str) -> Result<Value, SchemaError> {
    if value.is_null() || value.is_number() {
        Ok(value.clone())
    } else {
        Err(type_mismatch(path, "number or null"))
    }
}

fn string_or_null(value: &Value, path: &str) -> Result<Value, SchemaError> {
    if value.is_null() || value.is_string() {
        Ok(value.clone())
    } else {
        Err(type_mismatch(path, "string or null"))
    }
}

fn string_array_or_null(value: &Value, path: &str) -> Result<Value, SchemaError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(type_mismatch(format!("{path}[{i}]"), "string"));
                }
            }
            Ok(value.clone())
        }
        _ => Err(type_mismatch(path, "array or null")),
    }
}

fn normalize_dialogue(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(items) = value.as_array() else {
        return Err(type_mismatch("dialogue", "array or null"));
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, entry) in items.iter().enumerate() {
        let path = format!("dialogue[{i}]");
        let Some(entry_obj) = entry.as_object() else {
            return Err(type_mismatch(path, "object"));
        };
        check_allowed_keys(&path, entry_obj, &DIALOGUE_ENTRY_KEYS)?;

        let speaker = match entry_obj.get("speaker").and_then(Value::as_str) {
            Some(s @ ("player" | "system")) => s,
            _ => {
                return Err(type_mismatch(
                    format!("{path}.speaker"),
                    "\"player\" or \"system\"",
                ));
            }
        };
        let Some(text) = entry_obj.get("text").and_then(Value::as_str) else {
            return Err(type_mismatch(format!("{path}.text"), "string"));
        };
        let ts = match entry_obj.get("ts") {
            Some(ts) if ts.is_number() => ts,
            _ => return Err(type_mismatch(format!("{path}.ts"), "number")),
        };
        out.push(json!({ "speaker": speaker, "text": text, "ts": ts }));
    }

    if out.len() > DIALOGUE_CAP {
        out.drain(..out.len() - DIALOGUE_CAP);
    }
    Ok(Value::Array(out))
}

fn normalize_scene(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(scene) = value.as_object() else {
        return Err(type_mismatch("scene_state", "object or null"));
    };
    check_allowed_keys("scene_state", scene, &SCENE_KEYS)?;

    let mut out = Map::new();
    match scene.get("updated_at") {
        Some(ts) if ts.is_number() => {
            out.insert("updated_at".into(), ts.clone());
        }
        Some(_) => return Err(type_mismatch("scene_state.updated_at", "number")),
        None => {
            out.insert("updated_at".into(), Value::from(0));
        }
    }

    if let Some(entities) = scene.get("entities") {
        out.insert(
            "entities".into(),
            string_array_or_null(entities, "scene_state.entities")?,
        );
    }
    if let Some(player) = scene.get("player") {
        out.insert("player".into(), normalize_scene_player(player)?);
    }
    if let Some(env) = scene.get("environment") {
        out.insert("environment".into(), normalize_scene_environment(env)?);
    }
    if let Some(ts) = scene.get("last_vision_ts") {
        out.insert(
            "last_vision_ts".into(),
            number_or_null(ts, "scene_state.last_vision_ts")?,
        );
    }
    if let Some(confidence) = scene.get("confidence") {
        out.insert(
            "confidence".into(),
            number_or_null(confidence, "scene_state.confidence")?,
        );
    }
    if let Some(confidence) = scene.get("world_confidence") {
        out.insert(
            "world_confidence".into(),
            number_or_null(confidence, "scene_state.world_confidence")?,
        );
    }
    if let Some(notes) = scene.get("spatial_notes") {
        out.insert(
            "spatial_notes".into(),
            string_array_or_null(notes, "scene_state.spatial_notes")?,
        );
    }
    if let Some(danger) = scene.get("danger") {
        out.insert("danger".into(), normalize_scene_danger(danger)?);
    }
    Ok(Value::Object(out))
}

fn normalize_scene_player(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(player) = value.as_object() else {
        return Err(type_mismatch("scene_state.player", "object or null"));
    };
    check_allowed_keys("scene_state.player", player, &SCENE_PLAYER_KEYS)?;

    let mut out = Map::new();
    if let Some(health) = player.get("health") {
        out.insert(
            "health".into(),
            number_or_null(health, "scene_state.player.health")?,
        );
    }
    if let Some(hunger) = player.get("hunger") {
        out.insert(
            "hunger".into(),
            number_or_null(hunger, "scene_state.player.hunger")?,
        );
    }
    if let Some(dimension) = player.get("dimension") {
        out.insert(
            "dimension".into(),
            string_or_null(dimension, "scene_state.player.dimension")?,
        );
    }
    if let Some(position) = player.get("position") {
        out.insert(
            "position".into(),
            string_or_null(position, "scene_state.player.position")?,
        );
    }
    Ok(Value::Object(out))
}

fn normalize_scene_environment(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(env) = value.as_object() else {
        return Err(type_mismatch("scene_state.environment", "object or null"));
    };
    check_allowed_keys("scene_state.environment", env, &SCENE_ENV_KEYS)?;

    let mut out = Map::new();
    if let Some(biome) = env.get("biome") {
        out.insert(
            "biome".into(),
            string_or_null(biome, "scene_state.environment.biome")?,
        );
    }
    if let Some(weather) = env.get("weather") {
        out.insert(
            "weather".into(),
            string_or_null(weather, "scene_state.environment.weather")?,
        );
    }
    Ok(Value::Object(out))
}

fn normalize_scene_danger(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(danger) = value.as_object() else {
        return Err(type_mismatch("scene_state.danger", "object or null"));
    };
    check_allowed_keys("scene_state.danger", danger, &SCENE_DANGER_KEYS)?;

    let mut out = Map::new();
    if let Some(level) = danger.get("level") {
        out.insert(
            "level".into(),
            string_or_null(level, "scene_state.danger.level")?,
        );
    }
    if let Some(why) = danger.get("why") {
        out.insert(
            "why".into(),
            string_array_or_null(why, "scene_state.danger.why")?,
        );
    }
    Ok(Value::Object(out))
}

fn normalize_flags(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(flags) = value.as_object() else {
        return Err(type_mismatch("flags", "object or null"));
    };
    check_allowed_keys("flags", flags, &FLAGS_KEYS)?;

    let mut out = Map::new();
    if let Some(speaker) = flags.get("speaker") {
        // Legacy alias: older clients still send "LLM" for the text model.
        let canonical = match speaker.as_str() {
            Some("LLM") => "GPT",
            Some(s @ ("NONE" | "GPT" | "VISION")) => s,
            _ => return Err(type_mismatch("flags.speaker", "one of NONE|GPT|VISION")),
        };
        out.insert("speaker".into(), Value::from(canonical));
    }
    Ok(Value::Object(out))
}

fn normalize_counters(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(counters) = value.as_object() else {
        return Err(type_mismatch("counters", "object or null"));
    };
    check_allowed_keys("counters", counters, &COUNTERS_KEYS)?;

    let mut out = Map::new();
    if let Some(vision) = counters.get("vision_calls_60s") {
        let Some(buckets) = vision.as_object() else {
            return Err(type_mismatch("counters.vision_calls_60s", "object"));
        };
        check_allowed_keys("counters.vision_calls_60s", buckets, &VISION_BUCKET_KEYS)?;

        let mut buckets_out = Map::new();
        for (bucket, stamps) in buckets {
            let path = format!("counters.vision_calls_60s.{bucket}");
            let Some(items) = stamps.as_array() else {
                return Err(type_mismatch(path, "array of numbers"));
            };
            for (i, stamp) in items.iter().enumerate() {
                if !stamp.is_number() {
                    return Err(type_mismatch(format!("{path}[{i}]"), "number"));
                }
            }
            buckets_out.insert(bucket.clone(), stamps.clone());
        }
        out.insert("vision_calls_60s".into(), Value::Object(buckets_out));
    }
    Ok(Value::Object(out))
}

fn normalize_meta(value: &Value) -> Result<Value, SchemaError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let Some(meta) = value.as_object() else {
        return Err(type_mismatch("meta", "object or null"));
    };
    check_allowed_keys("meta", meta, &META_KEYS)?;

    let mut out = Map::new();
    if let Some(last_seen) = meta.get("last_seen") {
        out.insert(
            "last_seen".into(),
            number_or_null(last_seen, "meta.last_seen")?,
        );
    }
    if let Some(last_route) = meta.get("last_route") {
        match last_route {
            Value::Null => {}
            Value::String(route) if matches!(route.as_str(), "scene" | "chat" | "vision" | "tts") => {}
            _ => {
                return Err(type_mismatch(
                    "meta.last_route",
                    "one of scene|chat|vision|tts|null",
                ));
            }
        }
        out.insert("last_route".into(), last_route.clone());
    }
    Ok(Value::Object(out))
}
