//! Lenient normalization for previously-stored records.
//!
//! Stored state gets a gentler treatment than fresh input: the goal is that a
//! record can never become permanently unreadable, whatever an older build or
//! a corrupted row left behind.

use crate::record::merge::merge_onto_default;
use crate::schema;
use serde_json::Value;

/// Lenient speaker normalization for stored state: the legacy `"LLM"` maps
/// to `"GPT"`, recognized values pass, anything else falls back to `"NONE"`.
#[must_use]
pub fn lenient_speaker(value: &str) -> &'static str {
    match value {
        "LLM" | "GPT" => "GPT",
        "VISION" => "VISION",
        _ => "NONE",
    }
}

/// Normalize a previously-stored record, falling back to the canonical
/// default when it cannot be salvaged.
///
/// Unlike the strict patch path, an unrecognized stored `flags.speaker` is
/// silently rewritten to `"NONE"` before validation, so a single corrupt
/// enum value does not discard an otherwise-valid record. Any remaining
/// violation (unknown keys, forbidden prose, type drift) discards the stored
/// value entirely. The result is always merged onto a fresh default, so
/// every field a caller can read is populated unless the stored record
/// explicitly nulled it.
#[must_use]
pub fn sanitize_stored(stored: Option<&Value>) -> Value {
    let Some(stored) = stored else {
        return schema::default_record();
    };
    if !stored.is_object() {
        tracing::warn!("stored record is not a JSON object; substituting canonical default");
        return schema::default_record();
    }

    let mut candidate = stored.clone();
    if let Some(speaker) = candidate
        .get_mut("flags")
        .and_then(|flags| flags.get_mut("speaker"))
    {
        if let Some(raw) = speaker.as_str() {
            *speaker = Value::from(lenient_speaker(raw));
        }
    }

    match schema::validate_patch(&candidate) {
        Ok(normalized) => merge_onto_default(&normalized.into_value()),
        Err(err) => {
            tracing::warn!(error = %err, "stored record failed validation; substituting canonical default");
            schema::default_record()
        }
    }
}
