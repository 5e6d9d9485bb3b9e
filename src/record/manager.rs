//! Per-player record actor.
//!
//! All mutating operations on one player run inside that player's critical
//! section and follow the same protocol: validate the incoming patch, merge
//! it onto the current record, re-validate the merged result, merge that onto
//! a fresh default, persist. A record in storage is therefore always
//! strictly valid, or recoverable by the lenient read path.

use crate::clock::Clock;
use crate::error::RecordError;
use crate::record::merge::{deep_merge, merge_onto_default};
use crate::record::sanitize::sanitize_stored;
use crate::record::types::{
    CounterBucket, DebugSnapshot, DialogueRole, GateDecision, Speaker, SpeechLock,
};
use crate::record::view;
use crate::schema::{self, NormalizedPatch};
use crate::store::RecordStore;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Sliding window for `bump_counter`, in milliseconds.
pub const COUNTER_WINDOW_MS: i64 = 60_000;

/// Owns the durable record of every player and serializes writes per player.
///
/// Reads (`get`, `get_view`, `vision_gate`, `debug_snapshot`) skip the
/// per-player lock; the storage backends guarantee non-torn single-key reads.
pub struct RecordManager {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

fn record_key(player: &str) -> String {
    format!("record:{player}")
}

fn contact_key(player: &str) -> String {
    format!("contact:{player}")
}

fn check_player(player: &str) -> Result<(), RecordError> {
    if player.is_empty() {
        return Err(RecordError::InvalidArgument(
            "player id must not be empty".into(),
        ));
    }
    Ok(())
}

fn storage_err(err: anyhow::Error) -> RecordError {
    RecordError::Storage(err.to_string())
}

/// Keep only numeric timestamps at or after the cutoff, preserving values.
#[allow(clippy::cast_precision_loss)]
fn prune_timestamps(bucket: Option<&Value>, cutoff: i64) -> Vec<Value> {
    let Some(Value::Array(entries)) = bucket else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.as_f64().is_some_and(|ts| ts >= cutoff as f64))
        .cloned()
        .collect()
}

impl RecordManager {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Critical-section handle for one player, created on first use.
    fn gate(&self, player: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates
            .entry(player.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Stamp the player's contact slot with the current time and return it.
    async fn touch_contact(&self, player: &str) -> Result<i64, RecordError> {
        let now = self.clock.now_ms();
        self.store
            .put(&contact_key(player), now.to_string().as_bytes())
            .await
            .map_err(storage_err)?;
        Ok(now)
    }

    async fn load_contact(&self, player: &str) -> Result<Option<i64>, RecordError> {
        let bytes = self
            .store
            .get(&contact_key(player))
            .await
            .map_err(storage_err)?;
        Ok(bytes
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|text| text.parse::<i64>().ok()))
    }

    /// Raw stored record, or `None` when absent or undecodable.
    async fn load_stored(&self, player: &str) -> Result<Option<Value>, RecordError> {
        let Some(bytes) = self
            .store
            .get(&record_key(player))
            .await
            .map_err(storage_err)?
        else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(%player, error = %err, "stored record is not valid JSON, resetting");
                Ok(None)
            }
        }
    }

    /// Current record through the lenient read path, merged onto the default.
    async fn current(&self, player: &str) -> Result<Value, RecordError> {
        let stored = self.load_stored(player).await?;
        Ok(sanitize_stored(stored.as_ref()))
    }

    async fn persist(&self, player: &str, record: &Value) -> Result<(), RecordError> {
        let bytes = serde_json::to_vec(record).map_err(|err| RecordError::Storage(err.to_string()))?;
        self.store
            .put(&record_key(player), &bytes)
            .await
            .map_err(storage_err)
    }

    /// Merge a validated patch onto `current`, re-validate, persist.
    ///
    /// Caller must hold the player's gate.
    async fn commit_patch(
        &self,
        player: &str,
        current: &Value,
        patch: NormalizedPatch,
    ) -> Result<Value, RecordError> {
        let mut merged = current.clone();
        deep_merge(&mut merged, &patch.into_value());
        let revalidated = schema::validate_patch(&merged)?;
        let committed = merge_onto_default(&revalidated.into_value());
        self.persist(player, &committed).await?;
        Ok(committed)
    }

    /// Current record; synthesizes the canonical default for new players
    /// without writing it back.
    pub async fn get(&self, player: &str) -> Result<Value, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        self.current(player).await
    }

    /// `get` plus the read-time staleness decay on `scene_state.confidence`.
    pub async fn get_view(&self, player: &str) -> Result<Value, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        let record = self.current(player).await?;
        Ok(view::decay_stale_scene(&record, self.clock.now_ms()))
    }

    /// Replace the record wholesale: fields omitted from `candidate` revert
    /// to their canonical defaults, not to their previous values.
    pub async fn replace(&self, player: &str, candidate: &Value) -> Result<Value, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        let normalized = schema::validate_patch(candidate)?;
        let committed = merge_onto_default(&normalized.into_value());
        let gate = self.gate(player);
        let _guard = gate.lock().await;
        self.persist(player, &committed).await?;
        Ok(committed)
    }

    /// Merge-patch the record. Empty patches commit the prior record
    /// unchanged; invalid patches leave storage untouched.
    pub async fn patch(&self, player: &str, partial: &Value) -> Result<Value, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        let normalized = schema::validate_patch(partial)?;
        let gate = self.gate(player);
        let _guard = gate.lock().await;
        let current = self.current(player).await?;
        self.commit_patch(player, &current, normalized).await
    }

    /// Claim the speech lock: set `flags.speaker` and stamp
    /// `speech_lock_until` from this actor's clock. `cooldown_ms = None`
    /// clears the lock timestamp while still switching the speaker.
    pub async fn acquire_speech_lock(
        &self,
        player: &str,
        speaker: &str,
        cooldown_ms: Option<f64>,
    ) -> Result<SpeechLock, RecordError> {
        check_player(player)?;
        let resolved: Speaker = speaker.parse().map_err(|_| {
            RecordError::InvalidArgument(format!(
                "invalid speaker '{speaker}', expected one of NONE|GPT|VISION|LLM"
            ))
        })?;
        let now = self.touch_contact(player).await?;
        let until = match cooldown_ms {
            None => None,
            Some(ms) => {
                if !ms.is_finite() || ms < 0.0 {
                    return Err(RecordError::InvalidArgument(format!(
                        "cooldown_ms must be a non-negative finite number, got {ms}"
                    )));
                }
                #[allow(clippy::cast_possible_truncation)]
                Some(now + ms.floor() as i64)
            }
        };

        let patch = json!({
            "flags": { "speaker": resolved.to_string() },
            "speech_lock_until": until,
            "meta": { "last_seen": now },
        });
        let normalized = schema::validate_patch(&patch)?;
        let gate = self.gate(player);
        let _guard = gate.lock().await;
        let current = self.current(player).await?;
        self.commit_patch(player, &current, normalized).await?;

        Ok(SpeechLock {
            speaker: resolved,
            speech_lock_until: until,
        })
    }

    /// Record one event in the named 60-second counter bucket and return the
    /// bucket's post-bump length. All buckets are pruned on every bump so
    /// idle ones cannot grow without bound.
    pub async fn bump_counter(&self, player: &str, reason: &str) -> Result<usize, RecordError> {
        check_player(player)?;
        let bucket: CounterBucket = reason.parse().map_err(|_| {
            RecordError::InvalidArgument(format!(
                "invalid counter reason '{reason}', expected one of chat|tactical|auto"
            ))
        })?;
        let now = self.touch_contact(player).await?;
        let gate = self.gate(player);
        let _guard = gate.lock().await;
        let current = self.current(player).await?;

        let stored = current
            .get("counters")
            .and_then(|counters| counters.get("vision_calls_60s"));
        let cutoff = now - COUNTER_WINDOW_MS;
        let mut buckets = Map::new();
        let mut bumped_len = 0;
        for which in CounterBucket::ALL {
            let mut kept = prune_timestamps(stored.and_then(|b| b.get(which.as_key())), cutoff);
            if which == bucket {
                kept.push(Value::from(now));
                bumped_len = kept.len();
            }
            buckets.insert(which.as_key().to_string(), Value::Array(kept));
        }

        let patch = json!({
            "counters": { "vision_calls_60s": Value::Object(buckets) },
            "meta": { "last_seen": now },
        });
        let normalized = schema::validate_patch(&patch)?;
        self.commit_patch(player, &current, normalized).await?;
        Ok(bumped_len)
    }

    /// Append one dialogue line, evicting the oldest beyond the cap, and
    /// return the committed dialogue length. The read-append-write runs as
    /// one unit under the player's gate, so concurrent appends both survive.
    pub async fn append_dialogue(
        &self,
        player: &str,
        speaker: &str,
        text: &str,
    ) -> Result<usize, RecordError> {
        check_player(player)?;
        let role: DialogueRole = speaker.parse().map_err(|_| {
            RecordError::InvalidArgument(format!(
                "invalid dialogue speaker '{speaker}', expected one of player|system"
            ))
        })?;
        let now = self.touch_contact(player).await?;
        let gate = self.gate(player);
        let _guard = gate.lock().await;
        let current = self.current(player).await?;

        let mut entries = match current.get("dialogue") {
            Some(Value::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        entries.push(json!({ "speaker": role.as_key(), "text": text, "ts": now }));
        if entries.len() > schema::DIALOGUE_CAP {
            entries.drain(..entries.len() - schema::DIALOGUE_CAP);
        }
        let committed_len = entries.len();

        let patch = json!({
            "dialogue": entries,
            "meta": { "last_seen": now },
        });
        let normalized = schema::validate_patch(&patch)?;
        self.commit_patch(player, &current, normalized).await?;
        Ok(committed_len)
    }

    /// Report whether a new vision capture is allowed under `cooldown_ms`.
    /// Pure read; never mutates the record.
    pub async fn vision_gate(
        &self,
        player: &str,
        cooldown_ms: i64,
    ) -> Result<GateDecision, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        let record = self.current(player).await?;
        Ok(view::vision_gate(&record, self.clock.now_ms(), cooldown_ms))
    }

    /// Tolerant projection over the raw stored value. No validation runs;
    /// unreadable fields come out as their empty forms.
    pub async fn debug_snapshot(&self, player: &str) -> Result<DebugSnapshot, RecordError> {
        check_player(player)?;
        self.touch_contact(player).await?;
        let record = self.load_stored(player).await?.unwrap_or_else(|| json!({}));

        let speaker = record
            .pointer("/flags/speaker")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<Speaker>().ok());
        let speech_lock_until = record.get("speech_lock_until").and_then(Value::as_i64);
        let counters = record.get("counters").cloned().unwrap_or(Value::Null);
        let last_seen = self.load_contact(player).await?;

        Ok(DebugSnapshot {
            speaker,
            speech_lock_until,
            counters,
            last_seen,
        })
    }
}
