use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Who currently holds the right to speak for a player.
///
/// The wire format stores the uppercase spelling; `"LLM"` is a legacy alias
/// that parses to [`Speaker::Gpt`] and is never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Speaker {
    #[strum(serialize = "NONE")]
    #[serde(rename = "NONE")]
    None,
    #[strum(to_string = "GPT", serialize = "LLM")]
    #[serde(rename = "GPT")]
    Gpt,
    #[strum(serialize = "VISION")]
    #[serde(rename = "VISION")]
    Vision,
}

/// Sliding-window counter buckets for vision calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CounterBucket {
    Chat,
    Tactical,
    Auto,
}

impl CounterBucket {
    pub const ALL: [CounterBucket; 3] = [Self::Chat, Self::Tactical, Self::Auto];

    /// Wire key of this bucket inside `counters.vision_calls_60s`.
    #[must_use]
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Tactical => "tactical",
            Self::Auto => "auto",
        }
    }
}

/// Originator of a dialogue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DialogueRole {
    Player,
    System,
}

impl DialogueRole {
    /// Wire value stored in `dialogue[i].speaker`.
    #[must_use]
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::System => "system",
        }
    }
}

/// Outcome of a successful speech-lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeechLock {
    pub speaker: Speaker,
    pub speech_lock_until: Option<i64>,
}

/// Read-only cooldown decision for a prospective vision capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    pub proceed: bool,
    /// Milliseconds since the last recorded capture, when one exists.
    pub age_ms: Option<i64>,
}

/// Operational projection of one record: who may speak, until when, the
/// current call pressure, and when the player last contacted us.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub speaker: Option<Speaker>,
    pub speech_lock_until: Option<i64>,
    pub counters: Value,
    pub last_seen: Option<i64>,
}
