//! Per-player record actor: serialized merge-patch mutations, the speech
//! lock, sliding-window counters, and read-time projections.

pub mod manager;
pub mod merge;
pub mod sanitize;
pub mod types;
pub mod view;

pub use manager::{COUNTER_WINDOW_MS, RecordManager};
pub use types::{CounterBucket, DebugSnapshot, DialogueRole, GateDecision, Speaker, SpeechLock};
