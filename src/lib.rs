#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod schema;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, MindstoreError, RecordError, Result, SchemaError};
pub use record::{
    CounterBucket, DebugSnapshot, DialogueRole, GateDecision, RecordManager, Speaker, SpeechLock,
};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, create_store};
