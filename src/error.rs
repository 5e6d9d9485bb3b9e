use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Mindstore`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum MindstoreError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Record operations ────────────────────────────────────────────────
    #[error("record: {0}")]
    Record(#[from] RecordError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Schema errors ───────────────────────────────────────────────────────────

/// Validation failures raised while checking a record or patch against the
/// fixed schema. Every variant names the offending field(s) so callers can
/// report exactly what was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("patch must be a JSON object")]
    NotAnObject,

    #[error("unknown keys in {scope}: {}", .keys.join(", "))]
    UnknownKeys { scope: String, keys: Vec<String> },

    #[error("forbidden keys present: {}", .paths.join(", "))]
    ForbiddenKey { paths: Vec<String> },

    #[error("{path}: expected {expected}")]
    TypeMismatch { path: String, expected: String },
}

// ─── Record actor errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage: {0}")]
    Storage(String),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, MindstoreError>;
