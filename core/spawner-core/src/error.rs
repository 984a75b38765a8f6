//! Error types for spawner-core operations.
//!
//! Most of the hook path recovers locally (missing state → fresh session,
//! malformed marker → skipped event), so these errors rarely reach a user.
//! They exist so the recovery sites can log what actually went wrong.

use std::path::PathBuf;

/// All errors that can occur in spawner-core operations.
#[derive(Debug, thiserror::Error)]
pub enum SpawnerError {
    // ─────────────────────────────────────────────────────────────────────
    // Event Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid {kind} event: {reason}")]
    InvalidEvent { kind: &'static str, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("State lock unavailable: {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SpawnerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SpawnerError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        SpawnerError::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        SpawnerError::InvalidEvent {
            kind,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results using SpawnerError.
pub type Result<T> = std::result::Result<T, SpawnerError>;

// Conversion for string error compatibility
impl From<SpawnerError> for String {
    fn from(err: SpawnerError) -> String {
        err.to_string()
    }
}
