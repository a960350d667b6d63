//! Error types for the contextkeeper domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all contextkeeper operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Context store errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Snapshot persistence errors ---
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    // --- Intent classifier errors ---
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised while importing or exporting a context store.
///
/// Every variant is reported *before* the store is touched.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid session id for storage: {0}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Classifier unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed classifier reply: {0}")]
    MalformedReply(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_displays_correctly() {
        let err = Error::Context(ContextError::InvalidSnapshot(
            "turn holds 7 messages but max_turns is 6".into(),
        ));
        assert!(err.to_string().contains("max_turns"));
        assert!(err.to_string().starts_with("Context error"));
    }

    #[test]
    fn snapshot_error_displays_correctly() {
        let err = Error::Snapshot(SnapshotError::InvalidId("../etc".into()));
        assert!(err.to_string().contains("../etc"));
    }

    #[test]
    fn serde_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
