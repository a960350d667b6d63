//! Snapshot document and persistence trait.
//!
//! A snapshot is the lossless serialized form of one session's context
//! store. It has three top-level fields:
//!
//! ```json
//! {
//!   "core": { "content": "...", "keywords": [], "timestamp": "...", "intent_labels": [] },
//!   "evolving": [ ... ],
//!   "turn": { "max_turns": 6, "messages": [ { "role": "user", ... } ] }
//! }
//! ```
//!
//! Timestamps are RFC 3339 with full sub-second precision, so they come back
//! exactly as they went out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ContextError, SnapshotError};
use crate::message::{ContextItem, Message};
use crate::session::SessionId;

/// Serialized state of a hierarchical context store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextSnapshot {
    /// The standing problem definition, if any
    pub core: Option<ContextItem>,

    /// Constraints and refinements, oldest first
    pub evolving: Vec<ContextItem>,

    /// Recent raw messages plus the configured cap
    pub turn: TurnSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnSnapshot {
    pub max_turns: usize,
    pub messages: Vec<Message>,
}

impl ContextSnapshot {
    /// Parse a snapshot from JSON, reporting failures as [`ContextError`].
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        serde_json::from_str(json).map_err(|e| ContextError::Malformed(e.to_string()))
    }

    /// Check structural invariants that serde alone cannot express.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.turn.max_turns == 0 {
            return Err(ContextError::InvalidSnapshot(
                "turn.max_turns must be at least 1".into(),
            ));
        }
        if self.turn.messages.len() > self.turn.max_turns {
            return Err(ContextError::InvalidSnapshot(format!(
                "turn holds {} messages but max_turns is {}",
                self.turn.messages.len(),
                self.turn.max_turns
            )));
        }
        Ok(())
    }
}

/// Durable storage for session snapshots.
///
/// Implementations: file (one JSON document per session), in-memory (for
/// testing), none (persistence disabled).
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Write (or overwrite) the snapshot for a session.
    async fn save(&self, id: &SessionId, snapshot: &ContextSnapshot) -> Result<(), SnapshotError>;

    /// Load every readable snapshot. Unreadable entries are skipped by the
    /// backend and do not fail the whole call.
    async fn load_all(&self) -> Result<Vec<(SessionId, ContextSnapshot)>, SnapshotError>;

    /// Remove a session's snapshot. Returns `false` if there was none.
    async fn delete(&self, id: &SessionId) -> Result<bool, SnapshotError>;
}
