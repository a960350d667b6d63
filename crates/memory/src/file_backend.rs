//! File-based snapshot backend: one JSON document per session.
//!
//! Storage location: `<sessions dir>/<session_id>.json`, by default under
//! `~/.contextkeeper/sessions`.
//!
//! Snapshots are written to a temporary sibling and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact. Files that fail to
//! parse are skipped with a warning when loading; they never abort startup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contextkeeper_core::error::SnapshotError;
use contextkeeper_core::session::SessionId;
use contextkeeper_core::snapshot::{ContextSnapshot, SnapshotBackend};
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// A directory of per-session JSON snapshots.
pub struct FileSnapshots {
    dir: PathBuf,
}

impl FileSnapshots {
    /// Use `dir` for snapshots. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Path for a session's snapshot. Ids that could escape the directory
    /// are rejected.
    fn path_for(&self, id: &SessionId) -> Result<PathBuf, SnapshotError> {
        let raw = id.as_str();
        let unsafe_id = raw.is_empty()
            || raw.contains(['/', '\\'])
            || raw.contains("..")
            || raw.starts_with('.');
        if unsafe_id {
            return Err(SnapshotError::InvalidId(raw.to_string()));
        }
        Ok(self.dir.join(format!("{raw}.{EXTENSION}")))
    }

    fn read_snapshot(path: &Path) -> Option<(SessionId, ContextSnapshot)> {
        let stem = path.file_stem()?.to_str()?;
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable session snapshot");
                return None;
            }
        };
        match ContextSnapshot::from_json(&content) {
            Ok(snapshot) => Some((SessionId::from(stem), snapshot)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping corrupted session snapshot");
                None
            }
        }
    }
}

#[async_trait]
impl SnapshotBackend for FileSnapshots {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, id: &SessionId, snapshot: &ContextSnapshot) -> Result<(), SnapshotError> {
        let path = self.path_for(id)?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            SnapshotError::Storage(format!("Failed to create session directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(snapshot).map_err(|e| {
            SnapshotError::Storage(format!("Failed to serialize session snapshot: {e}"))
        })?;

        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        std::fs::write(&tmp, &content).map_err(|e| {
            SnapshotError::Storage(format!("Failed to write session snapshot: {e}"))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            SnapshotError::Storage(format!("Failed to move session snapshot into place: {e}"))
        })?;

        debug!(session_id = %id, path = %path.display(), "Session snapshot written");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(SessionId, ContextSnapshot)>, SnapshotError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SnapshotError::Storage(format!(
                    "Failed to read session directory: {e}"
                )));
            }
        };

        let mut snapshots: Vec<(SessionId, ContextSnapshot)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| Self::read_snapshot(&path))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(dir = %self.dir.display(), count = snapshots.len(), "Session snapshots loaded");
        Ok(snapshots)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, SnapshotError> {
        let path = self.path_for(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SnapshotError::Storage(format!(
                "Failed to delete session snapshot: {e}"
            ))),
        }
    }
}
