//! No-op snapshot backend: disables session persistence entirely.

use async_trait::async_trait;
use contextkeeper_core::error::SnapshotError;
use contextkeeper_core::session::SessionId;
use contextkeeper_core::snapshot::{ContextSnapshot, SnapshotBackend};

/// A no-op backend that stores nothing.
pub struct NoopSnapshots;

#[async_trait]
impl SnapshotBackend for NoopSnapshots {
    fn name(&self) -> &str { "none" }

    async fn save(&self, _id: &SessionId, _snapshot: &ContextSnapshot) -> Result<(), SnapshotError> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(SessionId, ContextSnapshot)>, SnapshotError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _id: &SessionId) -> Result<bool, SnapshotError> {
        Ok(false)
    }
}
