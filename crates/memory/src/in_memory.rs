//! In-memory snapshot backend: useful for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use contextkeeper_core::error::SnapshotError;
use contextkeeper_core::session::SessionId;
use contextkeeper_core::snapshot::{ContextSnapshot, SnapshotBackend};
use tokio::sync::RwLock;

/// Keeps snapshots in a map. Survives session-manager restarts within one
/// process when the same instance is shared.
pub struct InMemorySnapshots {
    snapshots: Arc<RwLock<HashMap<SessionId, ContextSnapshot>>>,
}

impl InMemorySnapshots {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, id: &SessionId) -> Option<ContextSnapshot> {
        self.snapshots.read().await.get(id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

impl Default for InMemorySnapshots {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotBackend for InMemorySnapshots {
    fn name(&self) -> &str { "in_memory" }

    async fn save(&self, id: &SessionId, snapshot: &ContextSnapshot) -> Result<(), SnapshotError> {
        self.snapshots.write().await.insert(id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(SessionId, ContextSnapshot)>, SnapshotError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .iter()
            .map(|(id, snapshot)| (id.clone(), snapshot.clone()))
            .collect())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, SnapshotError> {
        Ok(self.snapshots.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HierarchicalContextStore;

    #[tokio::test]
    async fn save_load_delete() {
        let backend = InMemorySnapshots::new();
        let id = SessionId::new();
        let snapshot = HierarchicalContextStore::new().export_state();

        backend.save(&id, &snapshot).await.unwrap();
        assert_eq!(backend.count().await, 1);
        assert_eq!(backend.get(&id).await, Some(snapshot));

        let all = backend.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, id);

        assert!(backend.delete(&id).await.unwrap());
        assert!(!backend.delete(&id).await.unwrap());
        assert_eq!(backend.count().await, 0);
    }

    #[tokio::test]
    async fn save_overwrites() {
        let backend = InMemorySnapshots::new();
        let id = SessionId::new();
        let mut store = HierarchicalContextStore::new();
        backend.save(&id, &store.export_state()).await.unwrap();

        store.store_message("later", Default::default(), contextkeeper_core::Role::User, None);
        backend.save(&id, &store.export_state()).await.unwrap();

        assert_eq!(backend.count().await, 1);
        assert_eq!(backend.get(&id).await.unwrap().turn.messages.len(), 1);
    }
}
