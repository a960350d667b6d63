//! Session manager: maps session ids to context stores.
//!
//! Each session's store sits behind its own `RwLock`, so writes to one
//! session are serialized while other sessions proceed in parallel. Readers
//! receive detached copies ([`ContextSummary`], [`ContextStats`],
//! [`ContextSnapshot`]) taken under the read lock, never live references.
//!
//! Every mutating access writes a snapshot through the configured
//! [`SnapshotBackend`] while still holding the session's write lock, so
//! snapshots of one session land in mutation order. A failed write is
//! logged and the in-memory state stays authoritative.

use std::collections::HashMap;
use std::sync::Arc;

use contextkeeper_core::error::ContextError;
use contextkeeper_core::message::{IntentLabels, Keyword, Role};
use contextkeeper_core::session::SessionId;
use contextkeeper_core::snapshot::{ContextSnapshot, SnapshotBackend};
use contextkeeper_memory::{
    ContextStats, ContextSummary, DEFAULT_MAX_TURNS, HierarchicalContextStore, NoopSnapshots,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Shared handle to one session's store.
pub type SessionHandle = Arc<RwLock<HierarchicalContextStore>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub stats: ContextStats,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    snapshots: Arc<dyn SnapshotBackend>,
    max_turns: usize,
}

impl SessionManager {
    /// An empty manager. Nothing is loaded from `snapshots`; use
    /// [`SessionManager::load`] to restore persisted sessions.
    pub fn new(snapshots: Arc<dyn SnapshotBackend>, max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            snapshots,
            max_turns: max_turns.max(1),
        }
    }

    /// A manager with persistence disabled and default settings.
    pub fn ephemeral() -> Self {
        Self::new(Arc::new(NoopSnapshots), DEFAULT_MAX_TURNS)
    }

    /// Build a manager and re-register every persisted session under its
    /// original id. Snapshots that fail validation are skipped; a backend
    /// that cannot be read at all yields an empty manager.
    pub async fn load(snapshots: Arc<dyn SnapshotBackend>, max_turns: usize) -> Self {
        let manager = Self::new(snapshots, max_turns);

        let persisted = match manager.snapshots.load_all().await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(backend = manager.snapshots.name(), error = %e, "Failed to load session snapshots, starting empty");
                return manager;
            }
        };

        let mut restored = 0usize;
        {
            let mut sessions = manager.sessions.write().await;
            for (id, snapshot) in persisted {
                let mut store = HierarchicalContextStore::with_max_turns(manager.max_turns);
                match store.import_state(snapshot) {
                    Ok(()) => {
                        sessions.insert(id, Arc::new(RwLock::new(store)));
                        restored += 1;
                    }
                    Err(e) => {
                        warn!(session_id = %id, error = %e, "Skipping invalid session snapshot");
                    }
                }
            }
        }

        info!(
            backend = manager.snapshots.name(),
            sessions = restored,
            "Sessions restored"
        );
        manager
    }

    pub fn backend_name(&self) -> &str {
        self.snapshots.name()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Create and register an empty session. The empty store is persisted
    /// right away so the session survives a restart before first use.
    pub async fn start_session(&self) -> SessionId {
        let id = SessionId::new();
        let store = HierarchicalContextStore::with_max_turns(self.max_turns);
        let snapshot = store.export_state();
        let handle: SessionHandle = Arc::new(RwLock::new(store));

        // Hold the store's lock until the first snapshot is written so a
        // concurrent writer cannot overtake it.
        let guard = handle.write().await;
        self.sessions.write().await.insert(id.clone(), Arc::clone(&handle));
        self.persist(&id, &snapshot).await;
        drop(guard);

        info!(session_id = %id, "Session started");
        id
    }

    /// Remove a session and its snapshot. Returns `false` if it did not
    /// exist.
    pub async fn end_session(&self, id: &SessionId) -> bool {
        let Some(handle) = self.sessions.write().await.remove(id) else {
            debug!(session_id = %id, "end_session on unknown session");
            return false;
        };

        // Wait out any in-flight writer so its snapshot cannot land after
        // the delete.
        let _guard = handle.write().await;
        if let Err(e) = self.snapshots.delete(id).await {
            warn!(session_id = %id, error = %e, "Failed to delete session snapshot");
        }

        info!(session_id = %id, "Session ended");
        true
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub async fn get_context(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Sorted ids of every live session.
    pub async fn list_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn session_exists(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Run `f` against a session's store under its read lock.
    pub async fn with_session<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&HierarchicalContextStore) -> R,
    ) -> Option<R> {
        let handle = self.get_context(id).await?;
        let store = handle.read().await;
        Some(f(&*store))
    }

    pub async fn summary(&self, id: &SessionId) -> Option<ContextSummary> {
        self.with_session(id, HierarchicalContextStore::get_context_summary)
            .await
    }

    pub async fn get_session_stats(&self, id: &SessionId) -> Option<SessionStats> {
        let stats = self.with_session(id, HierarchicalContextStore::get_stats).await?;
        Some(SessionStats {
            session_id: id.clone(),
            stats,
        })
    }

    pub async fn export_context(&self, id: &SessionId) -> Option<ContextSnapshot> {
        self.with_session(id, HierarchicalContextStore::export_state)
            .await
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Run `f` against a session's store under its write lock, then write a
    /// snapshot before releasing the lock. Returns `None` for unknown or
    /// concurrently ended sessions.
    pub async fn with_session_mut<R>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut HierarchicalContextStore) -> R,
    ) -> Option<R> {
        let handle = self.get_context(id).await?;
        let mut store = handle.write().await;

        // The session may have been ended while we waited for the lock.
        if !self.session_exists(id).await {
            debug!(session_id = %id, "Session ended before write");
            return None;
        }

        let result = f(&mut *store);
        let snapshot = store.export_state();
        self.persist(id, &snapshot).await;
        Some(result)
    }

    /// Store one message in a session. Returns `false` if the session does
    /// not exist.
    pub async fn store_message(
        &self,
        id: &SessionId,
        content: &str,
        intent_labels: IntentLabels,
        role: Role,
        keywords: Option<Vec<Keyword>>,
    ) -> bool {
        self.with_session_mut(id, |store| {
            store.store_message(content, intent_labels, role, keywords)
        })
        .await
        .is_some()
    }

    /// Replace a session's state with `snapshot`. The outer `None` means the
    /// session does not exist; an invalid snapshot leaves the store as it was.
    pub async fn import_context(
        &self,
        id: &SessionId,
        snapshot: ContextSnapshot,
    ) -> Option<Result<(), ContextError>> {
        self.with_session_mut(id, |store| store.import_state(snapshot))
            .await
    }

    /// Clear every tier of a session but keep the session itself. The
    /// session goes back to this manager's Turn Context cap, even if a
    /// restored or imported snapshot carried a different one.
    pub async fn reset_session(&self, id: &SessionId) -> bool {
        let max_turns = self.max_turns;
        self.with_session_mut(id, |store| {
            store.clear_all();
            store.set_max_turns(max_turns);
        })
        .await
        .is_some()
    }

    async fn persist(&self, id: &SessionId, snapshot: &ContextSnapshot) {
        if let Err(e) = self.snapshots.save(id, snapshot).await {
            warn!(session_id = %id, backend = self.snapshots.name(), error = %e, "Failed to write session snapshot");
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::ephemeral()
    }
}
