use std::collections::HashMap;
use std::sync::Arc;

use carebot_schema::Session;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Shared handle to one conversation. Hold the lock for the whole turn so
/// turns of the same session are applied one at a time.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-memory session registry with idle expiry.
///
/// The map lock is only held to look up or insert a handle; per-session work
/// happens under the session's own mutex, so unrelated sessions never wait on
/// each other.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        }
    }

    /// Returns the live session for `id`, creating it when unknown or expired.
    /// A missing or blank id gets a fresh random one.
    pub async fn get_or_create(&self, id: Option<&str>) -> SessionHandle {
        let id = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&id) {
                if !self.is_stale(handle) {
                    return handle.clone();
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&id) {
            if !self.is_stale(handle) {
                return handle.clone();
            }
            tracing::info!(session_id = %id, "session expired, starting a new one");
        }

        let handle = Arc::new(Mutex::new(Session::new(id.clone())));
        sessions.insert(id, handle.clone());
        handle
    }

    /// Snapshot of a live session.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let handle = self.sessions.read().await.get(id).cloned()?;
        let session = handle.lock().await;
        if session.is_expired(self.ttl_secs) {
            return None;
        }
        Some(session.clone())
    }

    /// Drops the session for `id`. Returns `false` when there was no live
    /// session; an expired entry is discarded but still reported as absent.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        removed.is_some_and(|handle| !self.is_stale(&handle))
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| !self.is_stale(handle));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // A session that is locked is in the middle of a turn, hence not idle.
    fn is_stale(&self, handle: &SessionHandle) -> bool {
        match handle.try_lock() {
            Ok(session) => session.is_expired(self.ttl_secs),
            Err(_) => false,
        }
    }
}
