//! In-memory session store with idle pruning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::Session;

/// Shared, individually locked session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Configuration for idle-session pruning.
#[derive(Debug, Clone)]
pub struct PruningConfig {
    /// Idle time after which a session is dropped.
    pub max_idle: Duration,
    /// How often the background task scans the store.
    pub check_interval: Duration,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            max_idle: Duration::from_secs(3600),
            check_interval: Duration::from_secs(300),
        }
    }
}

impl PruningConfig {
    pub fn with_max_idle(max_idle: Duration) -> Self {
        Self {
            max_idle,
            // Scan at least every five minutes, more often for short timeouts.
            check_interval: max_idle.clamp(Duration::from_secs(1), Duration::from_secs(300)),
        }
    }
}

/// Result of one pruning pass.
#[derive(Debug, Clone)]
pub struct PruneResult {
    pub checked: usize,
    pub pruned: usize,
    pub timestamp: DateTime<Utc>,
}

/// Maps session ids to their state.
///
/// Each session has its own mutex, so requests for different sessions
/// never wait on each other.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    config: PruningConfig,
}

impl SessionStore {
    pub fn new(config: PruningConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Look up the session for `id`, creating a fresh one if it is unknown.
    pub async fn resolve(&self, id: Option<Uuid>) -> (Uuid, SessionHandle) {
        if let Some(id) = id
            && let Some(handle) = self.sessions.read().await.get(&id)
        {
            return (id, Arc::clone(handle));
        }

        let session = Session::new();
        let new_id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .await
            .insert(new_id, Arc::clone(&handle));
        tracing::debug!(session = %new_id, "Created session");
        (new_id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop every session idle for longer than the configured maximum.
    ///
    /// Sessions currently locked by a request are in use and are kept.
    pub async fn prune_idle(&self) -> PruneResult {
        let now = Utc::now();
        let max_idle =
            chrono::Duration::from_std(self.config.max_idle).unwrap_or(chrono::Duration::MAX);

        let mut sessions = self.sessions.write().await;
        let checked = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now.signed_duration_since(session.last_seen) <= max_idle,
            Err(_) => true,
        });

        PruneResult {
            checked,
            pruned: checked - sessions.len(),
            timestamp: now,
        }
    }

    /// Start the background pruning task.
    pub fn spawn_pruner(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let interval = self.config.check_interval;

        tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                max_idle_secs = store.config.max_idle.as_secs(),
                "Session pruning started"
            );

            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let result = store.prune_idle().await;
                if result.pruned > 0 {
                    tracing::info!(
                        pruned = result.pruned,
                        checked = result.checked,
                        "Pruned idle sessions"
                    );
                }
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(PruningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_creates_and_reuses() {
        let store = SessionStore::default();
        let (id, _) = store.resolve(None).await;
        assert_eq!(store.len().await, 1);

        let (same, handle) = store.resolve(Some(id)).await;
        assert_eq!(same, id);
        assert_eq!(handle.lock().await.id, id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_gets_fresh_session() {
        let store = SessionStore::default();
        let stale = Uuid::new_v4();
        let (id, _) = store.resolve(Some(stale)).await;
        assert_ne!(id, stale);
        assert!(store.get(stale).await.is_none());
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::default();
        let (a, handle_a) = store.resolve(None).await;
        let (b, handle_b) = store.resolve(None).await;
        assert_ne!(a, b);

        handle_a.lock().await.view = crate::session::View::TakeQuiz;
        assert_eq!(handle_b.lock().await.view, crate::session::View::Upload);
    }

    #[tokio::test]
    async fn test_prune_drops_idle_sessions() {
        let store = SessionStore::new(PruningConfig::with_max_idle(Duration::from_secs(60)));
        let (idle, handle) = store.resolve(None).await;
        let (active, _) = store.resolve(None).await;
        handle.lock().await.last_seen = Utc::now() - chrono::Duration::seconds(120);

        let result = store.prune_idle().await;
        assert_eq!(result.checked, 2);
        assert_eq!(result.pruned, 1);
        assert!(store.get(idle).await.is_none());
        assert!(store.get(active).await.is_some());
    }

    #[tokio::test]
    async fn test_prune_keeps_locked_sessions() {
        let store = SessionStore::new(PruningConfig::with_max_idle(Duration::from_secs(60)));
        let (id, handle) = store.resolve(None).await;
        let mut guard = handle.lock().await;
        guard.last_seen = Utc::now() - chrono::Duration::seconds(120);

        let result = store.prune_idle().await;
        assert_eq!(result.pruned, 0);
        drop(guard);
        assert!(store.get(id).await.is_some());
    }

    #[test]
    fn test_remove_forgets_session() {
        let store = SessionStore::default();
        let (id, _) = tokio_test::block_on(store.resolve(None));
        assert!(tokio_test::block_on(store.remove(id)));
        assert!(!tokio_test::block_on(store.remove(id)));
        assert!(tokio_test::block_on(store.is_empty()));
    }

    #[test]
    fn test_check_interval_follows_short_timeouts() {
        let config = PruningConfig::with_max_idle(Duration::from_secs(30));
        assert_eq!(config.check_interval, Duration::from_secs(30));
        let config = PruningConfig::with_max_idle(Duration::from_secs(7200));
        assert_eq!(config.check_interval, Duration::from_secs(300));
    }
}
