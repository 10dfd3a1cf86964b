//! Process-wide registry of active streaming ping sessions.
//!
//! The registry is the only state shared between sessions. Each entry holds
//! the channel used to ask the owning session to stop, and a handle to the
//! session's statistics. Every mutation happens under a single lock, so
//! insert-if-absent and remove-if-present are atomic per identifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::stats::{ProbeStats, StatsSummary};

/// Channel on which a stopped session reports its final summary
pub type StopReply = oneshot::Sender<StatsSummary>;

struct Entry {
    token: u64,
    stop_tx: oneshot::Sender<StopReply>,
    stats: Arc<Mutex<ProbeStats>>,
}

/// Handles given to a session when it is registered
pub struct Registration {
    pub id: String,
    /// Distinguishes this session from later ones reusing the same identifier
    pub token: u64,
    pub stop_rx: oneshot::Receiver<StopReply>,
    pub stats: Arc<Mutex<ProbeStats>>,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Entry>>>,
    next_token: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `id` unless one is already active
    pub async fn register(&self, id: &str) -> Result<Registration, SessionError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(id) {
            return Err(SessionError::AlreadyRunning(id.to_string()));
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = oneshot::channel();
        let stats = Arc::new(Mutex::new(ProbeStats::new()));

        sessions.insert(id.to_string(), Entry { token, stop_tx, stats: stats.clone() });
        debug!(session = id, token, "Registered ping session");

        Ok(Registration { id: id.to_string(), token, stop_rx, stats })
    }

    /// Stop the session registered under `id` and return its summary.
    ///
    /// Returns `None` if no session is registered under `id`.
    pub async fn stop(&self, id: &str) -> Option<StatsSummary> {
        let entry = self.sessions.lock().await.remove(id)?;
        info!(session = id, "Stopping ping session");

        let (reply_tx, reply_rx) = oneshot::channel();
        if entry.stop_tx.send(reply_tx).is_ok() {
            if let Ok(summary) = reply_rx.await {
                return Some(summary);
            }
        }

        // The session ended on its own before it could answer.
        let summary = entry.stats.lock().await.summarize();
        Some(summary)
    }

    /// Remove the entry for `id` if it still belongs to the session `token`
    pub async fn release(&self, id: &str, token: u64) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(id) {
            Some(entry) if entry.token == token => {
                sessions.remove(id);
                debug!(session = id, token, "Released ping session");
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
