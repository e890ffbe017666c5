//! Maps browser sessions to their [`Session`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{Pipeline, Session};

struct SessionEntry {
    session: Arc<tokio::sync::Mutex<Session>>,
    last_active: Mutex<Instant>,
}

/// Session registry keyed by an opaque session key.
///
/// Each session sits behind its own async mutex so actions within one
/// session run one at a time while distinct sessions proceed in parallel.
pub struct SessionStore {
    pipeline: Arc<Pipeline>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(pipeline: Arc<Pipeline>, ttl: Duration) -> Self {
        Self {
            pipeline,
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Start an empty session and return its key
    pub fn create(&self) -> (String, Arc<tokio::sync::Mutex<Session>>) {
        let key = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(tokio::sync::Mutex::new(Session::new(self.pipeline.clone())));
        self.sessions.write().insert(
            key.clone(),
            SessionEntry {
                session: session.clone(),
                last_active: Mutex::new(Instant::now()),
            },
        );
        debug!(session = %key, "Session created");
        (key, session)
    }

    /// Look up a live session and mark it active
    pub fn get(&self, key: &str) -> Option<Arc<tokio::sync::Mutex<Session>>> {
        let sessions = self.sessions.read();
        let entry = sessions.get(key)?;
        *entry.last_active.lock() = Instant::now();
        Some(entry.session.clone())
    }

    /// Existing session for `key`, or a new one under a fresh key
    pub fn get_or_create(&self, key: Option<&str>) -> (String, Arc<tokio::sync::Mutex<Session>>) {
        if let Some(key) = key {
            if let Some(session) = self.get(key) {
                return (key.to_string(), session);
            }
        }
        self.create()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(*entry.last_active.lock()) < self.ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}
