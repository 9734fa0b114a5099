//! Cookie-keyed session registry
//!
//! Each user agent gets a random session id in the `rp_session` cookie that
//! maps to its own `MemorySession`. Sessions expire after `idle_ttl` without a
//! request, and the registry never holds more than `capacity` of them: when
//! full, the least recently seen session is evicted to make room.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use oauth_client::MemorySession;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "rp_session";

#[derive(Debug)]
struct Entry {
    session: Arc<MemorySession>,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Mutex::default(),
            idle_ttl,
            capacity: capacity.max(1),
        }
    }

    /// Look up a live session and mark it as seen.
    pub fn get(&self, id: Uuid) -> Option<Arc<MemorySession>> {
        let now = Instant::now();
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&id)?;
        if now.duration_since(entry.last_seen) >= self.idle_ttl {
            sessions.remove(&id);
            return None;
        }
        entry.last_seen = now;
        Some(entry.session.clone())
    }

    /// Return the session for `id`, creating a new one (with a new id) if it
    /// is unknown, expired or absent.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<MemorySession>) {
        let now = Instant::now();
        let mut sessions = self.lock();
        self.sweep(&mut sessions, now);

        if let Some((id, entry)) = id.and_then(|id| sessions.get_mut(&id).map(|e| (id, e))) {
            entry.last_seen = now;
            return (id, entry.session.clone());
        }

        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session = %oldest, "evicted least recently seen session");
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(MemorySession::new());
        sessions.insert(
            id,
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        (id, session)
    }

    /// Forget a session, e.g. once its flow ended without tokens.
    pub fn remove(&self, id: Uuid) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "swept idle sessions");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
