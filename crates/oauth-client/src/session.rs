//! Per-user-agent session storage
//!
//! The client never owns session state. Callers inject a `Session` scoped to
//! one user agent, and are responsible for synchronizing it across their own
//! request handlers.

use std::collections::HashMap;
use std::sync::Mutex;

/// Session key for the pending flow's anti-CSRF state.
pub const STATE: &str = "state";
/// Session key for the pending flow's PKCE verifier.
pub const CODE_VERIFIER: &str = "code_verifier";
/// Session key for the pending flow's PKCE challenge.
pub const CODE_CHALLENGE: &str = "code_challenge";
pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const SCOPE: &str = "scope";

/// Key-value store for one user agent.
pub trait Session: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    fn delete(&self, key: &str);
}

/// In-process session backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.lock().insert(key.to_owned(), value);
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn set_get_delete() {
        let session = MemorySession::new();
        assert!(session.get(STATE).is_none());

        session.set(STATE, "12345".into());
        assert_eq!(session.get(STATE).as_deref(), Some("12345"));

        session.set(STATE, "67890".into());
        assert_eq!(session.get(STATE).as_deref(), Some("67890"));
        assert_eq!(session.len(), 1);

        session.delete(STATE);
        assert!(session.get(STATE).is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn delete_missing_key_is_noop() {
        let session = MemorySession::new();
        session.delete(ACCESS_TOKEN);
        assert!(session.is_empty());
    }

    #[test]
    fn concurrent_writes_dont_lose_keys() {
        let session = Arc::new(MemorySession::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let session = session.clone();
                std::thread::spawn(move || session.set(&format!("key-{i}"), i.to_string()))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(session.len(), 10);
    }
}
