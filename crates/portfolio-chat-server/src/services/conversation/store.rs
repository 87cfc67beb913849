use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::summary::summarize_turns;
use super::types::{Session, SessionPolicy, Turn};

/// Thread-safe in-memory session store.
///
/// The map is a DashMap keyed by session id; each session sits behind its
/// own mutex so appends to one session serialize while different sessions
/// proceed independently. Sessions live for the process lifetime.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Arc<Mutex<Session>>>>,
    policy: SessionPolicy,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        info!(
            "Initializing session store (max_turns={}, retained_turns={}, window_turns={})",
            policy.max_turns, policy.retained_turns, policy.window_turns
        );
        Self {
            sessions: Arc::new(DashMap::new()),
            policy,
        }
    }

    fn handle(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.get(id) {
            return existing.value().clone();
        }

        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!("Created session {}", id);
                Arc::new(Mutex::new(Session::new(id)))
            })
            .value()
            .clone()
    }

    /// Snapshot of the session, creating an empty one on first use.
    pub fn get_or_create(&self, id: &str) -> Session {
        self.handle(id).lock().clone()
    }

    /// Appends a turn under the session lock. Returns the new turn count.
    pub fn append(&self, id: &str, user_text: impl Into<String>, ai_text: impl Into<String>) -> usize {
        let handle = self.handle(id);
        let mut session = handle.lock();

        let dropped = session.push_turn(Turn::new(user_text, ai_text), &self.policy);
        if dropped > 0 {
            info!(
                "Session {} exceeded {} turns, discarded {} oldest",
                id, self.policy.max_turns, dropped
            );
        }

        session.turns.len()
    }

    pub fn summarize(&self, id: &str) -> String {
        let handle = self.handle(id);
        let session = handle.lock();
        summarize_turns(&session.turns, self.policy.summary_recent_turns)
    }

    /// The most recent `n` turns, oldest first.
    pub fn window(&self, id: &str, n: usize) -> Vec<Turn> {
        let handle = self.handle(id);
        let session = handle.lock();
        session.window(n).to_vec()
    }

    /// Summary and configured window read under a single lock acquisition.
    pub fn context(&self, id: &str) -> (String, Vec<Turn>) {
        let handle = self.handle(id);
        let session = handle.lock();
        (
            summarize_turns(&session.turns, self.policy.summary_recent_turns),
            session.window(self.policy.window_turns).to_vec(),
        )
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats {
            active_sessions: self.len(),
            total_turns: 0,
            discarded_turns: 0,
        };

        for entry in self.sessions.iter() {
            let session = entry.value().lock();
            stats.total_turns += session.turns.len();
            stats.discarded_turns += session.discarded_turns;
        }

        stats
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub total_turns: usize,
    /// Turns dropped by truncation across all sessions
    pub discarded_turns: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = SessionStore::default();
        let first = store.get_or_create("s1");
        assert_eq!(first.id, "s1");
        assert!(first.turns.is_empty());

        store.append("s1", "hi", "hello");
        let again = store.get_or_create("s1");
        assert_eq!(again.turns.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_enforces_bound() {
        let store = SessionStore::default();
        for i in 0..20 {
            assert_eq!(store.append("s", format!("q{}", i), "a"), i + 1);
        }
        assert_eq!(store.append("s", "q20", "a"), 10);

        let window = store.window("s", 10);
        assert_eq!(window.first().map(|t| t.user_text.as_str()), Some("q11"));
        assert_eq!(window.last().map(|t| t.user_text.as_str()), Some("q20"));

        let stats = store.stats();
        assert_eq!(stats.total_turns, 10);
        assert_eq!(stats.discarded_turns, 11);
    }

    #[test]
    fn test_window_and_summary() {
        let store = SessionStore::default();
        store.append("s", "what projects has he built?", "a");
        for i in 0..3 {
            store.append("s", format!("filler {}", i), "a");
        }
        assert_eq!(store.summarize("s"), "");

        store.append("s", "thanks", "a");
        assert!(store.summarize("s").contains("discussed skills/projects"));

        let window = store.window("s", 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[1].user_text, "thanks");

        let (summary, window) = store.context("s");
        assert_eq!(summary, store.summarize("s"));
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_window_size_is_configurable() {
        let store = SessionStore::new(SessionPolicy {
            window_turns: 2,
            ..SessionPolicy::default()
        });
        for i in 0..5 {
            store.append("s", format!("q{}", i), "a");
        }
        let (_, window) = store.context("s");
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].user_text, "q3");
    }

    #[test]
    fn test_concurrent_appends_same_session() {
        let store = SessionStore::default();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let len = store.append("shared", format!("{}-{}", t, i), "a");
                        assert!(len <= 20);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let session = store.get_or_create("shared");
        assert!(session.turns.len() >= 10 && session.turns.len() <= 20);
        assert_eq!(session.turns.len() + session.discarded_turns, 400);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::default();
        store.append("a", "hi", "hello");
        store.append("b", "yo", "hey");
        store.append("b", "again", "sure");

        assert_eq!(store.window("a", 4).len(), 1);
        assert_eq!(store.window("b", 4).len(), 2);
        let stats = store.stats();
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.total_turns, 3);
        assert_eq!(stats.discarded_turns, 0);
    }
}
