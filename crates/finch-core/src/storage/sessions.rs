//! Per-session conversation history
//!
//! Each session id maps to the prior turns (user prompt + final answer) of
//! that conversation. A session serves one run at a time: `acquire` takes an
//! exclusive guard without waiting, so a concurrent request on the same id is
//! rejected instead of queued.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::ai::types::ChatMessage;
use crate::constants::sessions::{MAX_HISTORY_MESSAGES, MAX_SESSIONS, MAX_SESSION_ID_LEN};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session '{0}' is busy with another request")]
    Busy(String),

    #[error("invalid session id '{0}'")]
    InvalidId(String),
}

struct Entry {
    history: Arc<Mutex<Vec<ChatMessage>>>,
    last_used: Instant,
}

pub struct SessionStore {
    sessions: DashMap<String, Entry>,
    max_sessions: usize,
    max_history: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(MAX_SESSIONS, MAX_HISTORY_MESSAGES)
    }

    pub fn with_limits(max_sessions: usize, max_history: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            max_history,
        }
    }

    /// Take the session for one run, creating it on first use
    pub fn acquire(&self, id: &str) -> Result<SessionGuard, SessionError> {
        validate_id(id)?;

        let history = {
            let mut entry = self.sessions.entry(id.to_string()).or_insert_with(|| Entry {
                history: Arc::new(Mutex::new(Vec::new())),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            Arc::clone(&entry.history)
        };

        let history = history
            .try_lock_owned()
            .map_err(|_| SessionError::Busy(id.to_string()))?;

        self.prune();

        Ok(SessionGuard {
            id: id.to_string(),
            history,
            max_history: self.max_history,
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop the least recently used idle sessions above the limit
    fn prune(&self) {
        let excess = self.sessions.len().saturating_sub(self.max_sessions);
        if excess == 0 {
            return;
        }

        let mut idle: Vec<(String, Instant)> = self
            .sessions
            .iter()
            .filter(|e| Arc::strong_count(&e.history) == 1)
            .map(|e| (e.key().clone(), e.last_used))
            .collect();
        idle.sort_by_key(|(_, last_used)| *last_used);

        for (id, _) in idle.into_iter().take(excess) {
            // a guard may have been taken since the scan
            if self
                .sessions
                .remove_if(&id, |_, e| Arc::strong_count(&e.history) == 1)
                .is_some()
            {
                debug!(session_id = %id, "Pruned idle session");
            }
        }
    }
}

/// Exclusive access to one session's history
pub struct SessionGuard {
    id: String,
    history: OwnedMutexGuard<Vec<ChatMessage>>,
    max_history: usize,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Prior turns, oldest first
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Record a finished turn, keeping only the most recent messages
    pub fn commit(mut self, prompt: &str, response: &str) {
        self.history.push(ChatMessage::user(prompt));
        self.history.push(ChatMessage::assistant(response));

        let excess = self.history.len().saturating_sub(self.max_history);
        if excess > 0 {
            // whole turns only, so history never starts with an answer
            let excess = excess + excess % 2;
            self.history.drain(..excess);
        }
        debug!(session_id = %self.id, messages = self.history.len(), "Committed turn");
    }
}

fn validate_id(id: &str) -> Result<(), SessionError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::Role;

    #[test]
    fn second_acquire_is_busy_until_release() {
        let store = SessionStore::new();
        let guard = store.acquire("abc").unwrap();

        assert_eq!(
            store.acquire("abc").err(),
            Some(SessionError::Busy("abc".into()))
        );
        assert!(store.acquire("other").is_ok());

        drop(guard);
        assert!(store.acquire("abc").is_ok());
    }

    #[test]
    fn committed_turns_are_visible_next_time() {
        let store = SessionStore::new();
        let guard = store.acquire("s1").unwrap();
        assert!(guard.history().is_empty());
        guard.commit("What is NVDA trading at?", "About 182.55 USD.");

        let guard = store.acquire("s1").unwrap();
        let roles: Vec<Role> = guard.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(guard.history()[1].content, "About 182.55 USD.");
    }

    #[test]
    fn dropped_guard_commits_nothing() {
        let store = SessionStore::new();
        drop(store.acquire("s1").unwrap());
        assert!(store.acquire("s1").unwrap().history().is_empty());
    }

    #[test]
    fn history_keeps_latest_turns() {
        let store = SessionStore::with_limits(10, 4);
        for i in 0..5 {
            store
                .acquire("s")
                .unwrap()
                .commit(&format!("q{i}"), &format!("a{i}"));
        }

        let guard = store.acquire("s").unwrap();
        let contents: Vec<&str> = guard.history().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn odd_limit_still_starts_with_a_prompt() {
        let store = SessionStore::with_limits(10, 3);
        for i in 0..3 {
            store
                .acquire("s")
                .unwrap()
                .commit(&format!("q{i}"), &format!("a{i}"));
        }
        let guard = store.acquire("s").unwrap();
        assert_eq!(guard.history()[0].role, Role::User);
        assert!(guard.history().len() <= 3);
    }

    #[test]
    fn rejects_bad_ids() {
        let store = SessionStore::new();
        let long = "x".repeat(MAX_SESSION_ID_LEN + 1);
        for id in ["", "has space", "slash/y", long.as_str()] {
            assert!(matches!(store.acquire(id), Err(SessionError::InvalidId(_))), "{id}");
        }
        assert!(store.acquire("user-42:chat_1.a").is_ok());
    }

    #[test]
    fn prunes_oldest_idle_sessions() {
        let store = SessionStore::with_limits(2, 20);
        let held = store.acquire("held").unwrap();
        drop(store.acquire("old").unwrap());
        std::thread::sleep(std::time::Duration::from_millis(2));
        drop(store.acquire("new").unwrap());

        assert_eq!(store.len(), 2);
        assert!(store.sessions.contains_key("held"));
        assert!(store.sessions.contains_key("new"));
        assert!(!store.sessions.contains_key("old"));
        drop(held);
    }
}
