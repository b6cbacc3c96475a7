//! In-memory conversation sessions with bounded history.
//!
//! A session holds the most recent user/assistant exchange pairs, capped
//! at `max_history`; older pairs are evicted oldest-first. History is
//! rendered as a plain transcript for inclusion in the system prompt.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Exchange {
    user: String,
    assistant: String,
}

pub struct SessionStore {
    max_history: usize,
    sessions: Mutex<HashMap<String, Vec<Exchange>>>,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a fresh session and return its id.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), Vec::new());
        id
    }

    /// Record one completed user/assistant exchange. Unknown session ids
    /// start a new history under that id.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }
    }

    /// Transcript of the retained exchanges, oldest first, or `None` when
    /// the session is unknown or empty.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let history = sessions.get(session_id)?;
        if history.is_empty() {
            return None;
        }
        let lines: Vec<String> = history
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
            .collect();
        Some(lines.join("\n"))
    }

    /// Drop a session and its history.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_no_history() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        assert!(store.history(&id).is_none());
    }

    #[test]
    fn history_renders_in_chronological_order() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        store.add_exchange(&id, "first question", "first answer");
        store.add_exchange(&id, "second question", "second answer");

        let transcript = store.history(&id).unwrap();
        assert_eq!(
            transcript,
            "User: first question\nAssistant: first answer\n\
             User: second question\nAssistant: second answer"
        );
    }

    #[test]
    fn oldest_exchanges_are_evicted_first() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        store.add_exchange(&id, "q1", "a1");
        store.add_exchange(&id, "q2", "a2");
        store.add_exchange(&id, "q3", "a3");

        let transcript = store.history(&id).unwrap();
        assert!(!transcript.contains("q1"));
        assert!(transcript.contains("q2"));
        assert!(transcript.contains("q3"));
    }

    #[test]
    fn unknown_session_id_starts_a_history() {
        let store = SessionStore::new(2);
        store.add_exchange("external-id", "q", "a");
        assert!(store.history("external-id").unwrap().contains("q"));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new(2);
        let a = store.create_session();
        let b = store.create_session();
        store.add_exchange(&a, "only in a", "yes");
        assert!(store.history(&b).is_none());
    }

    #[test]
    fn clear_session_removes_history() {
        let store = SessionStore::new(2);
        let id = store.create_session();
        store.add_exchange(&id, "q", "a");
        store.clear_session(&id);
        assert!(store.history(&id).is_none());
    }

    #[test]
    fn zero_max_history_retains_nothing() {
        let store = SessionStore::new(0);
        let id = store.create_session();
        store.add_exchange(&id, "q", "a");
        assert!(store.history(&id).is_none());
    }
}
