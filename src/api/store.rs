//! Session state storage shared by every step of a pipeline run.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::StoreError;

/// Identity of a session: (application name, user identifier, session identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// Key-value state owned by a session.
pub type State = HashMap<String, Value>;

/// A point-in-time copy of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub state: State,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            state: State::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.key.session_id
    }
}

/// Storage contract for sessions and their state.
///
/// A session is written by at most one pipeline run at a time, but distinct
/// sessions may be read and written concurrently.
pub trait SessionStore: Send + Sync {
    /// Creates an empty session. A fresh UUID is used when `session_id` is `None`.
    fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session, StoreError>;

    /// Returns a snapshot of the whole session.
    fn get_session(&self, key: &SessionKey) -> Result<Session, StoreError>;

    /// Reads one state entry.
    fn get(&self, key: &SessionKey, state_key: &str) -> Result<Value, StoreError>;

    /// Writes one state entry, replacing any previous value.
    fn set(&self, key: &SessionKey, state_key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes a session and its state.
    fn delete(&self, key: &SessionKey) -> Result<(), StoreError>;

    /// Lists the sessions a user owns within an application.
    fn list_sessions(&self, app_name: &str, user_id: &str) -> Vec<SessionKey>;

    /// Reads a state entry as text. String values are returned without quotes.
    fn get_string(&self, key: &SessionKey, state_key: &str) -> Result<String, StoreError> {
        Ok(value_to_text(self.get(key, state_key)?))
    }
}

/// Renders a state value as plain text.
pub fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionKey, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Session, StoreError> {
        let id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = SessionKey::new(app_name, user_id, id);

        match self.sessions.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::SessionExists(key)),
            Entry::Vacant(slot) => {
                let session = Session::new(key);
                slot.insert(session.clone());
                tracing::debug!(session_id = %session.id(), user_id, "session created");
                Ok(session)
            }
        }
    }

    fn get_session(&self, key: &SessionKey) -> Result<Session, StoreError> {
        self.sessions
            .get(key)
            .map(|s| s.value().clone())
            .ok_or_else(|| StoreError::SessionNotFound(key.clone()))
    }

    fn get(&self, key: &SessionKey, state_key: &str) -> Result<Value, StoreError> {
        let session = self
            .sessions
            .get(key)
            .ok_or_else(|| StoreError::SessionNotFound(key.clone()))?;
        session
            .state
            .get(state_key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound {
                session: key.clone(),
                key: state_key.to_string(),
            })
    }

    fn set(&self, key: &SessionKey, state_key: &str, value: Value) -> Result<(), StoreError> {
        let mut session = self
            .sessions
            .get_mut(key)
            .ok_or_else(|| StoreError::SessionNotFound(key.clone()))?;
        session.state.insert(state_key.to_string(), value);
        session.updated_at = Utc::now();
        Ok(())
    }

    fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.sessions
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::SessionNotFound(key.clone()))
    }

    fn list_sessions(&self, app_name: &str, user_id: &str) -> Vec<SessionKey> {
        self.sessions
            .iter()
            .filter(|s| s.key().app_name == app_name && s.key().user_id == user_id)
            .map(|s| s.key().clone())
            .collect()
    }
}
