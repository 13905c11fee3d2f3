use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Profile snapshot as returned by the auth endpoints. Optional fields stay
/// empty strings on the wire, so everything deserializes with a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Why a session stopped being usable. `Expired` corresponds to a 401 from
/// the backend; `LoggedOut` to an explicit user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    Expired,
    LoggedOut,
}

/// Explicit session context handed to the dialogue controllers at
/// construction, replacing ad hoc reads of ambient storage. Cloning shares
/// the underlying state, so the client's 401 callback and the controllers
/// observe the same session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    last_invalidation: Option<InvalidationReason>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        store.set(session);
        store
    }

    pub fn set(&self, session: Session) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.session = Some(session);
        state.last_invalidation = None;
    }

    pub fn session(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .session
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn invalidate(&self, reason: InvalidationReason) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if state.session.take().is_some() {
            info!("Session invalidated: {:?}", reason);
        }
        state.last_invalidation = Some(reason);
    }

    /// Set by the 401 handler; the login surface uses it to show the
    /// "session expired" notice.
    pub fn last_invalidation(&self) -> Option<InvalidationReason> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last_invalidation
    }
}
