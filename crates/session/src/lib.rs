//! Session container for the signed-in user.
//!
//! The session (user plus bearer token) is the only state shared across
//! views. It is handed to components as a [`SessionContext`] rather than
//! read from a global, and it has an explicit lifecycle: [`SessionContext::sign_in`]
//! creates it, [`SessionContext::sign_out`] destroys it. Every write goes to
//! the [`SessionStore`] before it becomes visible in memory.

mod store;

pub use store::{FileSessionStore, InMemorySessionStore, SessionStore};

use domain::User;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Token value that older clients persisted when no token was available
pub const NO_CREDENTIAL_SENTINEL: &str = "undefined";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session document is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A usable bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Parse a raw token. Empty, blank and sentinel values are no credential.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if token.is_empty() || token == NO_CREDENTIAL_SENTINEL {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Signed-in user and the token proving it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl From<domain::AuthPayload> for Session {
    fn from(payload: domain::AuthPayload) -> Self {
        Self {
            user: payload.user,
            token: payload.token,
        }
    }
}

/// Shared handle to the current session
#[derive(Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    store: Arc<dyn SessionStore>,
    claims: Arc<Mutex<HashSet<String>>>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("current", &self.current)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

/// Exclusive claim on one pending change to the session user. Released on drop.
#[derive(Debug)]
pub struct SessionClaim {
    claims: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        self.claims
            .lock()
            .expect("Failed to acquire lock on session claims")
            .remove(&self.key);
    }
}

impl SessionContext {
    /// Start signed out, ignoring anything persisted
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            store,
            claims: Arc::default(),
        }
    }

    /// Start from whatever session the store holds
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let persisted = store.load()?;
        if let Some(session) = &persisted {
            tracing::info!(user_id = %session.user.id, "Restored persisted session");
        }
        Ok(Self {
            current: Arc::new(RwLock::new(persisted)),
            store,
            claims: Arc::default(),
        })
    }

    pub fn sign_in(&self, session: Session) -> Result<(), SessionError> {
        let mut current = self
            .current
            .write()
            .expect("Failed to acquire write lock on session");
        self.store.save(&session)?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        *current = Some(session);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), SessionError> {
        let mut current = self
            .current
            .write()
            .expect("Failed to acquire write lock on session");
        self.store.clear()?;
        if let Some(session) = current.take() {
            tracing::info!(user_id = %session.user.id, "Signed out");
        }
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current
            .read()
            .expect("Failed to acquire read lock on session")
            .is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .expect("Failed to acquire read lock on session")
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.current
            .read()
            .expect("Failed to acquire read lock on session")
            .as_ref()
            .map(|session| session.user.id.clone())
    }

    /// Stored token as-is, or `""` when signed out
    pub fn raw_token(&self) -> String {
        self.current
            .read()
            .expect("Failed to acquire read lock on session")
            .as_ref()
            .map(|session| session.token.clone())
            .unwrap_or_default()
    }

    pub fn credential(&self) -> Option<Credential> {
        Credential::parse(&self.raw_token())
    }

    /// Claim `key` for every clone of this context until the returned
    /// claim drops. `None` while someone else holds it.
    pub fn try_claim(&self, key: &str) -> Option<SessionClaim> {
        let mut claims = self.claims.lock().expect("Failed to acquire lock on session claims");
        if !claims.insert(key.to_string()) {
            return None;
        }
        Some(SessionClaim {
            claims: self.claims.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.claims
            .lock()
            .expect("Failed to acquire lock on session claims")
            .contains(key)
    }

    /// Apply `f` to the signed-in user and persist the result.
    ///
    /// The new value is written to the store before it replaces the
    /// in-memory one; if the write fails nothing changes. Returns `None`
    /// when signed out.
    pub fn update_user<R>(&self, f: impl FnOnce(&mut User) -> R) -> Result<Option<R>, SessionError> {
        let mut current = self
            .current
            .write()
            .expect("Failed to acquire write lock on session");
        let Some(existing) = current.as_ref() else {
            return Ok(None);
        };
        let mut next = existing.clone();
        let out = f(&mut next.user);
        self.store.save(&next)?;
        *current = Some(next);
        Ok(Some(out))
    }
}
