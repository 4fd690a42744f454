use crate::{Session, SessionError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Persistence for the signed-in session.
/// Backends only need to hold one value; it survives reloads of the client.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any
    fn load(&self) -> Result<Option<Session>, SessionError>;

    /// Replace the persisted session
    fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Remove the persisted session
    fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the session in memory only
#[derive(Default)]
pub struct InMemorySessionStore {
    slot: Arc<RwLock<Option<Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self
            .slot
            .read()
            .expect("Failed to acquire read lock on session slot")
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self
            .slot
            .write()
            .expect("Failed to acquire write lock on session slot") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self
            .slot
            .write()
            .expect("Failed to acquire write lock on session slot") = None;
        Ok(())
    }
}

/// Keeps the session as a JSON document on disk
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec_pretty(session)?;
        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
