use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use session::{FileSessionStore, InMemorySessionStore, SessionContext, SessionStore};

use crate::{EngagementClient, EngagementError};

const DEFAULT_BASE_URL: &str = "http://localhost:4000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
///
/// | Env Var                | Default                      |
/// |------------------------|------------------------------|
/// | `API_BASE_URL`         | `http://localhost:4000/api`  |
/// | `REQUEST_TIMEOUT_SECS` | `30`                         |
/// | `SESSION_FILE`         | unset (session kept in memory) |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `.env` and the environment, with defaults.
    /// Malformed numbers fall back to the default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

        let timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let session_file = std::env::var("SESSION_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            session_file,
        }
    }

    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match &self.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => Arc::new(InMemorySessionStore::new()),
        }
    }

    /// Build the client and restore the persisted session.
    pub fn connect(&self) -> Result<(EngagementClient, SessionContext), EngagementError> {
        let client = EngagementClient::new(self)?;
        let session = SessionContext::restore(self.session_store())?;
        tracing::debug!(base_url = %self.base_url, signed_in = session.is_signed_in(), "Engagement client ready");
        Ok((client, session))
    }
}
