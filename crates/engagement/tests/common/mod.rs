//! Shared helpers for engagement integration tests.
//!
//! Each test gets its own reference API on an ephemeral port, backed by a
//! freshly seeded in-memory repository.

#![allow(dead_code)]

use std::sync::Arc;

use control_service::{FaultRegistry, FaultRule};
use datastore::InMemoryRepository;
use engagement::EngagementClient;
use session::{InMemorySessionStore, SessionContext};

pub struct TestServer {
    pub base_url: String,
    pub repo: Arc<InMemoryRepository>,
    pub faults: FaultRegistry,
}

impl TestServer {
    pub fn client(&self) -> EngagementClient {
        EngagementClient::with_client(reqwest::Client::new(), &self.base_url).unwrap()
    }

    /// Fail the next `remaining` requests under `path_prefix` with `status`.
    pub fn fail(&self, path_prefix: &str, status: u16, remaining: u32) {
        self.faults.add(FaultRule {
            path_prefix: path_prefix.to_string(),
            status: Some(status),
            delay_ms: None,
            remaining: Some(remaining),
        });
    }

    /// Hold the next request under `path_prefix` for `delay_ms`.
    pub fn delay(&self, path_prefix: &str, delay_ms: u64) {
        self.faults.add(FaultRule {
            path_prefix: path_prefix.to_string(),
            status: None,
            delay_ms: Some(delay_ms),
            remaining: Some(1),
        });
    }

    /// Sign in through the API and return a session holding the result.
    pub async fn signed_in(&self, email: &str) -> SessionContext {
        let session = anonymous();
        let signed = self.client().sign_in(email, "password").await.unwrap();
        session.sign_in(signed).unwrap();
        session
    }
}

pub fn anonymous() -> SessionContext {
    SessionContext::new(Arc::new(InMemorySessionStore::new()))
}

/// Serve the reference API on `127.0.0.1:0` for the rest of the test.
pub async fn spawn_server() -> TestServer {
    let repo = Arc::new(InMemoryRepository::new());
    let faults = FaultRegistry::default();
    let app = server::build_app(repo.clone(), faults.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}/api"),
        repo,
        faults,
    }
}
