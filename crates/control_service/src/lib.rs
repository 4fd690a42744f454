use auth_service::error_response;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Request body for seeding a user (channel)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub subscribers: u64,
    #[serde(default)]
    pub subscribed_users: BTreeSet<String>,
}

/// Request body for seeding a video
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A failure or delay injected into requests whose path starts with `path_prefix`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRule {
    pub path_prefix: String,

    /// Status to answer with instead of running the handler
    #[serde(default)]
    pub status: Option<u16>,

    /// Delay before answering
    #[serde(default)]
    pub delay_ms: Option<u64>,

    /// Number of requests the rule applies to; unlimited if absent
    #[serde(default)]
    pub remaining: Option<u32>,
}

/// Response for successful control calls
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub message: String,
}

/// Active fault rules, first match wins
#[derive(Clone, Default)]
pub struct FaultRegistry {
    rules: Arc<RwLock<Vec<FaultRule>>>,
}

impl FaultRegistry {
    pub fn add(&self, rule: FaultRule) {
        self.rules
            .write()
            .expect("Failed to acquire write lock on faults")
            .push(rule);
    }

    pub fn clear(&self) {
        self.rules
            .write()
            .expect("Failed to acquire write lock on faults")
            .clear();
    }

    /// Consume one use of the first rule matching `path`
    pub fn take(&self, path: &str) -> Option<FaultRule> {
        let mut rules = self
            .rules
            .write()
            .expect("Failed to acquire write lock on faults");
        let index = rules.iter().position(|rule| path.starts_with(&rule.path_prefix))?;
        let rule = rules[index].clone();
        match rules[index].remaining {
            Some(n) if n <= 1 => {
                rules.remove(index);
            }
            Some(n) => rules[index].remaining = Some(n - 1),
            None => {}
        }
        Some(rule)
    }
}

/// State for the control API
#[derive(Clone)]
pub struct ControlState {
    pub repo: Arc<dyn datastore::Repository>,
    pub faults: FaultRegistry,
}

/// Middleware applying registered faults. Control endpoints are never faulted.
pub async fn fault_layer(State(faults): State<FaultRegistry>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path.contains("/control/") {
        return next.run(request).await;
    }
    let Some(rule) = faults.take(path) else {
        return next.run(request).await;
    };

    tracing::debug!(path, ?rule, "Applying fault");
    if let Some(delay) = rule.delay_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    match rule.status {
        Some(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, "injected_fault", format!("Fault injected for '{}'", rule.path_prefix))
        }
        None => next.run(request).await,
    }
}

/// Handler for creating a new user
async fn create_user(State(state): State<ControlState>, Json(request): Json<CreateUserRequest>) -> Response {
    let user = domain::User {
        id: request.id.clone(),
        name: request.name,
        email: request.email.unwrap_or_else(|| format!("{}@example.com", request.id)),
        img: request.img,
        subscribers: request.subscribers,
        subscribed_users: request.subscribed_users,
        created_at: Utc::now(),
    };
    state.repo.add_user(user);

    let response = CreateResponse {
        success: true,
        message: format!("User '{}' created successfully", request.id),
    };
    (StatusCode::CREATED, Json(response)).into_response()
}

/// Handler for creating a new video
async fn create_video(State(state): State<ControlState>, Json(request): Json<CreateVideoRequest>) -> Response {
    let video = domain::Video {
        id: request.id.clone(),
        user_id: request.user_id,
        title: request.title,
        desc: request.desc,
        img_url: request.img_url,
        video_url: request.video_url,
        views: request.views,
        tags: request.tags,
        likes: BTreeSet::new(),
        dislikes: BTreeSet::new(),
        created_at: Utc::now(),
    };
    state.repo.add_video(video);

    let response = CreateResponse {
        success: true,
        message: format!("Video '{}' created successfully", request.id),
    };
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn add_fault(State(state): State<ControlState>, Json(rule): Json<FaultRule>) -> Response {
    if rule.status.is_none() && rule.delay_ms.is_none() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "A fault needs a 'status', a 'delayMs' or both",
        );
    }
    let message = format!("Fault for '{}' registered", rule.path_prefix);
    state.faults.add(rule);
    (StatusCode::CREATED, Json(CreateResponse { success: true, message })).into_response()
}

async fn clear_faults(State(state): State<ControlState>) -> Response {
    state.faults.clear();
    StatusCode::NO_CONTENT.into_response()
}

/// Create the router for the control API
pub fn create_router(state: ControlState) -> Router {
    Router::new()
        .route("/control/users", post(create_user))
        .route("/control/videos", post(create_video))
        .route("/control/faults", post(add_fault).delete(clear_faults))
        .with_state(state)
}
