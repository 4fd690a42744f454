use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use chrono::{DateTime, Utc};
use domain::{AuthPayload, User};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Default token lifetime in seconds (1 hour)
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// State shared by every API router
#[derive(Clone)]
pub struct ApiState {
    pub repo: Arc<dyn datastore::Repository>,
    pub tokens: TokenRegistry,
}

impl ApiState {
    pub fn new(repo: Arc<dyn datastore::Repository>) -> Self {
        Self {
            repo,
            tokens: TokenRegistry::default(),
        }
    }
}

/// Request body for sign-in
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,

    /// Password (not validated in mock)
    #[serde(default)]
    pub password: Option<String>,

    /// Custom expiry in seconds from now (for testing)
    /// Can be negative to create expired tokens
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Request body for sign-up
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,

    /// Password (not stored in mock)
    #[serde(default)]
    pub password: Option<String>,
}

/// Error response shared by all services
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: String,

    /// Error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Build an error response with the given status
pub fn error_response(status: StatusCode, error: &str, description: impl Into<String>) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        error_description: Some(description.into()),
    };
    (status, Json(body)).into_response()
}

/// Token metadata for tracking expiry and owner
#[derive(Debug, Clone)]
struct TokenMetadata {
    /// When the token was issued
    issued_at: DateTime<Utc>,
    /// Expiry duration in seconds (can be negative for expired tokens)
    expires_in: i64,
    /// The user the token was issued to
    user_id: String,
}

impl TokenMetadata {
    /// Check if the token is expired
    fn is_expired(&self) -> bool {
        let now = Utc::now();
        let expiry_time = self.issued_at + chrono::Duration::seconds(self.expires_in);
        now >= expiry_time
    }
}

/// Issued bearer tokens
#[derive(Clone, Default)]
pub struct TokenRegistry {
    tokens: Arc<RwLock<HashMap<String, TokenMetadata>>>,
}

impl TokenRegistry {
    /// Issue a new token for `user_id`
    pub fn issue(&self, user_id: &str, expires_in: i64) -> String {
        let token = format!("vs_{}", uuid::Uuid::new_v4().simple());
        let metadata = TokenMetadata {
            issued_at: Utc::now(),
            expires_in,
            user_id: user_id.to_string(),
        };
        self.tokens
            .write()
            .expect("Failed to acquire write lock on tokens")
            .insert(token.clone(), metadata);
        token
    }

    /// Resolve a token to its user id
    pub fn validate(&self, token: &str) -> Result<String, String> {
        let store = self.tokens.read().expect("Failed to acquire read lock on tokens");
        match store.get(token) {
            Some(metadata) if metadata.is_expired() => Err("Token has expired".to_string()),
            Some(metadata) => Ok(metadata.user_id.clone()),
            None => Err("Unknown token".to_string()),
        }
    }
}

/// Caller resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "unauthenticated",
                    "Expected Authorization: Bearer <token>",
                )
            })?;

        let user_id = state
            .tokens
            .validate(token)
            .map_err(|e| error_response(StatusCode::UNAUTHORIZED, "invalid_token", e))?;
        Ok(AuthUser { user_id })
    }
}

/// Caller if a valid bearer token was sent, otherwise `None`
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<ApiState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(AuthUser::from_request_parts(parts, state).await.ok()))
    }
}

/// Handler for sign-in: issue a token for an existing account
async fn sign_in(State(state): State<ApiState>, Json(request): Json<SignInRequest>) -> Response {
    if request.email.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "The 'email' field is required");
    }
    let Some(user) = state.repo.find_user_by_email(request.email.trim()) else {
        return error_response(StatusCode::NOT_FOUND, "user_not_found", "No account with that email");
    };

    let token = state
        .tokens
        .issue(&user.id, request.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
    tracing::info!(user_id = %user.id, "Issued token");
    (StatusCode::OK, Json(AuthPayload { user, token })).into_response()
}

/// Handler for sign-up: create an account and sign it in
async fn sign_up(State(state): State<ApiState>, Json(request): Json<SignUpRequest>) -> Response {
    let name = request.name.trim();
    let email = request.email.trim();
    if name.is_empty() || email.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "The 'name' and 'email' fields are required",
        );
    }
    if state.repo.find_user_by_email(email).is_some() {
        return error_response(StatusCode::CONFLICT, "email_taken", "An account with that email exists");
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        img: None,
        subscribers: 0,
        subscribed_users: BTreeSet::new(),
        created_at: Utc::now(),
    };
    state.repo.add_user(user.clone());

    let token = state.tokens.issue(&user.id, DEFAULT_EXPIRES_IN);
    tracing::info!(user_id = %user.id, "Created account");
    (StatusCode::CREATED, Json(AuthPayload { user, token })).into_response()
}

/// Create the router for the auth service
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/signup", post(sign_up))
        .with_state(state)
}
