use auth_service::{ApiState, AuthUser, error_response};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
use chrono::Utc;
use domain::{AuthorSnapshot, Comment, CommentAuthor, CommentEnvelope, CommentList, NewComment};

/// Handler for listing a video's comments, newest first
async fn list_comments(State(state): State<ApiState>, Path(video_id): Path<String>) -> Response {
    let comments = state.repo.get_comments(&video_id);
    (StatusCode::OK, Json(CommentList { comments })).into_response()
}

/// Handler for posting a comment as the caller
async fn create_comment(
    State(state): State<ApiState>,
    caller: AuthUser,
    Json(request): Json<NewComment>,
) -> Response {
    if request.desc.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "The 'desc' field is required");
    }
    if state.repo.get_video(&request.video_id).is_none() {
        return error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Video '{}' not found", request.video_id),
        );
    }

    // Embed the author so clients can render it without another lookup
    let author = match state.repo.get_user(&caller.user_id) {
        Some(user) => CommentAuthor::Embedded(AuthorSnapshot {
            id: user.id,
            name: user.name,
            img: user.img,
        }),
        None => CommentAuthor::Id(caller.user_id),
    };
    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        video_id: request.video_id,
        user_id: author,
        desc: request.desc,
        created_at: Utc::now(),
    };
    state.repo.add_comment(comment.clone());
    tracing::info!(comment_id = %comment.id, video_id = %comment.video_id, "Created comment");

    (StatusCode::CREATED, Json(CommentEnvelope { comment })).into_response()
}

/// Create the router for the comment API
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/comments/", post(create_comment))
        .route("/comments/{video_id}", get(list_comments))
        .with_state(state)
}
