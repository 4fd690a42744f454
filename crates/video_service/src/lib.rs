use auth_service::{ApiState, AuthUser, MaybeAuthUser, error_response};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, http::StatusCode, routing::get, routing::post, routing::put};
use chrono::Utc;
use datastore::Reaction;
use domain::{NewVideo, Video, VideoEnvelope, VideoList};
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TagsParams {
    #[serde(default)]
    pub tags: String,
}

/// Handler for fetching one video
async fn find_video(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.repo.get_video(&id) {
        Some(video) => (StatusCode::OK, Json(video)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "not_found", format!("Video '{}' not found", id)),
    }
}

/// Handler for the home feeds: all, random, trend and sub
async fn filter_videos(
    State(state): State<ApiState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(params): Query<FilterParams>,
) -> Response {
    let mut videos = state.repo.get_videos();
    match params.filter.as_deref().unwrap_or("all") {
        // Random order is not reproducible; keep the newest-first order
        "all" | "random" => {}
        "trend" => videos.sort_by(|a, b| b.views.cmp(&a.views)),
        "sub" => {
            let subscribed = caller
                .and_then(|caller| state.repo.get_user(&caller.user_id))
                .map(|user| user.subscribed_users)
                .unwrap_or_default();
            videos.retain(|video| subscribed.contains(&video.user_id));
        }
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_filter",
                format!("Unknown filter '{}'. Use all, random, trend or sub", other),
            );
        }
    }
    (StatusCode::OK, Json(VideoList::Wrapped { videos })).into_response()
}

/// Handler for title search; answers a bare array
async fn search_videos(State(state): State<ApiState>, Query(params): Query<SearchParams>) -> Response {
    let needle = params.q.trim().to_lowercase();
    let videos: Vec<Video> = if needle.is_empty() {
        Vec::new()
    } else {
        state
            .repo
            .get_videos()
            .into_iter()
            .filter(|video| video.title.to_lowercase().contains(&needle))
            .collect()
    };
    (StatusCode::OK, Json(videos)).into_response()
}

/// Handler for tag recommendations; answers a bare array
async fn videos_by_tags(State(state): State<ApiState>, Query(params): Query<TagsParams>) -> Response {
    let wanted: BTreeSet<String> = params
        .tags
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let videos: Vec<Video> = state
        .repo
        .get_videos()
        .into_iter()
        .filter(|video| video.tags.iter().any(|t| wanted.contains(&t.to_lowercase())))
        .collect();
    (StatusCode::OK, Json(videos)).into_response()
}

/// Handler for creating a video record after upload
async fn create_video(State(state): State<ApiState>, caller: AuthUser, Json(request): Json<NewVideo>) -> Response {
    if request.title.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "The 'title' field is required");
    }
    let video = Video {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: caller.user_id,
        title: request.title,
        desc: request.desc,
        img_url: request.img_url,
        video_url: request.video_url,
        views: 0,
        tags: request.tags,
        likes: BTreeSet::new(),
        dislikes: BTreeSet::new(),
        created_at: Utc::now(),
    };
    state.repo.add_video(video.clone());
    tracing::info!(video_id = %video.id, "Created video");
    (StatusCode::CREATED, Json(VideoEnvelope { video })).into_response()
}

/// Handler for channel lookups
async fn find_user(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.repo.get_user(&id) {
        Some(mut user) => {
            // Channel lookups are public
            user.email.clear();
            (StatusCode::OK, Json(user)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "not_found", format!("User '{}' not found", id)),
    }
}

async fn react(state: ApiState, caller: AuthUser, video_id: String, reaction: Reaction) -> Response {
    match state.repo.record_reaction(&video_id, &caller.user_id, reaction) {
        Some(_) => {
            let message = match reaction {
                Reaction::Like => "The video has been liked.",
                Reaction::Dislike => "The video has been disliked.",
            };
            (StatusCode::OK, Json(message)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "not_found", format!("Video '{}' not found", video_id)),
    }
}

async fn like(State(state): State<ApiState>, caller: AuthUser, Path(video_id): Path<String>) -> Response {
    react(state, caller, video_id, Reaction::Like).await
}

async fn dislike(State(state): State<ApiState>, caller: AuthUser, Path(video_id): Path<String>) -> Response {
    react(state, caller, video_id, Reaction::Dislike).await
}

async fn set_subscription(state: ApiState, caller: AuthUser, channel_id: String, subscribed: bool) -> Response {
    match state.repo.set_subscription(&caller.user_id, &channel_id, subscribed) {
        Some(_) => {
            let message = if subscribed {
                "Subscription successful."
            } else {
                "Unsubscription successful."
            };
            (StatusCode::OK, Json(message)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "not_found", format!("Channel '{}' not found", channel_id)),
    }
}

async fn subscribe(State(state): State<ApiState>, caller: AuthUser, Path(channel_id): Path<String>) -> Response {
    set_subscription(state, caller, channel_id, true).await
}

async fn unsubscribe(State(state): State<ApiState>, caller: AuthUser, Path(channel_id): Path<String>) -> Response {
    set_subscription(state, caller, channel_id, false).await
}

/// Create the router for the video and user API
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/videos", post(create_video))
        .route("/videos/find/{id}", get(find_video))
        .route("/videos/filter", get(filter_videos))
        .route("/videos/search", get(search_videos))
        .route("/videos/tags", get(videos_by_tags))
        .route("/users/find/{id}", get(find_user))
        .route("/users/like/{video_id}", put(like))
        .route("/users/dislike/{video_id}", put(dislike))
        .route("/users/sub/{channel_id}", put(subscribe))
        .route("/users/unsub/{channel_id}", put(unsubscribe))
        .with_state(state)
}
