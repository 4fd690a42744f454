//! The viewed video and its like/dislike sets.

use std::sync::{Arc, RwLock};

use domain::Video;

use crate::state::{FetchSlot, FetchState, LoadTicket, PendingGuard, PendingSet};
use crate::{EngagementClient, EngagementError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

/// Holds the snapshot of the video being viewed.
///
/// Reactions are applied only after the server confirmed them, and only
/// to the video they were requested for. Like and dislike have no undo:
/// repeating one is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ReactionStore {
    video: Arc<RwLock<FetchSlot<Video>>>,
    pending: PendingSet,
}

impl ReactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&self, video_id: &str) -> LoadTicket {
        self.video
            .write()
            .expect("Failed to acquire write lock on video")
            .begin(video_id)
    }

    /// Commit a fetched snapshot; `false` if a newer load superseded it.
    pub fn settle_load(&self, ticket: &LoadTicket, result: Result<Video, &EngagementError>) -> bool {
        let mut slot = self.video.write().expect("Failed to acquire write lock on video");
        match result {
            Ok(video) => slot.settle_ok(ticket, video),
            Err(e) => slot.settle_err(ticket, e),
        }
    }

    /// Fetch `video_id` and make it the held snapshot.
    pub async fn load(&self, client: &EngagementClient, video_id: &str) -> Result<Video, EngagementError> {
        let ticket = self.begin_load(video_id);
        match client.fetch_video(video_id).await {
            Ok(video) => {
                if self.settle_load(&ticket, Ok(video.clone())) {
                    Ok(video)
                } else {
                    Err(EngagementError::Superseded {
                        target: video_id.to_string(),
                    })
                }
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Failed to load video");
                self.settle_load(&ticket, Err(&e));
                Err(e)
            }
        }
    }

    pub fn state(&self) -> FetchState<Video> {
        self.video
            .read()
            .expect("Failed to acquire read lock on video")
            .state()
            .clone()
    }

    pub fn video(&self) -> Option<Video> {
        self.state().ready().cloned()
    }

    /// Claim the reaction slot for `video_id` until the guard drops.
    pub fn try_begin(&self, video_id: &str) -> Result<PendingGuard, EngagementError> {
        self.pending.try_acquire(video_id)
    }

    pub fn is_pending(&self, video_id: &str) -> bool {
        self.pending.is_pending(video_id)
    }

    /// Apply a confirmed like: leave `dislikes`, join `likes`.
    pub fn apply_like(&self, video_id: &str, user_id: &str) -> Result<Video, EngagementError> {
        self.apply(ReactionKind::Like, video_id, user_id)
    }

    /// Apply a confirmed dislike: leave `likes`, join `dislikes`.
    pub fn apply_dislike(&self, video_id: &str, user_id: &str) -> Result<Video, EngagementError> {
        self.apply(ReactionKind::Dislike, video_id, user_id)
    }

    /// Returns the updated snapshot for re-rendering.
    pub fn apply(&self, kind: ReactionKind, video_id: &str, user_id: &str) -> Result<Video, EngagementError> {
        if user_id.is_empty() {
            return Err(EngagementError::InvalidInput("user id is empty"));
        }
        let mut slot = self.video.write().expect("Failed to acquire write lock on video");
        let video = slot.ready_mut().ok_or(EngagementError::NoActiveVideo)?;
        if video.id != video_id {
            tracing::warn!(video_id, active = %video.id, "Dropping reaction for a video no longer shown");
            return Err(EngagementError::Superseded {
                target: video_id.to_string(),
            });
        }
        let changed = match kind {
            ReactionKind::Like => video.record_like(user_id),
            ReactionKind::Dislike => video.record_dislike(user_id),
        };
        tracing::info!(video_id, user_id, ?kind, changed, "Applied reaction");
        Ok(video.clone())
    }
}
