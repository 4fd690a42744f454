//! A video's comment thread and the pending comment draft.

use std::sync::{Arc, RwLock};

use domain::Comment;

use crate::state::{FetchSlot, FetchState, LoadTicket, PendingSet};
use crate::{EngagementClient, EngagementError};

#[derive(Debug, Default)]
struct ThreadState {
    thread: FetchSlot<Vec<Comment>>,
    draft: String,
    /// Confirmed posts on the slot's video that the held list does not
    /// show yet, oldest first. Merged into the next committed load.
    unmerged: Vec<Comment>,
}

/// Put each of `confirmed` at the head of `comments` unless the list
/// already has it.
fn merge_confirmed(comments: &mut Vec<Comment>, confirmed: impl IntoIterator<Item = Comment>) {
    for comment in confirmed {
        if !comments.iter().any(|held| held.id == comment.id) {
            comments.insert(0, comment);
        }
    }
}

/// Newest-first comment list for one video plus the user's draft.
///
/// Loads replace the list wholesale; a successful post prepends the
/// server's copy of the comment. A failed post leaves both the list and
/// the draft as they were.
#[derive(Debug, Clone, Default)]
pub struct CommentThreadManager {
    inner: Arc<RwLock<ThreadState>>,
    posting: PendingSet,
}

impl CommentThreadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&self, video_id: &str) -> LoadTicket {
        let mut inner = self.inner.write().expect("Failed to acquire write lock on thread");
        if inner.thread.key() != Some(video_id) {
            inner.unmerged.clear();
        }
        inner.thread.begin(video_id)
    }

    /// Commit a fetched list. Comments posted while the load was running
    /// are kept at the head even if the fetched list predates them. A
    /// failure settles into `Error` with an empty list. Returns `false` if
    /// a newer load superseded this one.
    pub fn settle_load(&self, ticket: &LoadTicket, result: Result<Vec<Comment>, &EngagementError>) -> bool {
        let mut inner = self.inner.write().expect("Failed to acquire write lock on thread");
        match result {
            Ok(mut comments) => {
                if !inner.thread.is_current(ticket) {
                    return inner.thread.settle_ok(ticket, comments);
                }
                let confirmed = std::mem::take(&mut inner.unmerged);
                merge_confirmed(&mut comments, confirmed);
                inner.thread.settle_ok(ticket, comments)
            }
            Err(e) => inner.thread.settle_err(ticket, e),
        }
    }

    /// Fetch the full thread of `video_id`, replacing whatever was held.
    pub async fn load_thread(&self, client: &EngagementClient, video_id: &str) -> Result<Vec<Comment>, EngagementError> {
        let ticket = self.begin_load(video_id);
        match client.fetch_comments(video_id).await {
            Ok(comments) => {
                if self.settle_load(&ticket, Ok(comments)) {
                    let held = self.comments();
                    tracing::debug!(video_id, count = held.len(), "Comment thread ready");
                    Ok(held)
                } else {
                    Err(EngagementError::Superseded {
                        target: video_id.to_string(),
                    })
                }
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Failed to load comments");
                self.settle_load(&ticket, Err(&e));
                Err(e)
            }
        }
    }

    pub fn state(&self) -> FetchState<Vec<Comment>> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on thread")
            .thread
            .state()
            .clone()
    }

    /// Held comments, newest first; empty unless loaded.
    pub fn comments(&self) -> Vec<Comment> {
        self.state().ready().cloned().unwrap_or_default()
    }

    /// Video the thread belongs to (or is loading for).
    pub fn active_video_id(&self) -> Option<String> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on thread")
            .thread
            .key()
            .map(str::to_string)
    }

    pub fn draft(&self) -> String {
        self.inner
            .read()
            .expect("Failed to acquire read lock on thread")
            .draft
            .clone()
    }

    pub fn set_draft(&self, text: &str) {
        self.inner
            .write()
            .expect("Failed to acquire write lock on thread")
            .draft = text.to_string();
    }

    /// Post `text` on `video_id`.
    ///
    /// `text` becomes the draft first, so it survives any failure. On
    /// success the returned comment is prepended (if the thread still shows
    /// `video_id`) and the draft is cleared unless it was edited meanwhile.
    pub async fn post_comment(
        &self,
        client: &EngagementClient,
        token: &str,
        video_id: &str,
        text: &str,
    ) -> Result<Comment, EngagementError> {
        self.set_draft(text);
        if text.trim().is_empty() {
            return Err(EngagementError::InvalidInput("comment text is empty"));
        }
        let _guard = self.posting.try_acquire(video_id)?;

        let comment = match client.post_comment(token, video_id, text).await {
            Ok(comment) => comment,
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Failed to post comment, keeping draft");
                return Err(e);
            }
        };

        self.commit_posted(video_id, text, &comment);
        tracing::info!(video_id, comment_id = %comment.id, "Posted comment");
        Ok(comment)
    }

    /// Show a confirmed comment and clear the draft it came from.
    fn commit_posted(&self, video_id: &str, text: &str, comment: &Comment) {
        let mut inner = self.inner.write().expect("Failed to acquire write lock on thread");
        if inner.thread.key() == Some(video_id) {
            let loaded = inner.thread.state().ready().is_some();
            let failed_load = inner.thread.state().error().is_some();
            if loaded {
                if let Some(comments) = inner.thread.ready_mut() {
                    merge_confirmed(comments, [comment.clone()]);
                }
            } else if failed_load {
                let mut comments = std::mem::take(&mut inner.unmerged);
                comments.push(comment.clone());
                comments.reverse();
                inner.thread.set_state(FetchState::Ready(comments));
            } else {
                // Merged into whatever the running load returns.
                inner.unmerged.push(comment.clone());
            }
        }
        if inner.draft == text {
            inner.draft.clear();
        }
    }
}
