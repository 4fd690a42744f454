use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Channel name shown when the owning channel cannot be resolved
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";

/// Avatar shown when the owning channel has no image or cannot be resolved
pub const DEFAULT_CHANNEL_AVATAR: &str = "/avatar.png";

/// Author name shown when a comment's author cannot be resolved
pub const UNKNOWN_AUTHOR_NAME: &str = "Unknown User";

/// Avatar shown for comment authors without an image
pub const DEFAULT_AUTHOR_AVATAR: &str = "/default-avatar.png";

/// Represents a video resource
///
/// `likes` and `dislikes` hold user ids. A user id is never a member of both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    /// Id of the owning channel (a user id)
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
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub dislikes: BTreeSet<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Record a like from `user_id`, dropping any dislike it had.
    ///
    /// Liking twice is a no-op; there is no way to take a like back.
    /// Returns whether either set changed.
    pub fn record_like(&mut self, user_id: &str) -> bool {
        let removed = self.dislikes.remove(user_id);
        let added = self.likes.insert(user_id.to_string());
        removed || added
    }

    /// Mirror of [`Video::record_like`] for dislikes.
    pub fn record_dislike(&mut self, user_id: &str) -> bool {
        let removed = self.likes.remove(user_id);
        let added = self.dislikes.insert(user_id.to_string());
        removed || added
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }

    pub fn is_disliked_by(&self, user_id: &str) -> bool {
        self.dislikes.contains(user_id)
    }
}

/// Represents a user account. Every user is also a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub subscribers: u64,
    /// Ids of the channels this user is subscribed to
    #[serde(default)]
    pub subscribed_users: BTreeSet<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// A channel is looked up through the user endpoint
pub type Channel = User;

impl User {
    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.subscribed_users.contains(channel_id)
    }

    /// Flip membership of `channel_id`. Returns `true` when now subscribed.
    pub fn toggle_subscription(&mut self, channel_id: &str) -> bool {
        if self.subscribed_users.remove(channel_id) {
            false
        } else {
            self.subscribed_users.insert(channel_id.to_string());
            true
        }
    }

    /// Set membership of `channel_id`. Returns whether anything changed.
    pub fn set_subscription(&mut self, channel_id: &str, subscribed: bool) -> bool {
        if subscribed {
            self.subscribed_users.insert(channel_id.to_string())
        } else {
            self.subscribed_users.remove(channel_id)
        }
    }
}

/// Author reference on a comment: either a bare user id or an embedded snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentAuthor {
    Id(String),
    Embedded(AuthorSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
}

impl CommentAuthor {
    pub fn id(&self) -> &str {
        match self {
            CommentAuthor::Id(id) => id,
            CommentAuthor::Embedded(author) => &author.id,
        }
    }

    /// Display name, when the server embedded one
    pub fn name(&self) -> Option<&str> {
        match self {
            CommentAuthor::Id(_) => None,
            CommentAuthor::Embedded(author) => Some(author.name.as_str()),
        }
    }
}

/// Represents a comment on a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_id: String,
    pub user_id: CommentAuthor,
    pub desc: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// A video joined with display data of its owning channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedVideoSummary {
    #[serde(flatten)]
    pub video: Video,
    pub channel_name: String,
    pub channel_img_url: String,
}

impl EnrichedVideoSummary {
    /// Join with a resolved channel. Blank channel fields still fall back.
    pub fn resolved(video: Video, channel: &Channel) -> Self {
        let channel_name = if channel.name.trim().is_empty() {
            UNKNOWN_CHANNEL_NAME.to_string()
        } else {
            channel.name.clone()
        };
        let channel_img_url = channel
            .img
            .as_deref()
            .filter(|img| !img.trim().is_empty())
            .unwrap_or(DEFAULT_CHANNEL_AVATAR)
            .to_string();
        Self {
            video,
            channel_name,
            channel_img_url,
        }
    }

    /// Join used when the channel lookup failed
    pub fn fallback(video: Video) -> Self {
        Self {
            video,
            channel_name: UNKNOWN_CHANNEL_NAME.to_string(),
            channel_img_url: DEFAULT_CHANNEL_AVATAR.to_string(),
        }
    }
}

/// A comment joined with display data of its author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
    pub author_img_url: String,
}

impl EnrichedComment {
    /// Join with the author's display fields. Blank fields fall back.
    pub fn with_author(comment: Comment, name: &str, img: Option<&str>) -> Self {
        let author_name = if name.trim().is_empty() {
            UNKNOWN_AUTHOR_NAME
        } else {
            name
        };
        let author_img_url = img
            .filter(|img| !img.trim().is_empty())
            .unwrap_or(DEFAULT_AUTHOR_AVATAR)
            .to_string();
        Self {
            author_name: author_name.to_string(),
            author_img_url,
            comment,
        }
    }

    pub fn resolved(comment: Comment, author: &User) -> Self {
        Self::with_author(comment, &author.name, author.img.as_deref())
    }

    /// Join used when the author lookup failed
    pub fn fallback(comment: Comment) -> Self {
        Self {
            comment,
            author_name: UNKNOWN_AUTHOR_NAME.to_string(),
            author_img_url: DEFAULT_AUTHOR_AVATAR.to_string(),
        }
    }
}

/// Body of `POST /videos`. Media locators point at already uploaded files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `POST /comments/`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub video_id: String,
    pub desc: String,
}

/// `{ user, token }` returned by sign-in and sign-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentList {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEnvelope {
    pub comment: Comment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEnvelope {
    pub video: Video,
}

/// List endpoints answer either `{ videos: [...] }` or a bare array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoList {
    Wrapped { videos: Vec<Video> },
    Bare(Vec<Video>),
}

impl VideoList {
    pub fn into_videos(self) -> Vec<Video> {
        match self {
            VideoList::Wrapped { videos } | VideoList::Bare(videos) => videos,
        }
    }
}
