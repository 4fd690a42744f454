use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::{Comment, CommentAuthor, User, Video};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

/// Which reaction set a user joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

/// Repository trait for data access abstraction
/// This allows switching between different storage backends (in-memory, filesystem, database)
pub trait Repository: Send + Sync {
    /// Get a video by ID
    fn get_video(&self, id: &str) -> Option<Video>;

    /// Get all videos, newest first
    fn get_videos(&self) -> Vec<Video>;

    /// Add or replace a video
    fn add_video(&self, video: Video);

    /// Record a reaction; returns the updated video, or `None` if it does not exist
    fn record_reaction(&self, video_id: &str, user_id: &str, reaction: Reaction) -> Option<Video>;

    /// Get a user (channel) by ID
    fn get_user(&self, id: &str) -> Option<User>;

    /// Get a user by email address
    fn find_user_by_email(&self, email: &str) -> Option<User>;

    /// Add or replace a user
    fn add_user(&self, user: User);

    /// Subscribe `user_id` to `channel_id` or undo it, keeping the channel's
    /// subscriber count in step. Returns the updated subscriber, or `None` if
    /// either user does not exist.
    fn set_subscription(&self, user_id: &str, channel_id: &str, subscribed: bool) -> Option<User>;

    /// Get the comments on a video, newest first
    fn get_comments(&self, video_id: &str) -> Vec<Comment>;

    /// Add a comment to the repository
    fn add_comment(&self, comment: Comment);
}

/// In-memory implementation of the Repository trait
pub struct InMemoryRepository {
    videos: Arc<RwLock<HashMap<String, Video>>>,
    users: Arc<RwLock<HashMap<String, User>>>,
    comments: Arc<RwLock<HashMap<String, Vec<Comment>>>>,
}

impl InMemoryRepository {
    /// Create a new in-memory repository with initial dummy data
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.populate_dummy_data();
        repo
    }

    /// Create a repository with no data at all
    pub fn empty() -> Self {
        Self {
            videos: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            comments: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Populate the repository with initial dummy data
    fn populate_dummy_data(&self) {
        // Fixed point in time for consistent dummy data
        let fixed_time = Utc
            .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
            .single()
            .expect("Fixed datetime should be valid");

        self.add_user(seed_user("channel-1", "Mock Channel", Some("/img/channel-1.png"), fixed_time));
        let mut second = seed_user("channel-2", "Second Channel", None, fixed_time);
        second.subscribers = 1;
        self.add_user(second);

        let mut viewer = seed_user("user-1", "Test User", None, fixed_time);
        viewer.email = "test@example.com".to_string();
        viewer.subscribed_users.insert("channel-2".to_string());
        self.add_user(viewer);
        self.add_user(seed_user("user-2", "Other User", None, fixed_time));

        let videos = [
            ("test-video-1", "channel-1", "Getting Started with Rust", vec!["rust", "tutorial"], 42),
            ("test-video-2", "channel-2", "Second Video", vec!["rust"], 7),
            // Owner does not exist: channel lookups for it fail
            ("test-video-3", "deleted-channel", "Orphaned Video", vec!["misc"], 100),
        ];
        for (i, (id, owner, title, tags, views)) in videos.into_iter().enumerate() {
            self.add_video(Video {
                id: id.to_string(),
                user_id: owner.to_string(),
                title: title.to_string(),
                desc: format!("This is mock video {}", i + 1),
                img_url: format!("/thumbs/{id}.png"),
                video_url: format!("/media/{id}.mp4"),
                views,
                tags: tags.into_iter().map(str::to_string).collect(),
                likes: BTreeSet::new(),
                dislikes: BTreeSet::new(),
                created_at: fixed_time + Duration::hours(i as i64),
            });
        }

        // Add dummy comments for test-video-1
        for i in 0..3 {
            self.add_comment(Comment {
                id: format!("comment-id-{}", i),
                video_id: "test-video-1".to_string(),
                user_id: CommentAuthor::Id("user-1".to_string()),
                desc: format!("Hello world {}", i),
                created_at: fixed_time + Duration::minutes(i),
            });
        }
    }
}

fn seed_user(id: &str, name: &str, img: Option<&str>, created_at: DateTime<Utc>) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        img: img.map(str::to_string),
        subscribers: 0,
        subscribed_users: BTreeSet::new(),
        created_at,
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for InMemoryRepository {
    fn get_video(&self, id: &str) -> Option<Video> {
        self.videos
            .read()
            .expect("Failed to acquire read lock on videos")
            .get(id)
            .cloned()
    }

    fn get_videos(&self) -> Vec<Video> {
        let mut videos: Vec<Video> = self
            .videos
            .read()
            .expect("Failed to acquire read lock on videos")
            .values()
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        videos
    }

    fn add_video(&self, video: Video) {
        self.videos
            .write()
            .expect("Failed to acquire write lock on videos")
            .insert(video.id.clone(), video);
    }

    fn record_reaction(&self, video_id: &str, user_id: &str, reaction: Reaction) -> Option<Video> {
        let mut videos = self
            .videos
            .write()
            .expect("Failed to acquire write lock on videos");
        let video = videos.get_mut(video_id)?;
        match reaction {
            Reaction::Like => video.record_like(user_id),
            Reaction::Dislike => video.record_dislike(user_id),
        };
        Some(video.clone())
    }

    fn get_user(&self, id: &str) -> Option<User> {
        self.users
            .read()
            .expect("Failed to acquire read lock on users")
            .get(id)
            .cloned()
    }

    fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .expect("Failed to acquire read lock on users")
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn add_user(&self, user: User) {
        self.users
            .write()
            .expect("Failed to acquire write lock on users")
            .insert(user.id.clone(), user);
    }

    fn set_subscription(&self, user_id: &str, channel_id: &str, subscribed: bool) -> Option<User> {
        let mut users = self
            .users
            .write()
            .expect("Failed to acquire write lock on users");
        if !users.contains_key(channel_id) {
            return None;
        }
        let user = users.get_mut(user_id)?;
        let changed = if subscribed {
            user.subscribed_users.insert(channel_id.to_string())
        } else {
            user.subscribed_users.remove(channel_id)
        };
        let updated = user.clone();
        if changed {
            if let Some(channel) = users.get_mut(channel_id) {
                channel.subscribers = if subscribed {
                    channel.subscribers + 1
                } else {
                    channel.subscribers.saturating_sub(1)
                };
            }
        }
        Some(updated)
    }

    fn get_comments(&self, video_id: &str) -> Vec<Comment> {
        let mut comments = self
            .comments
            .read()
            .expect("Failed to acquire read lock on comments")
            .get(video_id)
            .cloned()
            .unwrap_or_default();
        comments.reverse();
        comments
    }

    fn add_comment(&self, comment: Comment) {
        self.comments
            .write()
            .expect("Failed to acquire write lock on comments")
            .entry(comment.video_id.clone())
            .or_default()
            .push(comment);
    }
}
