//! Joins video lists with the display data of their owning channels, and
//! comment threads with the display data of their authors.

use async_trait::async_trait;
use domain::{Channel, Comment, CommentAuthor, EnrichedComment, EnrichedVideoSummary, Video};
use futures::future::join_all;

use crate::{EngagementClient, EngagementError};

/// Source of channel records by id. Channels are users, so comment authors
/// resolve through the same lookup.
#[async_trait]
pub trait ChannelLookup: Send + Sync {
    async fn lookup_channel(&self, channel_id: &str) -> Result<Channel, EngagementError>;
}

#[async_trait]
impl ChannelLookup for EngagementClient {
    async fn lookup_channel(&self, channel_id: &str) -> Result<Channel, EngagementError> {
        self.fetch_channel(channel_id).await
    }
}

/// Fans out one channel lookup per video and waits for all of them.
///
/// Lookups settle independently: a failed lookup turns only its own item
/// into a fallback entry ("Unknown Channel", default avatar). The output
/// always has the input's length and order.
pub struct EnrichmentAggregator<L> {
    lookup: L,
}

impl<L: ChannelLookup> EnrichmentAggregator<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub async fn enrich(&self, videos: Vec<Video>) -> Vec<EnrichedVideoSummary> {
        let lookups = videos
            .iter()
            .map(|video| self.lookup.lookup_channel(&video.user_id));
        let settled = join_all(lookups).await;

        videos
            .into_iter()
            .zip(settled)
            .enumerate()
            .map(|(index, (video, channel))| match channel {
                Ok(channel) => EnrichedVideoSummary::resolved(video, &channel),
                Err(e) => {
                    tracing::warn!(
                        index,
                        video_id = %video.id,
                        channel_id = %video.user_id,
                        error = %e,
                        "Channel lookup failed, using fallback channel fields"
                    );
                    EnrichedVideoSummary::fallback(video)
                }
            })
            .collect()
    }

    /// Resolve each comment's author. Authors the server already embedded
    /// need no lookup; a failed lookup falls back to "Unknown User".
    pub async fn enrich_comments(&self, comments: Vec<Comment>) -> Vec<EnrichedComment> {
        let lookups = comments.iter().map(|comment| async move {
            match &comment.user_id {
                CommentAuthor::Embedded(author) => Ok((author.name.clone(), author.img.clone())),
                CommentAuthor::Id(user_id) => self
                    .lookup
                    .lookup_channel(user_id)
                    .await
                    .map(|user| (user.name, user.img)),
            }
        });
        let settled = join_all(lookups).await;

        comments
            .into_iter()
            .zip(settled)
            .map(|(comment, author)| match author {
                Ok((name, img)) => EnrichedComment::with_author(comment, &name, img.as_deref()),
                Err(e) => {
                    tracing::warn!(
                        comment_id = %comment.id,
                        user_id = %comment.user_id.id(),
                        error = %e,
                        "Author lookup failed, using fallback author fields"
                    );
                    EnrichedComment::fallback(comment)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        AuthorSnapshot, DEFAULT_AUTHOR_AVATAR, DEFAULT_CHANNEL_AVATAR, UNKNOWN_AUTHOR_NAME, UNKNOWN_CHANNEL_NAME,
    };
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Channels answer after a per-channel delay; unknown ids fail.
    struct FakeLookup {
        channels: HashMap<String, (Channel, Duration)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn new(entries: &[(&str, &str, u64)]) -> Self {
            let channels = entries
                .iter()
                .map(|(id, name, delay_ms)| {
                    let channel = Channel {
                        id: id.to_string(),
                        name: name.to_string(),
                        email: String::new(),
                        img: Some(format!("/img/{id}.png")),
                        subscribers: 0,
                        subscribed_users: BTreeSet::new(),
                        created_at: Default::default(),
                    };
                    (id.to_string(), (channel, Duration::from_millis(*delay_ms)))
                })
                .collect();
            Self {
                channels,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChannelLookup for FakeLookup {
        async fn lookup_channel(&self, channel_id: &str) -> Result<Channel, EngagementError> {
            self.calls.lock().unwrap().push(channel_id.to_string());
            match self.channels.get(channel_id) {
                Some((channel, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(channel.clone())
                }
                None => Err(EngagementError::Remote {
                    status: Some(404),
                    detail: "not found".to_string(),
                }),
            }
        }
    }

    fn video(id: &str, channel: &str) -> Video {
        Video {
            id: id.to_string(),
            user_id: channel.to_string(),
            title: format!("title {id}"),
            desc: String::new(),
            img_url: String::new(),
            video_url: String::new(),
            views: 0,
            tags: vec![],
            likes: BTreeSet::new(),
            dislikes: BTreeSet::new(),
            created_at: Default::default(),
        }
    }

    #[tokio::test]
    async fn failed_lookup_only_affects_its_own_item() {
        let lookup = FakeLookup::new(&[("c1", "First", 0), ("c3", "Third", 0)]);
        let aggregator = EnrichmentAggregator::new(lookup);

        let out = aggregator
            .enrich(vec![video("v1", "c1"), video("v2", "c2"), video("v3", "c3")])
            .await;

        assert_eq!(out.len(), 3);
        assert_eq!(
            out.iter().map(|e| e.video.id.as_str()).collect::<Vec<_>>(),
            ["v1", "v2", "v3"]
        );
        assert_eq!(out[0].channel_name, "First");
        assert_eq!(out[1].channel_name, UNKNOWN_CHANNEL_NAME);
        assert_eq!(out[1].channel_img_url, DEFAULT_CHANNEL_AVATAR);
        assert_eq!(out[2].channel_name, "Third");
        assert_eq!(out[2].channel_img_url, "/img/c3.png");
    }

    #[tokio::test]
    async fn order_follows_input_not_completion() {
        let lookup = FakeLookup::new(&[("slow", "Slow", 40), ("fast", "Fast", 0)]);
        let aggregator = EnrichmentAggregator::new(lookup);

        let out = aggregator
            .enrich(vec![video("v1", "slow"), video("v2", "fast")])
            .await;

        assert_eq!(out[0].channel_name, "Slow");
        assert_eq!(out[1].channel_name, "Fast");
    }

    #[tokio::test]
    async fn lookups_run_concurrently() {
        let lookup = FakeLookup::new(&[("a", "A", 100), ("b", "B", 100), ("c", "C", 100)]);
        let aggregator = EnrichmentAggregator::new(lookup);

        let started = std::time::Instant::now();
        let out = aggregator
            .enrich(vec![video("v1", "a"), video("v2", "b"), video("v3", "c")])
            .await;

        assert_eq!(out.len(), 3);
        assert!(started.elapsed() < Duration::from_millis(280));
        assert_eq!(aggregator.lookup.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn every_lookup_failing_still_yields_full_list() {
        let aggregator = EnrichmentAggregator::new(FakeLookup::new(&[]));
        let out = aggregator.enrich(vec![video("v1", "x"), video("v2", "y")]).await;
        assert!(out.iter().all(|e| e.channel_name == UNKNOWN_CHANNEL_NAME));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let aggregator = EnrichmentAggregator::new(FakeLookup::new(&[]));
        assert!(aggregator.enrich(Vec::new()).await.is_empty());
    }

    fn comment(id: &str, author: CommentAuthor) -> Comment {
        Comment {
            id: id.to_string(),
            video_id: "v1".to_string(),
            user_id: author,
            desc: format!("text {id}"),
            created_at: Default::default(),
        }
    }

    #[tokio::test]
    async fn failed_author_lookup_only_affects_its_own_comment() {
        let lookup = FakeLookup::new(&[("u1", "Alice", 20)]);
        let aggregator = EnrichmentAggregator::new(lookup);

        let out = aggregator
            .enrich_comments(vec![
                comment("k1", CommentAuthor::Id("u1".to_string())),
                comment("k2", CommentAuthor::Id("gone".to_string())),
                comment(
                    "k3",
                    CommentAuthor::Embedded(AuthorSnapshot {
                        id: "u3".to_string(),
                        name: "Carol".to_string(),
                        img: None,
                    }),
                ),
            ])
            .await;

        assert_eq!(
            out.iter().map(|e| e.comment.id.as_str()).collect::<Vec<_>>(),
            ["k1", "k2", "k3"]
        );
        assert_eq!(out[0].author_name, "Alice");
        assert_eq!(out[0].author_img_url, "/img/u1.png");
        assert_eq!(out[1].author_name, UNKNOWN_AUTHOR_NAME);
        assert_eq!(out[1].author_img_url, DEFAULT_AUTHOR_AVATAR);
        assert_eq!(out[2].author_name, "Carol");
        assert_eq!(out[2].author_img_url, DEFAULT_AUTHOR_AVATAR);

        // Embedded authors are not looked up again.
        let calls = aggregator.lookup.calls.lock().unwrap().clone();
        assert_eq!(calls, ["u1", "gone"]);
    }
}
