//! Watch page: one viewed video with its channel, reactions and comments.

use std::sync::{Arc, RwLock};

use domain::{Channel, Comment, EnrichedComment, Video};
use session::SessionContext;

use crate::comments::CommentThreadManager;
use crate::enrichment::EnrichmentAggregator;
use crate::reactions::{ReactionKind, ReactionStore};
use crate::state::{FetchSlot, FetchState};
use crate::subscriptions::SubscriptionStore;
use crate::{EngagementClient, EngagementError};

/// Wires the stores of one watch page to the client and the session.
///
/// Every mutation follows the same order: claim the in-flight guard, call
/// the server, and apply the change locally only once it confirmed.
#[derive(Clone)]
pub struct WatchPage {
    client: EngagementClient,
    session: SessionContext,
    reactions: ReactionStore,
    subscriptions: SubscriptionStore,
    thread: CommentThreadManager,
    channel: Arc<RwLock<FetchSlot<Channel>>>,
    authors: Arc<EnrichmentAggregator<EngagementClient>>,
}

impl WatchPage {
    pub fn new(client: EngagementClient, session: SessionContext) -> Self {
        Self {
            subscriptions: SubscriptionStore::new(session.clone()),
            authors: Arc::new(EnrichmentAggregator::new(client.clone())),
            client,
            session,
            reactions: ReactionStore::new(),
            thread: CommentThreadManager::new(),
            channel: Arc::new(RwLock::new(FetchSlot::default())),
        }
    }

    /// Load the video (then its channel) and the comment thread concurrently.
    ///
    /// The video result is returned; a failed thread load only shows up in
    /// [`WatchPage::thread`]'s state.
    pub async fn open(&self, video_id: &str) -> Result<Video, EngagementError> {
        let (video, _thread) = futures::join!(
            self.load_video_and_channel(video_id),
            self.thread.load_thread(&self.client, video_id),
        );
        video
    }

    async fn load_video_and_channel(&self, video_id: &str) -> Result<Video, EngagementError> {
        let video = self.reactions.load(&self.client, video_id).await?;

        let ticket = self
            .channel
            .write()
            .expect("Failed to acquire write lock on channel")
            .begin(&video.user_id);
        let result = self.client.fetch_channel(&video.user_id).await;
        let mut slot = self.channel.write().expect("Failed to acquire write lock on channel");
        match result {
            Ok(channel) => {
                slot.settle_ok(&ticket, channel);
            }
            Err(e) => {
                tracing::warn!(channel_id = %video.user_id, error = %e, "Failed to load channel");
                slot.settle_err(&ticket, &e);
            }
        }
        Ok(video)
    }

    pub async fn like(&self) -> Result<Video, EngagementError> {
        self.react(ReactionKind::Like).await
    }

    pub async fn dislike(&self) -> Result<Video, EngagementError> {
        self.react(ReactionKind::Dislike).await
    }

    async fn react(&self, kind: ReactionKind) -> Result<Video, EngagementError> {
        let video_id = self
            .reactions
            .video()
            .map(|video| video.id)
            .ok_or(EngagementError::NoActiveVideo)?;
        let _guard = self.reactions.try_begin(&video_id)?;

        let token = self.session.raw_token();
        let user_id = self.session.user_id();
        match kind {
            ReactionKind::Like => self.client.like(&token, &video_id).await?,
            ReactionKind::Dislike => self.client.dislike(&token, &video_id).await?,
        };

        // The reaction belongs to whoever sent it, even if the session changed meanwhile.
        let user_id = user_id.ok_or(EngagementError::NotSignedIn)?;
        self.reactions.apply(kind, &video_id, &user_id)
    }

    /// Subscribe to or unsubscribe from the video's channel, whichever the
    /// current membership calls for. Returns `true` when now subscribed.
    pub async fn toggle_subscription(&self) -> Result<bool, EngagementError> {
        let channel_id = self
            .reactions
            .video()
            .map(|video| video.user_id)
            .ok_or(EngagementError::NoActiveVideo)?;
        let _guard = self.subscriptions.try_begin(&channel_id)?;

        let token = self.session.raw_token();
        let subscribe = !self.subscriptions.is_subscribed(&channel_id);
        if subscribe {
            self.client.subscribe(&token, &channel_id).await?;
        } else {
            self.client.unsubscribe(&token, &channel_id).await?;
        }
        self.subscriptions.set_subscription(&channel_id, subscribe)
    }

    pub async fn post_comment(&self, text: &str) -> Result<Comment, EngagementError> {
        let video_id = self
            .reactions
            .video()
            .map(|video| video.id)
            .ok_or(EngagementError::NoActiveVideo)?;
        let token = self.session.raw_token();
        self.thread.post_comment(&self.client, &token, &video_id, text).await
    }

    /// The held thread with every author's name and avatar resolved.
    pub async fn comments_with_authors(&self) -> Vec<EnrichedComment> {
        self.authors.enrich_comments(self.thread.comments()).await
    }

    pub fn video_state(&self) -> FetchState<Video> {
        self.reactions.state()
    }

    pub fn channel_state(&self) -> FetchState<Channel> {
        self.channel
            .read()
            .expect("Failed to acquire read lock on channel")
            .state()
            .clone()
    }

    pub fn is_subscribed_to_channel(&self) -> bool {
        self.reactions
            .video()
            .is_some_and(|video| self.subscriptions.is_subscribed(&video.user_id))
    }

    pub fn reactions(&self) -> &ReactionStore {
        &self.reactions
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    pub fn thread(&self) -> &CommentThreadManager {
        &self.thread
    }
}
