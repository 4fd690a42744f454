//! HTTP client for the video-sharing API.
//!
//! Stateless: every call is fire-once, returns what the server said, and
//! never retries. Mutating calls take the raw session token and refuse to
//! touch the network unless it is a usable [`Credential`].

use domain::{
    AuthPayload, Channel, Comment, CommentEnvelope, CommentList, NewComment, NewVideo, Video,
    VideoEnvelope, VideoList,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use session::{Credential, Session};

use crate::feed::VideoQuery;
use crate::{ClientConfig, EngagementError};

#[derive(Debug, Clone)]
pub struct EngagementClient {
    client: reqwest::Client,
    base_url: Url,
}

impl EngagementClient {
    pub fn new(config: &ClientConfig) -> Result<Self, EngagementError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, EngagementError> {
        let base_url =
            Url::parse(base_url).map_err(|e| EngagementError::BaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(EngagementError::BaseUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // ---- reads ----

    /// `GET /videos/find/{id}`
    pub async fn fetch_video(&self, video_id: &str) -> Result<Video, EngagementError> {
        let url = self.endpoint(&["videos", "find", video_id])?;
        tracing::debug!(video_id, "Fetching video");
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /users/find/{id}`
    pub async fn fetch_channel(&self, channel_id: &str) -> Result<Channel, EngagementError> {
        let url = self.endpoint(&["users", "find", channel_id])?;
        tracing::debug!(channel_id, "Fetching channel");
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /comments/{videoId}`
    pub async fn fetch_comments(&self, video_id: &str) -> Result<Vec<Comment>, EngagementError> {
        let url = self.endpoint(&["comments", video_id])?;
        tracing::debug!(video_id, "Fetching comments");
        let response = self.client.get(url).send().await?;
        let list: CommentList = Self::parse_response(response).await?;
        Ok(list.comments)
    }

    /// Filter, search or tag listing. The credential is attached when
    /// given; only the subscriptions feed needs it.
    pub async fn list_videos(
        &self,
        query: &VideoQuery,
        credential: Option<&Credential>,
    ) -> Result<Vec<Video>, EngagementError> {
        let (segment, param, value) = query.request_parts();
        let url = self.endpoint(&["videos", segment])?;
        tracing::debug!(%segment, %value, "Listing videos");
        let mut request = self.client.get(url).query(&[(param, value)]);
        if let Some(credential) = credential {
            request = request.header(reqwest::header::AUTHORIZATION, credential.bearer());
        }
        let response = request.send().await?;
        let list: VideoList = Self::parse_response(response).await?;
        Ok(list.into_videos())
    }

    // ---- mutations ----

    /// `PUT /users/like/{videoId}`
    pub async fn like(&self, token: &str, video_id: &str) -> Result<serde_json::Value, EngagementError> {
        self.put_empty(token, &["users", "like", video_id]).await
    }

    /// `PUT /users/dislike/{videoId}`
    pub async fn dislike(&self, token: &str, video_id: &str) -> Result<serde_json::Value, EngagementError> {
        self.put_empty(token, &["users", "dislike", video_id]).await
    }

    /// `PUT /users/sub/{channelId}`
    pub async fn subscribe(&self, token: &str, channel_id: &str) -> Result<serde_json::Value, EngagementError> {
        self.put_empty(token, &["users", "sub", channel_id]).await
    }

    /// `PUT /users/unsub/{channelId}`
    pub async fn unsubscribe(&self, token: &str, channel_id: &str) -> Result<serde_json::Value, EngagementError> {
        self.put_empty(token, &["users", "unsub", channel_id]).await
    }

    /// `POST /comments/`. Returns the comment as stored by the server.
    pub async fn post_comment(&self, token: &str, video_id: &str, desc: &str) -> Result<Comment, EngagementError> {
        let credential = Self::authorize(token)?;
        let url = self.endpoint(&["comments", ""])?;
        let body = NewComment {
            video_id: video_id.to_string(),
            desc: desc.to_string(),
        };
        tracing::debug!(video_id, "Posting comment");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .json(&body)
            .send()
            .await?;
        let envelope: CommentEnvelope = Self::parse_response(response).await?;
        Ok(envelope.comment)
    }

    /// `POST /videos`. Media must already be uploaded.
    pub async fn create_video(&self, token: &str, video: &NewVideo) -> Result<Video, EngagementError> {
        let credential = Self::authorize(token)?;
        let url = self.endpoint(&["videos"])?;
        tracing::debug!(title = %video.title, "Creating video");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .json(video)
            .send()
            .await?;
        let envelope: VideoEnvelope = Self::parse_response(response).await?;
        Ok(envelope.video)
    }

    // ---- auth ----

    /// `POST /auth/signin`
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, EngagementError> {
        let url = self.endpoint(&["auth", "signin"])?;
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.client.post(url).json(&body).send().await?;
        let payload: AuthPayload = Self::parse_response(response).await?;
        Ok(payload.into())
    }

    /// `POST /auth/signup`
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Session, EngagementError> {
        let url = self.endpoint(&["auth", "signup"])?;
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        let response = self.client.post(url).json(&body).send().await?;
        let payload: AuthPayload = Self::parse_response(response).await?;
        Ok(payload.into())
    }

    // ---- private helpers ----

    fn authorize(token: &str) -> Result<Credential, EngagementError> {
        Credential::parse(token).ok_or_else(|| {
            tracing::warn!("Mutating call attempted without a credential");
            EngagementError::AuthMissing
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, EngagementError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| EngagementError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Authenticated `PUT` with an empty body; returns the server's reply
    /// as JSON, or as a JSON string when the body is plain text.
    async fn put_empty(&self, token: &str, segments: &[&str]) -> Result<serde_json::Value, EngagementError> {
        let credential = Self::authorize(token)?;
        let url = self.endpoint(segments)?;
        tracing::debug!(path = %url.path(), "Sending mutation");
        let response = self
            .client
            .put(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    /// Map a non-2xx response to [`EngagementError::Remote`] carrying the body.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, EngagementError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), %detail, "Remote call failed");
            return Err(EngagementError::Remote {
                status: Some(status.as_u16()),
                detail,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, EngagementError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
