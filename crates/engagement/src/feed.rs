//! Video lists (home feeds, search, recommendations) with channel enrichment.

use std::sync::{Arc, RwLock};

use domain::EnrichedVideoSummary;
use session::SessionContext;

use crate::enrichment::EnrichmentAggregator;
use crate::state::{FetchSlot, FetchState};
use crate::{EngagementClient, EngagementError};

/// Home-feed variants understood by `GET /videos/filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFilter {
    #[default]
    All,
    Random,
    Trend,
    /// Videos from subscribed channels; needs a credential.
    Subscriptions,
}

impl FeedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFilter::All => "all",
            FeedFilter::Random => "random",
            FeedFilter::Trend => "trend",
            FeedFilter::Subscriptions => "sub",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoQuery {
    Filter(FeedFilter),
    Search(String),
    /// Recommendations by tag
    Tags(Vec<String>),
}

impl VideoQuery {
    /// `(path segment, query parameter, value)` for the list request
    pub(crate) fn request_parts(&self) -> (&'static str, &'static str, String) {
        match self {
            VideoQuery::Filter(filter) => ("filter", "filter", filter.as_str().to_string()),
            VideoQuery::Search(q) => ("search", "q", q.trim().to_string()),
            VideoQuery::Tags(tags) => ("tags", "tags", tags.join(",")),
        }
    }

    /// Identity of the list, used to tag fetches.
    pub fn key(&self) -> String {
        let (segment, _, value) = self.request_parts();
        format!("{segment}:{value}")
    }

    /// Queries that can only ever produce an empty list.
    fn is_blank(&self) -> bool {
        match self {
            VideoQuery::Filter(_) => false,
            VideoQuery::Search(q) => q.trim().is_empty(),
            VideoQuery::Tags(tags) => tags.iter().all(|t| t.trim().is_empty()),
        }
    }
}

/// One list view: the latest query's enriched videos.
#[derive(Clone)]
pub struct FeedView {
    client: EngagementClient,
    session: SessionContext,
    aggregator: Arc<EnrichmentAggregator<EngagementClient>>,
    slot: Arc<RwLock<FetchSlot<Vec<EnrichedVideoSummary>>>>,
}

impl FeedView {
    pub fn new(client: EngagementClient, session: SessionContext) -> Self {
        Self {
            aggregator: Arc::new(EnrichmentAggregator::new(client.clone())),
            client,
            session,
            slot: Arc::new(RwLock::new(FetchSlot::default())),
        }
    }

    /// Fetch and enrich the list for `query`, replacing the held one.
    ///
    /// A blank search settles to an empty list without a request. If a
    /// newer load started meanwhile the result is discarded and
    /// [`EngagementError::Superseded`] is returned.
    pub async fn load(&self, query: &VideoQuery) -> Result<Vec<EnrichedVideoSummary>, EngagementError> {
        let key = query.key();
        let ticket = self.slot.write().expect("Failed to acquire write lock on feed").begin(&key);

        if query.is_blank() {
            self.slot
                .write()
                .expect("Failed to acquire write lock on feed")
                .settle_ok(&ticket, Vec::new());
            return Ok(Vec::new());
        }

        let credential = self.session.credential();
        let videos = match self.client.list_videos(query, credential.as_ref()).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to load video list");
                self.slot
                    .write()
                    .expect("Failed to acquire write lock on feed")
                    .settle_err(&ticket, &e);
                return Err(e);
            }
        };

        let enriched = self.aggregator.enrich(videos).await;
        let committed = self
            .slot
            .write()
            .expect("Failed to acquire write lock on feed")
            .settle_ok(&ticket, enriched.clone());
        if !committed {
            return Err(EngagementError::Superseded { target: key });
        }
        tracing::debug!(%key, count = enriched.len(), "Video list ready");
        Ok(enriched)
    }

    pub fn state(&self) -> FetchState<Vec<EnrichedVideoSummary>> {
        self.slot.read().expect("Failed to acquire read lock on feed").state().clone()
    }

    /// Held videos; empty unless the last load succeeded.
    pub fn videos(&self) -> Vec<EnrichedVideoSummary> {
        self.state().ready().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parts_match_endpoints() {
        assert_eq!(
            VideoQuery::Filter(FeedFilter::Trend).request_parts(),
            ("filter", "filter", "trend".to_string())
        );
        assert_eq!(
            VideoQuery::Search("  cats ".to_string()).request_parts(),
            ("search", "q", "cats".to_string())
        );
        assert_eq!(
            VideoQuery::Tags(vec!["rust".to_string(), "async".to_string()]).request_parts(),
            ("tags", "tags", "rust,async".to_string())
        );
        assert_eq!(FeedFilter::default().as_str(), "all");
        assert_eq!(FeedFilter::Subscriptions.as_str(), "sub");
    }

    #[test]
    fn blank_queries_are_detected() {
        assert!(VideoQuery::Search("   ".to_string()).is_blank());
        assert!(VideoQuery::Tags(vec![]).is_blank());
        assert!(!VideoQuery::Filter(FeedFilter::All).is_blank());
    }
}
