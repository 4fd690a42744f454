//! The signed-in user's channel subscriptions.

use std::collections::BTreeSet;

use session::{SessionClaim, SessionContext};

use crate::EngagementError;

/// View over the session user's `subscribedUsers` set.
///
/// Unlike reactions this is a true toggle. Every change is persisted
/// through the session before it becomes visible. Pending changes are
/// claimed on the session itself, so every store sharing one session sees
/// the same claims.
#[derive(Clone)]
pub struct SubscriptionStore {
    session: SessionContext,
}

fn claim_key(channel_id: &str) -> String {
    format!("subscription:{channel_id}")
}

impl SubscriptionStore {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }

    /// Current subscriptions; empty when signed out.
    pub fn subscriptions(&self) -> BTreeSet<String> {
        self.session
            .current_user()
            .map(|user| user.subscribed_users)
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.session
            .current_user()
            .is_some_and(|user| user.is_subscribed(channel_id))
    }

    /// Claim `channel_id` for the whole session until the claim drops.
    /// While held, the direction read by [`SubscriptionStore::is_subscribed`]
    /// cannot go stale through a second change to the same channel.
    pub fn try_begin(&self, channel_id: &str) -> Result<SessionClaim, EngagementError> {
        self.session
            .try_claim(&claim_key(channel_id))
            .ok_or(EngagementError::InFlight)
    }

    pub fn is_pending(&self, channel_id: &str) -> bool {
        self.session.is_claimed(&claim_key(channel_id))
    }

    /// Record the membership the server confirmed. Returns `subscribed`.
    pub fn set_subscription(&self, channel_id: &str, subscribed: bool) -> Result<bool, EngagementError> {
        if channel_id.is_empty() {
            return Err(EngagementError::InvalidInput("channel id is empty"));
        }
        let changed = self
            .session
            .update_user(|user| user.set_subscription(channel_id, subscribed))?
            .ok_or(EngagementError::NotSignedIn)?;
        tracing::info!(channel_id, subscribed, changed, "Applied subscription");
        Ok(subscribed)
    }

    /// Flip membership of `channel_id`. Returns `true` when now subscribed.
    pub fn toggle_subscription(&self, channel_id: &str) -> Result<bool, EngagementError> {
        if channel_id.is_empty() {
            return Err(EngagementError::InvalidInput("channel id is empty"));
        }
        let subscribed = self
            .session
            .update_user(|user| user.toggle_subscription(channel_id))?
            .ok_or(EngagementError::NotSignedIn)?;
        tracing::info!(channel_id, subscribed, "Applied subscription toggle");
        Ok(subscribed)
    }
}
