//! Engagement state synchronization for the video-sharing client.
//!
//! Keeps locally held reactions, subscriptions and comment threads in step
//! with the remote API. The rules every component follows:
//!
//! * mutations are confirm-then-apply: nothing changes locally until the
//!   server acknowledged the request, and a failure changes nothing;
//! * a repeat trigger while the same operation is pending is refused
//!   ([`EngagementError::InFlight`]) instead of issuing a second request;
//! * every fetch is tagged with the entity it targets and its result is
//!   dropped if a newer fetch started meanwhile;
//! * list enrichment degrades per item and never fails the whole list.

mod client;
mod comments;
mod config;
mod enrichment;
mod error;
mod feed;
mod reactions;
mod state;
mod subscriptions;
mod watch;

pub use client::EngagementClient;
pub use comments::CommentThreadManager;
pub use config::ClientConfig;
pub use enrichment::{ChannelLookup, EnrichmentAggregator};
pub use error::EngagementError;
pub use feed::{FeedFilter, FeedView, VideoQuery};
pub use reactions::{ReactionKind, ReactionStore};
pub use state::{FetchSlot, FetchState, LoadTicket, PendingGuard, PendingSet};
pub use subscriptions::SubscriptionStore;
pub use watch::WatchPage;
