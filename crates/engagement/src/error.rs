use session::SessionError;

/// Errors surfaced by the engagement core.
#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    /// No usable bearer credential at the point of a mutating call.
    /// Raised before any network I/O.
    #[error("no usable bearer credential; sign in again")]
    AuthMissing,

    /// Non-success HTTP status, transport failure, or undecodable body.
    #[error("remote request failed ({}): {detail}", .status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    Remote {
        /// HTTP status code, absent when no response was received.
        status: Option<u16>,
        /// Response body or transport error text.
        detail: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The same operation on the same entity has not settled yet.
    #[error("an identical request is still in flight")]
    InFlight,

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("no video is loaded")]
    NoActiveVideo,

    /// The result belonged to an entity that is no longer the active one
    /// and was discarded.
    #[error("result for {target} arrived after it was superseded")]
    Superseded { target: String },

    #[error("invalid API base URL: {0}")]
    BaseUrl(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<reqwest::Error> for EngagementError {
    fn from(err: reqwest::Error) -> Self {
        EngagementError::Remote {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

impl EngagementError {
    /// Short message suitable for an inline notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            EngagementError::AuthMissing | EngagementError::NotSignedIn => "Please sign in to continue.",
            EngagementError::Remote { .. } => "Something went wrong talking to the server. Try again.",
            EngagementError::InvalidInput(_) => "Please check your input.",
            EngagementError::InFlight => "Still working on your last request.",
            EngagementError::NoActiveVideo | EngagementError::Superseded { .. } => "This video is no longer open.",
            EngagementError::BaseUrl(_) | EngagementError::Session(_) => "The client is misconfigured.",
        }
    }
}
