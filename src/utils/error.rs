//! Error types for the refresh collaborators
//!
//! This module defines the errors reported by the store and by the feed
//! source (fetch + parse).

use thiserror::Error;

/// Errors reported by the persistence store
///
/// Cloneable so a single failed lookup can be handed to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// User does not exist
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// Feed does not exist or belongs to another user
    #[error("Feed {feed_id} not found for user {user_id}")]
    FeedNotFound { user_id: i64, feed_id: i64 },

    /// Backend temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a later attempt may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors reported by the feed source while fetching and parsing
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Non-success HTTP status
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded into a feed
    #[error("Failed to parse feed {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl SourceError {
    /// Whether a later attempt may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse { .. } => false,
        }
    }
}
