//! Shared domain types for the Siddu engagement engine
//!
//! This crate has no I/O. It defines the feed entities, the engagement
//! sub-record every item carries, change notifications, and the error type
//! that crosses every crate boundary.

use serde::{Deserialize, Serialize};

pub mod engagement;
pub mod feed;
pub mod streaming;

pub use engagement::{EngagementRecord, ReactionKind, VoteKind};
pub use feed::{
    Comment, FeedFilter, FeedItem, FeedPage, FeedQuery, ItemKind, PulseCreate, PosterRole,
    TimeWindow,
};
pub use streaming::{Change, ChangeOrigin};

/// Structured error type for remote and local operations.
///
/// `Transport`, `Status` and `Malformed` are the three ways a confirmation
/// request can fail; callers that only care about "did the action go
/// through" use [`ApiError::is_action_failure`]. `NotAuthenticated` is raised
/// before any request is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {message}")]
    Malformed { message: String },

    #[error("Authentication required to {action}")]
    NotAuthenticated { action: String },

    #[error("Item not found: {id}")]
    NotFound { id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// True for failures that happened after a request was issued.
    pub fn is_action_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Transport { .. } | ApiError::Status { .. } | ApiError::Malformed { .. }
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::Malformed {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
