//! The seam between the feed engine and the Siddu backend.

use async_trait::async_trait;
use siddu_api::{Comment, FeedItem, FeedPage, FeedQuery, PulseCreate, ReactionKind, Result, VoteKind};

use crate::models::ReactionSnapshot;

/// Remote operations the engine needs.
///
/// Every method issues at most one request and never retries. Failures are
/// `ApiError::{Transport, Status, Malformed}`; write operations without
/// credentials fail with `ApiError::NotAuthenticated` before sending.
#[async_trait]
pub trait EngagementRemote: Send + Sync {
    /// Whether write operations can be attempted at all.
    fn is_authenticated(&self) -> bool;

    async fn get_feed(&self, query: &FeedQuery, page: u32, limit: u32) -> Result<FeedPage>;

    async fn create_pulse(&self, body: &PulseCreate) -> Result<FeedItem>;

    async fn delete_pulse(&self, id: &str) -> Result<()>;

    async fn toggle_reaction(&self, id: &str, kind: ReactionKind) -> Result<ReactionSnapshot>;

    async fn bookmark(&self, id: &str) -> Result<()>;

    async fn unbookmark(&self, id: &str) -> Result<()>;

    /// Returns the new share count when the server reports one.
    async fn share(&self, id: &str) -> Result<Option<u64>>;

    async fn add_comment(&self, id: &str, content: &str) -> Result<Comment>;

    async fn list_comments(&self, id: &str, page: u32) -> Result<Vec<Comment>>;

    /// Returns the vote the server recorded.
    async fn vote(&self, review_id: &str, kind: VoteKind) -> Result<VoteKind>;

    async fn remove_vote(&self, review_id: &str) -> Result<()>;

    async fn get_vote(&self, review_id: &str) -> Result<Option<VoteKind>>;
}
