//! Wire formats of the Siddu REST API and their conversion to domain types.
//!
//! Decoding is strict about types (negative counters, unknown reaction or
//! vote names fail) and lenient about envelopes: list endpoints may answer
//! with a bare array or a wrapping object.

use serde::{Deserialize, Serialize};
use siddu_api::{
    ApiError, Comment, EngagementRecord, FeedItem, FeedPage, ReactionKind, Result, VoteKind,
};
use siddu_core::Confirmation;
use std::collections::BTreeMap;
use tracing::debug;

/// Engagement block of a pulse as the backend serializes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementDto {
    /// Counts per reaction name plus a `total` entry
    #[serde(default)]
    pub reactions: BTreeMap<String, u64>,
    #[serde(default)]
    pub user_reaction: Option<String>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub has_commented: bool,
    #[serde(default)]
    pub has_shared: bool,
    #[serde(default)]
    pub has_bookmarked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseDto {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_info: serde_json::Value,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub engagement: EngagementDto,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationDto {
    #[serde(default, alias = "currentPage")]
    pub current_page: Option<u32>,
    #[serde(default, alias = "hasMore")]
    pub has_more: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Paginated {
        posts: Vec<PulseDto>,
        #[serde(default)]
        pagination: Option<PaginationDto>,
    },
    Bare(Vec<PulseDto>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentDto {
    pub id: String,
    #[serde(default, alias = "postId")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub author: serde_json::Value,
    pub content: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CommentsResponse {
    Paginated { comments: Vec<CommentDto> },
    Bare(Vec<CommentDto>),
}

/// Canonical reaction counters returned by a reaction toggle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSnapshotDto {
    pub reactions: BTreeMap<String, u64>,
    #[serde(default)]
    pub user_reaction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDto {
    #[serde(default)]
    pub id: Option<String>,
    pub vote_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Reaction state after a toggle, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionSnapshot {
    pub reactions: BTreeMap<ReactionKind, u64>,
    pub total: u64,
    pub user_reaction: Option<ReactionKind>,
}

impl ReactionSnapshot {
    pub fn into_confirmation(self) -> Confirmation {
        Confirmation::reactions(self.reactions, self.user_reaction)
    }
}

fn parse_reaction(name: &str) -> Result<ReactionKind> {
    name.parse::<ReactionKind>().map_err(ApiError::malformed)
}

pub(crate) fn parse_vote(name: &str) -> Result<VoteKind> {
    name.parse::<VoteKind>().map_err(ApiError::malformed)
}

/// Split a `{love: .., fire: .., total: ..}` map into known kinds and the
/// server's total. Unknown keys are ignored.
fn split_reactions(raw: &BTreeMap<String, u64>) -> (BTreeMap<ReactionKind, u64>, Option<u64>) {
    let mut reactions = BTreeMap::new();
    let mut total = None;
    for (name, count) in raw {
        if name == "total" {
            total = Some(*count);
        } else if let Ok(kind) = name.parse::<ReactionKind>() {
            reactions.insert(kind, *count);
        } else {
            debug!("[SidduClient] Ignoring unknown reaction counter '{}'", name);
        }
    }
    (reactions, total)
}

impl EngagementDto {
    pub fn into_record(self) -> Result<EngagementRecord> {
        let (reactions, server_total) = split_reactions(&self.reactions);
        let mut record = EngagementRecord::with_reactions(reactions);
        if let Some(total) = server_total {
            if total != record.total {
                debug!(
                    "[SidduClient] Server total {} disagrees with counter sum {}, using the sum",
                    total, record.total
                );
            }
        }
        record.user_reaction = self.user_reaction.as_deref().map(parse_reaction).transpose()?;
        record.comments = self.comments;
        record.shares = self.shares;
        record.has_commented = self.has_commented;
        record.has_shared = self.has_shared;
        record.has_bookmarked = self.has_bookmarked;
        Ok(record)
    }
}

impl PulseDto {
    pub fn into_feed_item(self) -> Result<FeedItem> {
        if self.id.is_empty() {
            return Err(ApiError::malformed("pulse without id"));
        }
        let engagement = self.engagement.into_record()?;
        let payload = serde_json::json!({
            "userId": self.user_id,
            "userInfo": self.user_info,
            "content": self.content,
            "timestamp": self.timestamp,
            "editedAt": self.edited_at,
        });
        Ok(FeedItem::pulse(self.id, engagement).with_payload(payload))
    }
}

impl FeedResponse {
    pub fn into_page(self) -> Result<FeedPage> {
        let (posts, pagination) = match self {
            FeedResponse::Paginated { posts, pagination } => (posts, pagination),
            FeedResponse::Bare(posts) => (posts, None),
        };
        let items = posts
            .into_iter()
            .map(PulseDto::into_feed_item)
            .collect::<Result<Vec<_>>>()?;
        let pagination = pagination.unwrap_or_default();
        Ok(FeedPage {
            items,
            current_page: pagination.current_page,
            has_more: pagination.has_more,
        })
    }
}

impl CommentDto {
    pub fn into_comment(self, item_id: &str) -> Comment {
        Comment {
            id: self.id,
            item_id: self.post_id.unwrap_or_else(|| item_id.to_string()),
            content: self.content,
            author: self.author,
            created_at: self.created_at,
        }
    }
}

impl CommentsResponse {
    pub fn into_comments(self, item_id: &str) -> Vec<Comment> {
        let dtos = match self {
            CommentsResponse::Paginated { comments } => comments,
            CommentsResponse::Bare(comments) => comments,
        };
        dtos.into_iter().map(|c| c.into_comment(item_id)).collect()
    }
}

impl ReactionSnapshotDto {
    pub fn into_snapshot(self) -> Result<ReactionSnapshot> {
        let (mut reactions, total) = split_reactions(&self.reactions);
        for kind in ReactionKind::ALL {
            reactions.entry(kind).or_insert(0);
        }
        let sum = reactions.values().sum();
        Ok(ReactionSnapshot {
            reactions,
            total: total.unwrap_or(sum),
            user_reaction: self.user_reaction.as_deref().map(parse_reaction).transpose()?,
        })
    }
}

/// Share count from a share response, whatever shape it came in.
///
/// The backend has answered with a bare number and with `{shares}` /
/// `{shareCount}` objects; anything else carries no count.
pub fn share_count(body: &serde_json::Value) -> Option<u64> {
    body.as_u64().or_else(|| {
        ["shares", "shareCount", "shares_count"]
            .iter()
            .find_map(|key| body.get(key).and_then(serde_json::Value::as_u64))
    })
}
