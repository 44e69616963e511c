//! Canonical values returned by the server after a confirmed action.
//!
//! Optimistic counters are estimates. When the server answers with its own
//! numbers they win; fields the server did not send keep the local value.

use serde::{Deserialize, Serialize};
use siddu_api::{Comment, EngagementRecord, ReactionKind, VoteKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Confirmation {
    /// Server reaction counters; `total` is re-derived from them
    pub reactions: Option<BTreeMap<ReactionKind, u64>>,
    /// `Some(None)` means the server says the user has no reaction
    pub user_reaction: Option<Option<ReactionKind>>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub helpful_count: Option<u64>,
    pub unhelpful_count: Option<u64>,
    pub user_vote: Option<Option<VoteKind>>,
    /// Server copy of a comment created by the action
    pub comment: Option<Comment>,
}

impl Confirmation {
    /// The server accepted the action but sent nothing to merge.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn reactions(
        reactions: BTreeMap<ReactionKind, u64>,
        user_reaction: Option<ReactionKind>,
    ) -> Self {
        Self {
            reactions: Some(reactions),
            user_reaction: Some(user_reaction),
            ..Default::default()
        }
    }

    pub fn comment(comment: Comment) -> Self {
        Self {
            comment: Some(comment),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite locally estimated values in `record` with the canonical ones.
    pub fn merge_into(&self, record: &mut EngagementRecord) {
        if let Some(reactions) = &self.reactions {
            for (kind, count) in reactions {
                record.reactions.insert(*kind, *count);
            }
            record.total = record.reaction_sum();
        }
        if let Some(user_reaction) = self.user_reaction {
            record.user_reaction = user_reaction;
        }
        if let Some(comments) = self.comments {
            record.comments = comments;
        }
        if let Some(shares) = self.shares {
            record.shares = shares;
        }
        if let Some(helpful) = self.helpful_count {
            record.helpful_count = helpful;
        }
        if let Some(unhelpful) = self.unhelpful_count {
            record.unhelpful_count = unhelpful;
        }
        if let Some(user_vote) = self.user_vote {
            record.user_vote = user_vote;
        }
    }
}
