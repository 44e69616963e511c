//! Engagement counters and the current user's own flags on a feed item.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A reaction a user can leave on a pulse. One at a time per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Love,
    Fire,
    Mindblown,
    Laugh,
    Sad,
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 6] = [
        ReactionKind::Love,
        ReactionKind::Fire,
        ReactionKind::Mindblown,
        ReactionKind::Laugh,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Love => "love",
            ReactionKind::Fire => "fire",
            ReactionKind::Mindblown => "mindblown",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Sad => "sad",
            ReactionKind::Angry => "angry",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown reaction type: {}", s))
    }
}

/// Helpfulness vote on a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Helpful,
    Unhelpful,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Helpful => "helpful",
            VoteKind::Unhelpful => "unhelpful",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helpful" => Ok(VoteKind::Helpful),
            "unhelpful" => Ok(VoteKind::Unhelpful),
            other => Err(format!("Unknown vote type: {}", other)),
        }
    }
}

/// Mutable engagement state attached to every feed item.
///
/// `total` always equals the sum of `reactions`. Every known reaction kind
/// has an entry, zero if nobody reacted with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub reactions: BTreeMap<ReactionKind, u64>,
    pub total: u64,
    pub comments: u64,
    pub shares: u64,
    pub helpful_count: u64,
    pub unhelpful_count: u64,
    pub user_reaction: Option<ReactionKind>,
    pub user_vote: Option<VoteKind>,
    pub has_commented: bool,
    pub has_shared: bool,
    pub has_bookmarked: bool,
}

impl Default for EngagementRecord {
    fn default() -> Self {
        Self {
            reactions: ReactionKind::ALL.into_iter().map(|k| (k, 0)).collect(),
            total: 0,
            comments: 0,
            shares: 0,
            helpful_count: 0,
            unhelpful_count: 0,
            user_reaction: None,
            user_vote: None,
            has_commented: false,
            has_shared: false,
            has_bookmarked: false,
        }
    }
}

impl EngagementRecord {
    /// Build a record from reaction counts; `total` is derived.
    pub fn with_reactions(counts: impl IntoIterator<Item = (ReactionKind, u64)>) -> Self {
        let mut record = Self::default();
        for (kind, count) in counts {
            record.reactions.insert(kind, count);
        }
        record.total = record.reaction_sum();
        record
    }

    pub fn reaction_count(&self, kind: ReactionKind) -> u64 {
        self.reactions.get(&kind).copied().unwrap_or(0)
    }

    pub fn reaction_sum(&self) -> u64 {
        self.reactions.values().sum()
    }

    pub fn vote_count(&self, kind: VoteKind) -> u64 {
        match kind {
            VoteKind::Helpful => self.helpful_count,
            VoteKind::Unhelpful => self.unhelpful_count,
        }
    }

    pub(crate) fn vote_count_mut(&mut self, kind: VoteKind) -> &mut u64 {
        match kind {
            VoteKind::Helpful => &mut self.helpful_count,
            VoteKind::Unhelpful => &mut self.unhelpful_count,
        }
    }

    /// Add a signed delta to a vote counter, saturating at zero.
    pub fn adjust_vote(&mut self, kind: VoteKind, delta: i64) {
        let slot = self.vote_count_mut(kind);
        *slot = saturating_apply(*slot, delta);
    }

    /// Add a signed delta to a reaction counter and to `total`, saturating at zero.
    pub fn adjust_reaction(&mut self, kind: ReactionKind, delta: i64) {
        let slot = self.reactions.entry(kind).or_insert(0);
        *slot = saturating_apply(*slot, delta);
        self.total = saturating_apply(self.total, delta);
    }

    /// Whether `total` matches the reaction counters.
    pub fn is_consistent(&self) -> bool {
        self.total == self.reaction_sum()
    }
}

pub fn saturating_apply(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}
