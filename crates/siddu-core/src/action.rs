//! User engagement actions and how each one is reconciled
//!
//! Every action type maps to an [`ActionPolicy`] entry. The engine reads the
//! policy instead of branching on the action, so changing how an action is
//! recovered after a failed request is a table edit.

use serde::{Deserialize, Serialize};
use siddu_api::{ItemKind, ReactionKind, VoteKind};

/// A user gesture on a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementAction {
    /// Toggle a reaction (set, clear, or swap for another kind)
    React(ReactionKind),
    ToggleBookmark,
    /// Shares are one-shot; there is no local unshare
    Share,
    Comment { content: String },
    /// Toggle a helpfulness vote on a review
    Vote(VoteKind),
}

impl EngagementAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            EngagementAction::React(_) => ActionKind::Reaction,
            EngagementAction::ToggleBookmark => ActionKind::Bookmark,
            EngagementAction::Share => ActionKind::Share,
            EngagementAction::Comment { .. } => ActionKind::Comment,
            EngagementAction::Vote(_) => ActionKind::Vote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Reaction,
    Bookmark,
    Share,
    Comment,
    Vote,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Reaction,
        ActionKind::Bookmark,
        ActionKind::Share,
        ActionKind::Comment,
        ActionKind::Vote,
    ];

    fn index(self) -> usize {
        match self {
            ActionKind::Reaction => 0,
            ActionKind::Bookmark => 1,
            ActionKind::Share => 2,
            ActionKind::Comment => 3,
            ActionKind::Vote => 4,
        }
    }
}

/// How a local transition relates to its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleKind {
    /// At most one value from a set is active (reactions, votes)
    Exclusive,
    /// A boolean flag flips (bookmarks)
    Flag,
    /// Counter only goes up (shares, comments)
    OneShot,
}

/// What to do when the confirmation request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStrategy {
    /// Apply the exact inverse of the local transition
    Revert,
    /// Drop local state and re-fetch the feed from the server
    Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    pub kind: ActionKind,
    /// Short name used in logs and user-facing notices
    pub display_name: &'static str,
    pub toggle: ToggleKind,
    pub on_failure: FailureStrategy,
    pub requires_auth: bool,
    pub item_kinds: &'static [ItemKind],
}

impl ActionPolicy {
    pub fn applies_to(&self, item: ItemKind) -> bool {
        self.item_kinds.contains(&item)
    }
}

const PULSE_ONLY: &[ItemKind] = &[ItemKind::Pulse];
const REVIEW_ONLY: &[ItemKind] = &[ItemKind::Review];
const ANY_ITEM: &[ItemKind] = &[ItemKind::Pulse, ItemKind::Review];

/// Policy per action kind. Injected into the engine; `Default` is the
/// production table.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    /// Indexed by `ActionKind::index`
    entries: [ActionPolicy; 5],
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            entries: [
                ActionPolicy {
                    kind: ActionKind::Reaction,
                    display_name: "reaction",
                    toggle: ToggleKind::Exclusive,
                    on_failure: FailureStrategy::Revert,
                    requires_auth: true,
                    item_kinds: PULSE_ONLY,
                },
                ActionPolicy {
                    kind: ActionKind::Bookmark,
                    display_name: "bookmark",
                    toggle: ToggleKind::Flag,
                    on_failure: FailureStrategy::Revert,
                    requires_auth: true,
                    item_kinds: PULSE_ONLY,
                },
                // Server-side share semantics may differ from the local +1
                ActionPolicy {
                    kind: ActionKind::Share,
                    display_name: "share",
                    toggle: ToggleKind::OneShot,
                    on_failure: FailureStrategy::Resync,
                    requires_auth: true,
                    item_kinds: PULSE_ONLY,
                },
                ActionPolicy {
                    kind: ActionKind::Comment,
                    display_name: "comment",
                    toggle: ToggleKind::OneShot,
                    on_failure: FailureStrategy::Revert,
                    requires_auth: true,
                    item_kinds: ANY_ITEM,
                },
                ActionPolicy {
                    kind: ActionKind::Vote,
                    display_name: "vote",
                    toggle: ToggleKind::Exclusive,
                    on_failure: FailureStrategy::Revert,
                    requires_auth: true,
                    item_kinds: REVIEW_ONLY,
                },
            ],
        }
    }
}

impl PolicyTable {
    pub fn get(&self, kind: ActionKind) -> &ActionPolicy {
        &self.entries[kind.index()]
    }

    pub fn policy_for(&self, action: &EngagementAction) -> &ActionPolicy {
        self.get(action.kind())
    }

    /// Override the failure strategy for one action kind.
    pub fn with_strategy(mut self, kind: ActionKind, strategy: FailureStrategy) -> Self {
        self.entries[kind.index()].on_failure = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_every_kind() {
        let table = PolicyTable::default();
        for kind in ActionKind::ALL {
            assert_eq!(table.get(kind).kind, kind);
        }
    }

    #[test]
    fn test_default_strategies() {
        let table = PolicyTable::default();
        assert_eq!(
            table.get(ActionKind::Reaction).on_failure,
            FailureStrategy::Revert
        );
        assert_eq!(
            table.get(ActionKind::Bookmark).on_failure,
            FailureStrategy::Revert
        );
        assert_eq!(table.get(ActionKind::Vote).on_failure, FailureStrategy::Revert);
        assert_eq!(table.get(ActionKind::Share).on_failure, FailureStrategy::Resync);
    }

    #[test]
    fn test_with_strategy_overrides_one_entry() {
        let table = PolicyTable::default().with_strategy(ActionKind::Share, FailureStrategy::Revert);
        assert_eq!(table.get(ActionKind::Share).on_failure, FailureStrategy::Revert);
        assert_eq!(table.get(ActionKind::Share).display_name, "share");
    }

    #[test]
    fn test_votes_only_apply_to_reviews() {
        let table = PolicyTable::default();
        let vote = table.policy_for(&EngagementAction::Vote(VoteKind::Helpful));
        assert!(vote.applies_to(ItemKind::Review));
        assert!(!vote.applies_to(ItemKind::Pulse));

        let react = table.policy_for(&EngagementAction::React(ReactionKind::Love));
        assert!(react.applies_to(ItemKind::Pulse));
        assert!(!react.applies_to(ItemKind::Review));
    }
}
