//! Optimistic transitions on an `EngagementRecord`
//!
//! [`mutate`] computes the local state after a user action without touching
//! the network. It also records an [`EngagementDelta`] that [`invert`] uses to
//! undo exactly that transition when the server rejects the action.
//!
//! The delta stores the counter changes that actually happened (after
//! saturation at zero) plus the before/after value of every flag it touched,
//! so `invert(mutate(r, a).after, &delta) == r` holds for any record.

use serde::{Deserialize, Serialize};
use siddu_api::engagement::saturating_apply;
use siddu_api::{EngagementRecord, ReactionKind, VoteKind};
use std::collections::BTreeMap;

use crate::action::EngagementAction;

/// Old and new value of a flag touched by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagChange<T> {
    pub before: T,
    pub after: T,
}

/// Exact difference between two engagement records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementDelta {
    pub reactions: BTreeMap<ReactionKind, i64>,
    pub total: i64,
    pub comments: i64,
    pub shares: i64,
    pub helpful: i64,
    pub unhelpful: i64,
    pub user_reaction: Option<FlagChange<Option<ReactionKind>>>,
    pub user_vote: Option<FlagChange<Option<VoteKind>>>,
    pub has_commented: Option<FlagChange<bool>>,
    pub has_shared: Option<FlagChange<bool>>,
    pub has_bookmarked: Option<FlagChange<bool>>,
}

fn diff(before: u64, after: u64) -> i64 {
    after.wrapping_sub(before) as i64
}

fn flag_change<T: PartialEq + Copy>(before: T, after: T) -> Option<FlagChange<T>> {
    (before != after).then_some(FlagChange { before, after })
}

impl EngagementDelta {
    pub fn between(before: &EngagementRecord, after: &EngagementRecord) -> Self {
        let reactions = before
            .reactions
            .keys()
            .chain(after.reactions.keys())
            .filter_map(|kind| {
                let d = diff(before.reaction_count(*kind), after.reaction_count(*kind));
                (d != 0).then_some((*kind, d))
            })
            .collect();

        Self {
            reactions,
            total: diff(before.total, after.total),
            comments: diff(before.comments, after.comments),
            shares: diff(before.shares, after.shares),
            helpful: diff(before.helpful_count, after.helpful_count),
            unhelpful: diff(before.unhelpful_count, after.unhelpful_count),
            user_reaction: flag_change(before.user_reaction, after.user_reaction),
            user_vote: flag_change(before.user_vote, after.user_vote),
            has_commented: flag_change(before.has_commented, after.has_commented),
            has_shared: flag_change(before.has_shared, after.has_shared),
            has_bookmarked: flag_change(before.has_bookmarked, after.has_bookmarked),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of applying an action to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub before: EngagementRecord,
    pub after: EngagementRecord,
    pub delta: EngagementDelta,
}

/// Compute the optimistic state for `action`.
pub fn mutate(record: &EngagementRecord, action: &EngagementAction) -> Transition {
    let mut after = record.clone();

    match action {
        EngagementAction::React(kind) => toggle_reaction(&mut after, *kind),
        EngagementAction::ToggleBookmark => after.has_bookmarked = !after.has_bookmarked,
        EngagementAction::Share => {
            after.shares = after.shares.saturating_add(1);
            after.has_shared = true;
        }
        EngagementAction::Comment { .. } => {
            after.comments = after.comments.saturating_add(1);
            after.has_commented = true;
        }
        EngagementAction::Vote(kind) => toggle_vote(&mut after, *kind),
    }

    let delta = EngagementDelta::between(record, &after);
    Transition {
        before: record.clone(),
        after,
        delta,
    }
}

/// Undo `delta` on `record`.
///
/// Counters are shifted back by the recorded amount and flags restored to
/// their `before` value. Applied to a record that changed in between (e.g. a
/// server merge), counters still saturate at zero.
pub fn invert(record: &EngagementRecord, delta: &EngagementDelta) -> EngagementRecord {
    let mut r = record.clone();

    for (kind, d) in &delta.reactions {
        let slot = r.reactions.entry(*kind).or_insert(0);
        *slot = saturating_apply(*slot, -d);
    }
    r.total = saturating_apply(r.total, -delta.total);
    r.comments = saturating_apply(r.comments, -delta.comments);
    r.shares = saturating_apply(r.shares, -delta.shares);
    r.helpful_count = saturating_apply(r.helpful_count, -delta.helpful);
    r.unhelpful_count = saturating_apply(r.unhelpful_count, -delta.unhelpful);

    if let Some(change) = delta.user_reaction {
        r.user_reaction = change.before;
    }
    if let Some(change) = delta.user_vote {
        r.user_vote = change.before;
    }
    if let Some(change) = delta.has_commented {
        r.has_commented = change.before;
    }
    if let Some(change) = delta.has_shared {
        r.has_shared = change.before;
    }
    if let Some(change) = delta.has_bookmarked {
        r.has_bookmarked = change.before;
    }
    r
}

/// Shift one reaction counter, returning the change that actually happened.
fn bump(reactions: &mut BTreeMap<ReactionKind, u64>, kind: ReactionKind, delta: i64) -> i64 {
    let slot = reactions.entry(kind).or_insert(0);
    let old = *slot;
    *slot = saturating_apply(old, delta);
    diff(old, *slot)
}

fn toggle_reaction(record: &mut EngagementRecord, kind: ReactionKind) {
    match record.user_reaction {
        Some(current) if current == kind => {
            record.adjust_reaction(kind, -1);
            record.user_reaction = None;
        }
        Some(previous) => {
            // Swap: total stays put when both counters moved by one
            let removed = bump(&mut record.reactions, previous, -1);
            let added = bump(&mut record.reactions, kind, 1);
            record.total = saturating_apply(record.total, removed + added);
            record.user_reaction = Some(kind);
        }
        None => {
            record.adjust_reaction(kind, 1);
            record.user_reaction = Some(kind);
        }
    }
}

fn toggle_vote(record: &mut EngagementRecord, kind: VoteKind) {
    match record.user_vote {
        Some(current) if current == kind => {
            record.adjust_vote(kind, -1);
            record.user_vote = None;
        }
        previous => {
            if let Some(previous) = previous {
                record.adjust_vote(previous, -1);
            }
            record.adjust_vote(kind, 1);
            record.user_vote = Some(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn love(count: u64) -> EngagementRecord {
        EngagementRecord::with_reactions([(ReactionKind::Love, count)])
    }

    #[test]
    fn test_love_toggle_then_revert() {
        let start = love(5);
        let t = mutate(&start, &EngagementAction::React(ReactionKind::Love));
        assert_eq!(t.after.user_reaction, Some(ReactionKind::Love));
        assert_eq!(t.after.reaction_count(ReactionKind::Love), 6);
        assert_eq!(t.after.total, 6);

        let reverted = invert(&t.after, &t.delta);
        assert_eq!(reverted, start);
        assert_eq!(reverted.user_reaction, None);
        assert_eq!(reverted.reaction_count(ReactionKind::Love), 5);
        assert_eq!(reverted.total, 5);
    }

    #[test]
    fn test_switch_vote_moves_one_count() {
        let mut start = EngagementRecord::default();
        start.user_vote = Some(VoteKind::Helpful);
        start.helpful_count = 3;
        start.unhelpful_count = 1;

        let t = mutate(&start, &EngagementAction::Vote(VoteKind::Unhelpful));
        assert_eq!(t.after.user_vote, Some(VoteKind::Unhelpful));
        assert_eq!(t.after.helpful_count, 2);
        assert_eq!(t.after.unhelpful_count, 2);
    }

    #[test]
    fn test_repeat_vote_clears_it() {
        let mut start = EngagementRecord::default();
        start.user_vote = Some(VoteKind::Helpful);
        start.helpful_count = 3;

        let t = mutate(&start, &EngagementAction::Vote(VoteKind::Helpful));
        assert_eq!(t.after.user_vote, None);
        assert_eq!(t.after.helpful_count, 2);
    }

    #[test]
    fn test_swap_reaction_keeps_total() {
        let mut start =
            EngagementRecord::with_reactions([(ReactionKind::Love, 2), (ReactionKind::Fire, 4)]);
        start.user_reaction = Some(ReactionKind::Love);

        let t = mutate(&start, &EngagementAction::React(ReactionKind::Fire));
        assert_eq!(t.after.reaction_count(ReactionKind::Love), 1);
        assert_eq!(t.after.reaction_count(ReactionKind::Fire), 5);
        assert_eq!(t.after.total, 6);
        assert_eq!(t.after.user_reaction, Some(ReactionKind::Fire));
    }

    #[test]
    fn test_bookmark_touches_no_counter() {
        let start = love(1);
        let t = mutate(&start, &EngagementAction::ToggleBookmark);
        assert!(t.after.has_bookmarked);
        assert_eq!(t.delta.total, 0);
        assert!(t.delta.reactions.is_empty());
        assert_eq!(
            t.delta.has_bookmarked,
            Some(FlagChange {
                before: false,
                after: true
            })
        );
        assert!(!invert(&t.after, &t.delta).has_bookmarked);
    }

    #[test]
    fn test_share_is_not_a_toggle() {
        let start = EngagementRecord::default();
        let once = mutate(&start, &EngagementAction::Share).after;
        let twice = mutate(&once, &EngagementAction::Share).after;
        assert_eq!(twice.shares, 2);
        assert!(twice.has_shared);
    }

    #[test]
    fn test_comment_counts_and_flags() {
        let t = mutate(
            &EngagementRecord::default(),
            &EngagementAction::Comment {
                content: "Masterpiece".into(),
            },
        );
        assert_eq!(t.after.comments, 1);
        assert!(t.after.has_commented);
        assert_eq!(invert(&t.after, &t.delta), EngagementRecord::default());
    }

    #[test]
    fn test_inverse_is_exact_on_inconsistent_input() {
        // Server claims the user reacted but the counter is already zero
        let mut start = EngagementRecord::default();
        start.user_reaction = Some(ReactionKind::Sad);

        let t = mutate(&start, &EngagementAction::React(ReactionKind::Laugh));
        assert_eq!(t.after.reaction_count(ReactionKind::Sad), 0);
        assert_eq!(invert(&t.after, &t.delta), start);
    }

    fn reaction_kind() -> impl Strategy<Value = ReactionKind> {
        prop::sample::select(ReactionKind::ALL.to_vec())
    }

    fn vote_kind() -> impl Strategy<Value = VoteKind> {
        prop_oneof![Just(VoteKind::Helpful), Just(VoteKind::Unhelpful)]
    }

    /// Records that satisfy the data-model invariants: `total` is the sum and
    /// the user's own reaction and vote are reflected in their counters.
    fn consistent_record() -> impl Strategy<Value = EngagementRecord> {
        (
            prop::collection::vec(0u64..50, ReactionKind::ALL.len()),
            prop::option::of(reaction_kind()),
            (0u64..50, 0u64..50),
            prop::option::of(vote_kind()),
            (0u64..20, 0u64..20),
            any::<(bool, bool, bool)>(),
        )
            .prop_map(
                |(counts, user_reaction, (helpful, unhelpful), user_vote, (comments, shares), flags)| {
                    let mut record = EngagementRecord::with_reactions(
                        ReactionKind::ALL.into_iter().zip(counts),
                    );
                    if let Some(kind) = user_reaction {
                        if record.reaction_count(kind) == 0 {
                            record.adjust_reaction(kind, 1);
                        }
                    }
                    record.user_reaction = user_reaction;
                    record.helpful_count = helpful;
                    record.unhelpful_count = unhelpful;
                    if let Some(kind) = user_vote {
                        if record.vote_count(kind) == 0 {
                            record.adjust_vote(kind, 1);
                        }
                    }
                    record.user_vote = user_vote;
                    record.comments = comments;
                    record.shares = shares;
                    (record.has_commented, record.has_shared, record.has_bookmarked) = flags;
                    record
                },
            )
    }

    fn action() -> impl Strategy<Value = EngagementAction> {
        prop_oneof![
            reaction_kind().prop_map(EngagementAction::React),
            Just(EngagementAction::ToggleBookmark),
            Just(EngagementAction::Share),
            "[a-z ]{1,16}".prop_map(|content| EngagementAction::Comment { content }),
            vote_kind().prop_map(EngagementAction::Vote),
        ]
    }

    proptest! {
        #[test]
        fn prop_invert_undoes_mutate(record in consistent_record(), action in action()) {
            let t = mutate(&record, &action);
            prop_assert_eq!(invert(&t.after, &t.delta), record);
        }

        #[test]
        fn prop_mutate_keeps_total_consistent(record in consistent_record(), action in action()) {
            let t = mutate(&record, &action);
            prop_assert!(t.after.is_consistent());
        }

        #[test]
        fn prop_double_reaction_toggle_is_identity(record in consistent_record(), kind in reaction_kind()) {
            let once = mutate(&record, &EngagementAction::React(kind)).after;
            let twice = mutate(&once, &EngagementAction::React(kind)).after;
            prop_assert_eq!(twice, record);
        }

        #[test]
        fn prop_reaction_sequence_tracks_last_toggle(
            record in consistent_record(),
            toggles in prop::collection::vec(reaction_kind(), 0..30),
        ) {
            let mut expected = record.user_reaction;
            let mut current = record.clone();
            for kind in &toggles {
                current = mutate(&current, &EngagementAction::React(*kind)).after;
                expected = if expected == Some(*kind) { None } else { Some(*kind) };
            }

            prop_assert_eq!(current.user_reaction, expected);
            prop_assert!(current.is_consistent());
            for kind in ReactionKind::ALL {
                let baseline = record.reaction_count(kind)
                    - u64::from(record.user_reaction == Some(kind));
                let own = u64::from(expected == Some(kind));
                prop_assert_eq!(current.reaction_count(kind), baseline + own);
            }
        }

        #[test]
        fn prop_at_most_one_vote_counted(
            record in consistent_record(),
            votes in prop::collection::vec(vote_kind(), 0..20),
        ) {
            let base_helpful = record.helpful_count - u64::from(record.user_vote == Some(VoteKind::Helpful));
            let base_unhelpful = record.unhelpful_count - u64::from(record.user_vote == Some(VoteKind::Unhelpful));

            let mut current = record.clone();
            for kind in &votes {
                current = mutate(&current, &EngagementAction::Vote(*kind)).after;
            }

            prop_assert_eq!(
                current.helpful_count,
                base_helpful + u64::from(current.user_vote == Some(VoteKind::Helpful))
            );
            prop_assert_eq!(
                current.unhelpful_count,
                base_unhelpful + u64::from(current.user_vote == Some(VoteKind::Unhelpful))
            );
        }
    }
}
