//! State machine test of `EngagementStore` against a plain reference model.
//!
//! The reference keeps its own per-item counters and applies the engagement
//! rules directly, without going through `mutate`/`invert`. After every step
//! the store must hold exactly the same items, in the same order, with the
//! same engagement and the same number of loaded comments.

use proptest::prelude::*;
use proptest_state_machine::{ReferenceStateMachine, StateMachineTest};
use siddu_api::{EngagementRecord, FeedItem, ReactionKind, VoteKind};

use crate::action::EngagementAction;
use crate::store::EngagementStore;

#[derive(Debug, Clone)]
pub struct RefItem {
    id: String,
    engagement: EngagementRecord,
    comment_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceState {
    items: Vec<RefItem>,
    next_id: u32,
}

impl ReferenceState {
    fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut RefItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum StoreTransition {
    React(String, ReactionKind),
    Bookmark(String),
    Share(String),
    Comment(String, String),
    Vote(String, VoteKind),
    /// Apply and immediately revert; the store must end up unchanged
    ApplyThenRevert(String, EngagementAction),
    /// Append `fresh` new items plus a copy of an existing id (if any)
    AppendPage { fresh: u32, duplicate: Option<String> },
    Remove(String),
    /// Action on an id that is not in the feed
    Unknown(ReactionKind),
}

fn ref_toggle_reaction(record: &mut EngagementRecord, kind: ReactionKind) {
    let previous = record.user_reaction;
    if let Some(previous) = previous {
        let count = record.reactions.entry(previous).or_insert(0);
        *count = count.saturating_sub(1);
    }
    if previous == Some(kind) {
        record.user_reaction = None;
    } else {
        *record.reactions.entry(kind).or_insert(0) += 1;
        record.user_reaction = Some(kind);
    }
    record.total = record.reactions.values().sum();
}

fn ref_toggle_vote(record: &mut EngagementRecord, kind: VoteKind) {
    let previous = record.user_vote;
    match previous {
        Some(VoteKind::Helpful) => record.helpful_count = record.helpful_count.saturating_sub(1),
        Some(VoteKind::Unhelpful) => {
            record.unhelpful_count = record.unhelpful_count.saturating_sub(1)
        }
        None => {}
    }
    if previous == Some(kind) {
        record.user_vote = None;
    } else {
        match kind {
            VoteKind::Helpful => record.helpful_count += 1,
            VoteKind::Unhelpful => record.unhelpful_count += 1,
        }
        record.user_vote = Some(kind);
    }
}

fn new_item(id: String, love: u64) -> FeedItem {
    FeedItem::pulse(id, EngagementRecord::with_reactions([(ReactionKind::Love, love)]))
}

fn reaction_kind() -> impl Strategy<Value = ReactionKind> {
    prop::sample::select(ReactionKind::ALL.to_vec())
}

fn vote_kind() -> impl Strategy<Value = VoteKind> {
    prop_oneof![Just(VoteKind::Helpful), Just(VoteKind::Unhelpful)]
}

fn engagement_action() -> impl Strategy<Value = EngagementAction> {
    prop_oneof![
        reaction_kind().prop_map(EngagementAction::React),
        Just(EngagementAction::ToggleBookmark),
        Just(EngagementAction::Share),
        Just(EngagementAction::Comment {
            content: "reverted".into()
        }),
        vote_kind().prop_map(EngagementAction::Vote),
    ]
}

impl ReferenceStateMachine for ReferenceState {
    type State = Self;
    type Transition = StoreTransition;

    fn init_state() -> BoxedStrategy<Self::State> {
        prop::collection::vec(0u64..5, 0..4)
            .prop_map(|loves| {
                let items = loves
                    .into_iter()
                    .enumerate()
                    .map(|(i, love)| RefItem {
                        id: format!("p{}", i),
                        engagement: EngagementRecord::with_reactions([(ReactionKind::Love, love)]),
                        comment_count: 0,
                    })
                    .collect::<Vec<_>>();
                let next_id = items.len() as u32;
                ReferenceState { items, next_id }
            })
            .boxed()
    }

    fn transitions(state: &Self::State) -> BoxedStrategy<Self::Transition> {
        let ids = state.ids();
        let append = (0u32..3, prop::option::of(Just(())))
            .prop_map({
                let first = ids.first().cloned();
                move |(fresh, dup)| StoreTransition::AppendPage {
                    fresh,
                    duplicate: dup.and(first.clone()),
                }
            })
            .boxed();
        let unknown = reaction_kind().prop_map(StoreTransition::Unknown).boxed();

        if ids.is_empty() {
            return prop_oneof![append, unknown].boxed();
        }

        let id = prop::sample::select(ids);
        prop_oneof![
            4 => (id.clone(), reaction_kind()).prop_map(|(id, k)| StoreTransition::React(id, k)),
            2 => id.clone().prop_map(StoreTransition::Bookmark),
            1 => id.clone().prop_map(StoreTransition::Share),
            1 => (id.clone(), "[a-z]{1,8}").prop_map(|(id, c)| StoreTransition::Comment(id, c)),
            2 => (id.clone(), vote_kind()).prop_map(|(id, k)| StoreTransition::Vote(id, k)),
            2 => (id.clone(), engagement_action())
                .prop_map(|(id, a)| StoreTransition::ApplyThenRevert(id, a)),
            1 => append,
            1 => id.prop_map(StoreTransition::Remove),
            1 => unknown,
        ]
        .boxed()
    }

    fn preconditions(state: &Self::State, transition: &Self::Transition) -> bool {
        let known = |id: &String| state.items.iter().any(|i| &i.id == id);
        match transition {
            StoreTransition::React(id, _)
            | StoreTransition::Bookmark(id)
            | StoreTransition::Share(id)
            | StoreTransition::Comment(id, _)
            | StoreTransition::Vote(id, _)
            | StoreTransition::ApplyThenRevert(id, _)
            | StoreTransition::Remove(id) => known(id),
            StoreTransition::AppendPage { duplicate, .. } => duplicate.as_ref().map_or(true, known),
            StoreTransition::Unknown(_) => true,
        }
    }

    fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
        match transition {
            StoreTransition::React(id, kind) => {
                if let Some(item) = state.find_mut(id) {
                    ref_toggle_reaction(&mut item.engagement, *kind);
                }
            }
            StoreTransition::Bookmark(id) => {
                if let Some(item) = state.find_mut(id) {
                    item.engagement.has_bookmarked = !item.engagement.has_bookmarked;
                }
            }
            StoreTransition::Share(id) => {
                if let Some(item) = state.find_mut(id) {
                    item.engagement.shares += 1;
                    item.engagement.has_shared = true;
                }
            }
            StoreTransition::Comment(id, _) => {
                if let Some(item) = state.find_mut(id) {
                    item.engagement.comments += 1;
                    item.engagement.has_commented = true;
                    item.comment_count += 1;
                }
            }
            StoreTransition::Vote(id, kind) => {
                if let Some(item) = state.find_mut(id) {
                    ref_toggle_vote(&mut item.engagement, *kind);
                }
            }
            StoreTransition::ApplyThenRevert(..) | StoreTransition::Unknown(_) => {}
            StoreTransition::AppendPage { fresh, .. } => {
                for _ in 0..*fresh {
                    let id = format!("p{}", state.next_id);
                    state.next_id += 1;
                    state.items.push(RefItem {
                        id,
                        engagement: EngagementRecord::with_reactions([(ReactionKind::Love, 1)]),
                        comment_count: 0,
                    });
                }
            }
            StoreTransition::Remove(id) => state.items.retain(|i| &i.id != id),
        }
        state
    }
}

pub struct StoreTest {
    store: EngagementStore,
    next_id: u32,
}

impl StateMachineTest for StoreTest {
    type SystemUnderTest = Self;
    type Reference = ReferenceState;

    fn init_test(
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) -> Self::SystemUnderTest {
        let items = ref_state
            .items
            .iter()
            .map(|i| FeedItem::pulse(i.id.clone(), i.engagement.clone()))
            .collect();
        StoreTest {
            store: EngagementStore::with_items(items),
            next_id: ref_state.next_id,
        }
    }

    fn apply(
        mut state: Self::SystemUnderTest,
        _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        transition: StoreTransition,
    ) -> Self::SystemUnderTest {
        match transition {
            StoreTransition::React(id, kind) => {
                assert!(state.store.apply_reaction(&id, kind).is_some());
            }
            StoreTransition::Bookmark(id) => {
                assert!(state.store.apply_bookmark(&id).is_some());
            }
            StoreTransition::Share(id) => {
                assert!(state.store.apply_share(&id).is_some());
            }
            StoreTransition::Comment(id, content) => {
                let applied = state.store.apply(&id, &EngagementAction::Comment { content });
                assert!(applied.is_some_and(|a| a.comment.is_some()));
            }
            StoreTransition::Vote(id, kind) => {
                assert!(state.store.apply_vote(&id, kind).is_some());
            }
            StoreTransition::ApplyThenRevert(id, action) => {
                let before = state.store.get(&id).cloned();
                let comments_before = state.store.comments(&id).to_vec();
                let applied = state.store.apply(&id, &action).expect("known id");
                state.store.revert(&id, &applied);
                assert_eq!(state.store.get(&id).cloned(), before);
                assert_eq!(state.store.comments(&id), comments_before.as_slice());
            }
            StoreTransition::AppendPage { fresh, duplicate } => {
                let mut page = Vec::new();
                for _ in 0..fresh {
                    page.push(new_item(format!("p{}", state.next_id), 1));
                    state.next_id += 1;
                }
                if let Some(dup) = duplicate {
                    page.push(new_item(dup, 99));
                }
                assert_eq!(state.store.append_items(page), fresh as usize);
            }
            StoreTransition::Remove(id) => {
                assert!(state.store.remove_item(&id).is_some());
            }
            StoreTransition::Unknown(kind) => {
                assert!(state.store.apply_reaction("missing", kind).is_none());
            }
        }
        state
    }

    fn check_invariants(
        state: &Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) {
        let items = state.store.items();
        assert_eq!(items.len(), ref_state.items.len());
        for (actual, expected) in items.iter().zip(&ref_state.items) {
            assert_eq!(actual.id, expected.id);
            assert_eq!(actual.engagement, expected.engagement, "item {}", actual.id);
            assert!(actual.engagement.is_consistent());
            assert_eq!(state.store.comments(&actual.id).len(), expected.comment_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest_state_machine::prop_state_machine! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            failure_persistence: None,
            verbose: 0,
            .. ProptestConfig::default()
        })]

        #[test]
        fn test_engagement_store_state_machine(sequential 1..40 => StoreTest);
    }
}
