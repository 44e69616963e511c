//! In-memory owner of a feed's items and their engagement state
//!
//! `EngagementStore` is the only place feed items are mutated. Optimistic
//! actions, their reversal, server merges and page loads all go through it,
//! and each mutation is published as a `Change<FeedItem>` so a renderer can
//! redraw without polling.

use siddu_api::{
    Change, ChangeOrigin, Comment, EngagementRecord, FeedItem, ReactionKind, VoteKind,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::action::EngagementAction;
use crate::confirmation::Confirmation;
use crate::mutator::{invert, mutate, Transition};

const CHANGE_BUFFER: usize = 1000;

/// Prefix of comment ids created locally before the server assigns one.
pub const LOCAL_COMMENT_PREFIX: &str = "local-";

/// An optimistic action that has been applied to the store.
///
/// Hold on to it until the server answers; [`EngagementStore::revert`] needs
/// it to undo the action.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub transition: Transition,
    /// Provisional comment inserted by a `Comment` action
    pub comment: Option<Comment>,
    /// Store epoch at apply time; see [`EngagementStore::epoch`]
    pub epoch: u64,
}

impl Applied {
    pub fn record(&self) -> &EngagementRecord {
        &self.transition.after
    }
}

pub struct EngagementStore {
    items: Vec<FeedItem>,
    comments: HashMap<String, Vec<Comment>>,
    change_tx: broadcast::Sender<Change<FeedItem>>,
    next_local_comment: u64,
    epoch: u64,
}

impl Default for EngagementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngagementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementStore")
            .field("items", &self.items.len())
            .field("comment_threads", &self.comments.len())
            .finish()
    }
}

impl EngagementStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            items: Vec::new(),
            comments: HashMap::new(),
            change_tx,
            next_local_comment: 1,
            epoch: 0,
        }
    }

    pub fn with_items(items: Vec<FeedItem>) -> Self {
        let mut store = Self::new();
        store.items = dedup_by_id(items, &HashSet::new());
        store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change<FeedItem>> {
        self.change_tx.subscribe()
    }

    fn emit(&self, change: Change<FeedItem>) {
        // No receivers is fine
        let _ = self.change_tx.send(change);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn emit_updated(&self, index: usize, origin: ChangeOrigin) {
        let item = &self.items[index];
        self.emit(Change::Updated {
            id: item.id.clone(),
            data: item.clone(),
            origin,
        });
    }

    pub fn get(&self, id: &str) -> Option<&FeedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Incremented every time the list is replaced with server data.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Loaded comments for an item, newest first. Empty if none were loaded.
    pub fn comments(&self, id: &str) -> &[Comment] {
        self.comments.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn apply_reaction(&mut self, id: &str, kind: ReactionKind) -> Option<EngagementRecord> {
        self.apply(id, &EngagementAction::React(kind))
            .map(|applied| applied.transition.after)
    }

    pub fn apply_bookmark(&mut self, id: &str) -> Option<EngagementRecord> {
        self.apply(id, &EngagementAction::ToggleBookmark)
            .map(|applied| applied.transition.after)
    }

    pub fn apply_share(&mut self, id: &str) -> Option<EngagementRecord> {
        self.apply(id, &EngagementAction::Share)
            .map(|applied| applied.transition.after)
    }

    pub fn apply_vote(&mut self, id: &str, kind: VoteKind) -> Option<EngagementRecord> {
        self.apply(id, &EngagementAction::Vote(kind))
            .map(|applied| applied.transition.after)
    }

    /// Count a comment and put it at the top of the item's comment list.
    pub fn apply_comment(&mut self, id: &str, comment: Comment) -> Option<EngagementRecord> {
        let action = EngagementAction::Comment {
            content: comment.content.clone(),
        };
        self.apply_inner(id, &action, Some(comment))
            .map(|applied| applied.transition.after)
    }

    /// Apply `action` optimistically.
    ///
    /// For `Comment` a provisional comment with a `local-` id is inserted.
    /// Returns `None` for an unknown id.
    pub fn apply(&mut self, id: &str, action: &EngagementAction) -> Option<Applied> {
        let provisional = match action {
            EngagementAction::Comment { content } => {
                let local_id = format!("{}{}", LOCAL_COMMENT_PREFIX, self.next_local_comment);
                Some(Comment {
                    id: local_id,
                    item_id: id.to_string(),
                    content: content.clone(),
                    author: serde_json::Value::Null,
                    created_at: Some(chrono::Utc::now().to_rfc3339()),
                })
            }
            _ => None,
        };
        self.apply_inner(id, action, provisional)
    }

    fn apply_inner(
        &mut self,
        id: &str,
        action: &EngagementAction,
        comment: Option<Comment>,
    ) -> Option<Applied> {
        let Some(index) = self.position(id) else {
            warn!("[EngagementStore] Ignoring {:?} on unknown item {}", action, id);
            return None;
        };

        let transition = mutate(&self.items[index].engagement, action);
        self.items[index].engagement = transition.after.clone();

        if let Some(comment) = &comment {
            if comment.id.starts_with(LOCAL_COMMENT_PREFIX) {
                self.next_local_comment += 1;
            }
            self.comments
                .entry(id.to_string())
                .or_default()
                .insert(0, comment.clone());
        }

        debug!("[EngagementStore] Applied {:?} to {}", action, id);
        self.emit_updated(index, ChangeOrigin::Local { operation_id: None });
        Some(Applied {
            transition,
            comment,
            epoch: self.epoch,
        })
    }

    /// Undo an applied action on whatever the record currently holds.
    ///
    /// If the list was replaced since the apply, the record is the server's
    /// copy, which never contained the action, and is left untouched.
    pub fn revert(&mut self, id: &str, applied: &Applied) -> Option<EngagementRecord> {
        let Some(index) = self.position(id) else {
            warn!("[EngagementStore] Cannot revert on unknown item {}", id);
            return None;
        };

        if applied.epoch != self.epoch {
            if let Some(comment) = &applied.comment {
                if let Some(list) = self.comments.get_mut(id) {
                    list.retain(|c| c.id != comment.id);
                }
            }
            debug!(
                "[EngagementStore] Skipping revert on {}: reloaded since the action was applied",
                id
            );
            return Some(self.items[index].engagement.clone());
        }

        let engagement = invert(&self.items[index].engagement, &applied.transition.delta);
        self.items[index].engagement = engagement.clone();

        if let Some(comment) = &applied.comment {
            if let Some(list) = self.comments.get_mut(id) {
                list.retain(|c| c.id != comment.id);
            }
        }

        debug!("[EngagementStore] Reverted action on {}", id);
        self.emit_updated(index, ChangeOrigin::Local { operation_id: None });
        Some(engagement)
    }

    /// Replace estimated counters with the server's.
    ///
    /// Comments carried by the confirmation are attached separately with
    /// [`EngagementStore::replace_comment`].
    pub fn merge_confirmation(
        &mut self,
        id: &str,
        confirmation: &Confirmation,
    ) -> Option<EngagementRecord> {
        let Some(index) = self.position(id) else {
            warn!("[EngagementStore] Dropping confirmation for unknown item {}", id);
            return None;
        };
        if confirmation.is_empty() {
            return Some(self.items[index].engagement.clone());
        }

        confirmation.merge_into(&mut self.items[index].engagement);
        self.emit_updated(index, ChangeOrigin::Remote);
        Some(self.items[index].engagement.clone())
    }

    /// Swap a provisional comment for the server's copy.
    ///
    /// If the provisional comment is gone (e.g. comments were reloaded), the
    /// server comment is prepended unless already present.
    pub fn replace_comment(&mut self, id: &str, local_id: &str, comment: Comment) -> bool {
        if !self.contains(id) {
            warn!("[EngagementStore] Cannot attach comment to unknown item {}", id);
            return false;
        }
        let list = self.comments.entry(id.to_string()).or_default();
        if let Some(slot) = list.iter_mut().find(|c| c.id == local_id) {
            *slot = comment;
        } else if !list.iter().any(|c| c.id == comment.id) {
            list.insert(0, comment);
        }
        true
    }

    /// Replace the whole list (first page, filter change, resync).
    ///
    /// Loaded comments are dropped. Duplicate ids keep their first occurrence.
    pub fn replace_items(&mut self, items: Vec<FeedItem>) {
        self.items = dedup_by_id(items, &HashSet::new());
        self.comments.clear();
        self.epoch += 1;
        debug!("[EngagementStore] Replaced feed with {} items", self.items.len());
        self.emit(Change::Reset {
            count: self.items.len(),
            origin: ChangeOrigin::Remote,
        });
    }

    /// Add a page at the end, in server order. Returns how many were added.
    ///
    /// Items whose id is already in the feed are skipped, which happens when
    /// new posts shift an offset-paged feed.
    pub fn append_items(&mut self, items: Vec<FeedItem>) -> usize {
        let existing: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
        let offered = items.len();
        let fresh = dedup_by_id(items, &existing);
        let added = fresh.len();

        if added < offered {
            debug!(
                "[EngagementStore] Skipped {} duplicate items while appending",
                offered - added
            );
        }
        for item in fresh {
            self.items.push(item.clone());
            self.emit(Change::Created {
                data: item,
                origin: ChangeOrigin::Remote,
            });
        }
        added
    }

    /// Put a new item at the top. Returns `false` if the id is already present.
    pub fn prepend_item(&mut self, item: FeedItem) -> bool {
        if self.contains(&item.id) {
            warn!("[EngagementStore] Item {} already in feed, not prepending", item.id);
            return false;
        }
        self.items.insert(0, item.clone());
        self.emit(Change::Created {
            data: item,
            origin: ChangeOrigin::Remote,
        });
        true
    }

    pub fn remove_item(&mut self, id: &str) -> Option<FeedItem> {
        let Some(index) = self.position(id) else {
            warn!("[EngagementStore] Cannot remove unknown item {}", id);
            return None;
        };
        let item = self.items.remove(index);
        self.comments.remove(id);
        self.emit(Change::Deleted {
            id: id.to_string(),
            origin: ChangeOrigin::Remote,
        });
        Some(item)
    }

    /// Replace the loaded comments of an item. Counters are not touched.
    pub fn set_comments(&mut self, id: &str, comments: Vec<Comment>) -> bool {
        if !self.contains(id) {
            warn!("[EngagementStore] Cannot set comments on unknown item {}", id);
            return false;
        }
        self.comments.insert(id.to_string(), comments);
        true
    }

    /// Overwrite the user's vote on a review with what the server reports.
    pub fn set_user_vote(&mut self, id: &str, vote: Option<VoteKind>) -> Option<EngagementRecord> {
        let Some(index) = self.position(id) else {
            warn!("[EngagementStore] Cannot set vote on unknown item {}", id);
            return None;
        };
        if self.items[index].engagement.user_vote != vote {
            self.items[index].engagement.user_vote = vote;
            self.emit_updated(index, ChangeOrigin::Remote);
        }
        Some(self.items[index].engagement.clone())
    }
}

fn dedup_by_id(items: Vec<FeedItem>, existing: &HashSet<String>) -> Vec<FeedItem> {
    let mut seen = existing.clone();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
