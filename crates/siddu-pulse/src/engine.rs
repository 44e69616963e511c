//! Feed engine: optimistic engagement with server reconciliation
//!
//! `FeedEngine` ties the store, the ledger and the pagination cursor to a
//! remote. A dispatched action is shown immediately, sent once, and then
//! either confirmed (server values merged in) or rolled back according to the
//! action's policy:
//!
//! ```text
//! dispatch ─▶ auth? ─▶ in flight? ─▶ known item? ─▶ apply + ledger(Pending)
//!                                                        │
//!                                              remote call (no retries)
//!                                       ┌────────────────┴───────────────┐
//!                                    success                          failure
//!                              merge, ledger(Confirmed)      Revert: invert transition
//!                                                           Resync: reload page 1
//!                                                           one ActionFailed notice
//! ```
//!
//! Locks are never held across a remote call.

use siddu_api::{
    ApiError, Change, Comment, FeedItem, FeedQuery, PulseCreate, Result, VoteKind,
};
use siddu_core::{
    ActionLedger, ActionStatus, Applied, Confirmation, EngagementAction, EngagementStore,
    FailureStrategy, FeedCursor, LedgerEntry, PaginationState, PolicyTable, Transition,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::notice::{self, Notice, NoticeReceiver, NoticeSender};
use crate::remote::EngagementRemote;
use crate::text::prepare_pulse;

/// How a dispatched action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Server accepted it; canonical values merged
    Confirmed,
    /// Server rejected it; local change inverted
    Reverted,
    /// Server rejected it; feed reloaded from page 1
    Resynced,
    /// Another action on the same item is still in flight; nothing done
    Suppressed,
    UnknownItem,
    /// The action does not apply to this kind of item (e.g. vote on a pulse)
    NotApplicable,
    /// No credentials; nothing sent
    AuthRequired,
    /// The store was dropped before the action settled
    Abandoned,
}

/// State shared between the engine and detached dispatches.
struct Shared<R> {
    remote: Arc<R>,
    ledger: Mutex<ActionLedger>,
    cursor: Mutex<FeedCursor>,
    query: Mutex<FeedQuery>,
    /// Bumped on every query change so stale page loads are dropped
    generation: AtomicU64,
    policies: PolicyTable,
    notices: NoticeSender,
}

impl<R: EngagementRemote> Shared<R> {
    fn notify(&self, notice: Notice) {
        // The receiver may be gone (e.g. headless use)
        let _ = self.notices.send(notice);
    }

    async fn settle(&self, seq: u64, status: ActionStatus) {
        if !self.ledger.lock().await.settle(seq, status) {
            warn!("[FeedEngine] Ledger entry {} was already settled", seq);
        }
    }

    /// Fetch page 1 of the current query and replace the store's items.
    ///
    /// Any page load already in flight is superseded. Returns `Ok(None)` if
    /// the query changed while the request was out.
    async fn reload_first_page(&self, store: &RwLock<EngagementStore>) -> Result<Option<usize>> {
        let query = self.query.lock().await.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let page_size = self.cursor.lock().await.page_size();

        let page = match self.remote.get_feed(&query, 1, page_size).await {
            Ok(page) => page,
            Err(e) => {
                // A superseded load-more will never clear its own flag
                self.cursor.lock().await.fail_load_more();
                return Err(e);
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("[FeedEngine] Dropping first page of a superseded query");
            return Ok(None);
        }

        let returned = page.items.len();
        store.write().await.replace_items(page.items);
        self.cursor
            .lock()
            .await
            .complete_first_page(returned, page.has_more);
        info!(
            "[FeedEngine] Loaded first page ({} items, filter={})",
            returned, query.filter
        );
        Ok(Some(returned))
    }

    async fn run_dispatch(
        &self,
        store: Weak<RwLock<EngagementStore>>,
        item_id: String,
        action: EngagementAction,
    ) -> DispatchOutcome {
        let policy = *self.policies.policy_for(&action);

        if policy.requires_auth && !self.remote.is_authenticated() {
            info!(
                "[FeedEngine] {} on {} needs a signed-in user",
                policy.display_name, item_id
            );
            self.notify(Notice::auth_required(policy.display_name, Some(&item_id)));
            return DispatchOutcome::AuthRequired;
        }

        let Some(store_ref) = store.upgrade() else {
            return DispatchOutcome::Abandoned;
        };

        // Ledger lock first, then store: the in-flight check and the ledger
        // entry must be atomic with respect to other dispatches.
        let (seq, applied) = {
            let mut ledger = self.ledger.lock().await;
            if ledger.in_flight(&item_id) {
                debug!(
                    "[FeedEngine] Suppressing {} on {}: previous action still in flight",
                    policy.display_name, item_id
                );
                return DispatchOutcome::Suppressed;
            }

            let mut store = store_ref.write().await;
            let Some(item) = store.get(&item_id) else {
                warn!(
                    "[FeedEngine] Ignoring {} on unknown item {}",
                    policy.display_name, item_id
                );
                return DispatchOutcome::UnknownItem;
            };
            if !policy.applies_to(item.kind) {
                warn!(
                    "[FeedEngine] {} does not apply to {:?} item {}",
                    policy.display_name, item.kind, item_id
                );
                return DispatchOutcome::NotApplicable;
            }
            let Some(applied) = store.apply(&item_id, &action) else {
                return DispatchOutcome::UnknownItem;
            };
            let seq = ledger.begin(item_id.clone(), action.clone(), applied.transition.clone());
            (seq, applied)
        };
        drop(store_ref);

        debug!(
            "[FeedEngine] Sending {} on {} (seq {})",
            policy.display_name, item_id, seq
        );
        let result = confirm(self.remote.as_ref(), &item_id, &action, &applied.transition).await;

        let Some(store_ref) = store.upgrade() else {
            debug!(
                "[FeedEngine] Store dropped before {} on {} settled",
                policy.display_name, item_id
            );
            let status = if result.is_ok() {
                ActionStatus::Confirmed
            } else {
                ActionStatus::Reverted
            };
            self.settle(seq, status).await;
            return DispatchOutcome::Abandoned;
        };

        match result {
            Ok(confirmation) => {
                {
                    let mut store = store_ref.write().await;
                    store.merge_confirmation(&item_id, &confirmation);
                    if let (Some(server), Some(local)) = (&confirmation.comment, &applied.comment) {
                        store.replace_comment(&item_id, &local.id, server.clone());
                    }
                }
                self.settle(seq, ActionStatus::Confirmed).await;
                debug!("[FeedEngine] {} on {} confirmed", policy.display_name, item_id);
                DispatchOutcome::Confirmed
            }
            Err(err) => {
                warn!(
                    "[FeedEngine] {} on {} failed: {}",
                    policy.display_name, item_id, err
                );
                let outcome = self
                    .recover(&store_ref, &item_id, &applied, policy.on_failure)
                    .await;
                let status = match outcome {
                    DispatchOutcome::Resynced => ActionStatus::Resynced,
                    _ => ActionStatus::Reverted,
                };
                self.settle(seq, status).await;
                self.notify(Notice::action_failed(
                    policy.display_name,
                    Some(&item_id),
                    &err,
                ));
                outcome
            }
        }
    }

    async fn recover(
        &self,
        store: &RwLock<EngagementStore>,
        item_id: &str,
        applied: &Applied,
        strategy: FailureStrategy,
    ) -> DispatchOutcome {
        if strategy == FailureStrategy::Resync {
            match self.reload_first_page(store).await {
                Ok(_) => return DispatchOutcome::Resynced,
                Err(e) => {
                    // Fall back to the local inverse so no unconfirmed change lingers
                    error!(
                        "[FeedEngine] Resync after failed action on {} failed: {}",
                        item_id, e
                    );
                }
            }
        }
        store.write().await.revert(item_id, applied);
        DispatchOutcome::Reverted
    }
}

/// Send the request matching `action` and translate the answer.
async fn confirm<R: EngagementRemote + ?Sized>(
    remote: &R,
    item_id: &str,
    action: &EngagementAction,
    transition: &Transition,
) -> Result<Confirmation> {
    match action {
        EngagementAction::React(kind) => Ok(remote
            .toggle_reaction(item_id, *kind)
            .await?
            .into_confirmation()),
        EngagementAction::ToggleBookmark => {
            // Direction comes from the value before the optimistic toggle
            if transition.before.has_bookmarked {
                remote.unbookmark(item_id).await?;
            } else {
                remote.bookmark(item_id).await?;
            }
            Ok(Confirmation::empty())
        }
        EngagementAction::Share => Ok(Confirmation {
            shares: remote.share(item_id).await?,
            ..Default::default()
        }),
        EngagementAction::Comment { content } => Ok(Confirmation::comment(
            remote.add_comment(item_id, content).await?,
        )),
        EngagementAction::Vote(kind) => match transition.after.user_vote {
            None => {
                remote.remove_vote(item_id).await?;
                Ok(Confirmation {
                    user_vote: Some(None),
                    ..Default::default()
                })
            }
            Some(_) => {
                let recorded = remote.vote(item_id, *kind).await?;
                Ok(Confirmation {
                    user_vote: Some(Some(recorded)),
                    ..Default::default()
                })
            }
        },
    }
}

/// A feed view with optimistic engagement.
pub struct FeedEngine<R> {
    store: Arc<RwLock<EngagementStore>>,
    shared: Arc<Shared<R>>,
}

impl<R> Clone for FeedEngine<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<R: EngagementRemote + 'static> FeedEngine<R> {
    pub fn new(remote: Arc<R>, page_size: u32) -> (Self, NoticeReceiver) {
        Self::with_policies(remote, page_size, PolicyTable::default())
    }

    pub fn with_policies(
        remote: Arc<R>,
        page_size: u32,
        policies: PolicyTable,
    ) -> (Self, NoticeReceiver) {
        let (notices, receiver) = notice::channel();
        let engine = Self {
            store: Arc::new(RwLock::new(EngagementStore::new())),
            shared: Arc::new(Shared {
                remote,
                ledger: Mutex::new(ActionLedger::default()),
                cursor: Mutex::new(FeedCursor::new(page_size)),
                query: Mutex::new(FeedQuery::default()),
                generation: AtomicU64::new(0),
                policies,
                notices,
            }),
        };
        (engine, receiver)
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.shared.remote
    }

    /// Handle to the store, e.g. for a renderer that reads items directly.
    pub fn store(&self) -> Arc<RwLock<EngagementStore>> {
        self.store.clone()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<Change<FeedItem>> {
        self.store.read().await.subscribe()
    }

    pub async fn items(&self) -> Vec<FeedItem> {
        self.store.read().await.items().to_vec()
    }

    pub async fn get(&self, id: &str) -> Option<FeedItem> {
        self.store.read().await.get(id).cloned()
    }

    pub async fn comments(&self, id: &str) -> Vec<Comment> {
        self.store.read().await.comments(id).to_vec()
    }

    pub async fn pagination(&self) -> PaginationState {
        self.shared.cursor.lock().await.state()
    }

    pub async fn query(&self) -> FeedQuery {
        self.shared.query.lock().await.clone()
    }

    pub async fn in_flight(&self, id: &str) -> bool {
        self.shared.ledger.lock().await.in_flight(id)
    }

    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.shared.ledger.lock().await.entries().cloned().collect()
    }

    /// Show items that did not come from the pulse feed (e.g. reviews of a
    /// movie). Pagination is reset and exhausted.
    pub async fn set_items(&self, items: Vec<FeedItem>) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let count = items.len();
        self.store.write().await.replace_items(items);
        self.shared
            .cursor
            .lock()
            .await
            .complete_first_page(count, Some(false));
    }

    /// Apply `action` now and reconcile with the server.
    pub async fn dispatch(&self, item_id: &str, action: EngagementAction) -> DispatchOutcome {
        self.shared
            .run_dispatch(Arc::downgrade(&self.store), item_id.to_string(), action)
            .await
    }

    /// Like [`FeedEngine::dispatch`] but runs on the tokio runtime.
    ///
    /// The task only holds a weak reference to the store; if every engine
    /// handle is dropped before the server answers, reconciliation is skipped.
    pub fn dispatch_detached(
        &self,
        item_id: &str,
        action: EngagementAction,
    ) -> JoinHandle<DispatchOutcome> {
        let shared = self.shared.clone();
        let store = Arc::downgrade(&self.store);
        let item_id = item_id.to_string();
        tokio::spawn(async move { shared.run_dispatch(store, item_id, action).await })
    }

    /// Load page 1 of the current query, replacing the list.
    pub async fn load_first_page(&self) -> Result<usize> {
        match self.shared.reload_first_page(&self.store).await {
            Ok(count) => Ok(count.unwrap_or(0)),
            Err(e) => {
                error!("[FeedEngine] Failed to load feed: {}", e);
                self.shared.notify(Notice::load_failed("the feed", &e));
                Err(e)
            }
        }
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.load_first_page().await
    }

    /// Load the next page if there is one and no load is running.
    ///
    /// Returns the number of items added; `0` when nothing was requested.
    pub async fn load_more(&self) -> Result<usize> {
        let Some(page) = self.shared.cursor.lock().await.begin_load_more() else {
            return Ok(0);
        };
        let query = self.shared.query.lock().await.clone();
        let generation = self.shared.generation.load(Ordering::SeqCst);
        let page_size = self.shared.cursor.lock().await.page_size();

        let result = self.shared.remote.get_feed(&query, page, page_size).await;

        if self.shared.generation.load(Ordering::SeqCst) != generation {
            debug!("[FeedEngine] Dropping page {} of a superseded query", page);
            return Ok(0);
        }

        match result {
            Ok(feed_page) => {
                let returned = feed_page.items.len();
                let added = self.store.write().await.append_items(feed_page.items);
                self.shared
                    .cursor
                    .lock()
                    .await
                    .complete_load_more(returned, feed_page.has_more);
                info!(
                    "[FeedEngine] Loaded page {} ({} items, {} new)",
                    page, returned, added
                );
                Ok(added)
            }
            Err(e) => {
                self.shared.cursor.lock().await.fail_load_more();
                error!("[FeedEngine] Failed to load page {}: {}", page, e);
                self.shared.notify(Notice::load_failed("more posts", &e));
                Err(e)
            }
        }
    }

    /// Switch filter/tab: reset pagination and load page 1 of the new query.
    pub async fn change_query(&self, query: FeedQuery) -> Result<usize> {
        *self.shared.query.lock().await = query;
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.cursor.lock().await.reset();
        self.load_first_page().await
    }

    fn require_auth(&self, action: &str) -> Result<()> {
        if self.shared.remote.is_authenticated() {
            return Ok(());
        }
        self.shared.notify(Notice::auth_required(action, None));
        Err(ApiError::NotAuthenticated {
            action: action.to_string(),
        })
    }

    /// Validate, send, and put the created pulse at the top of the feed.
    pub async fn create_pulse(&self, body: PulseCreate) -> Result<FeedItem> {
        self.require_auth("post a pulse")?;
        let body = prepare_pulse(body)?;

        let item = self.shared.remote.create_pulse(&body).await.map_err(|e| {
            error!("[FeedEngine] Failed to create pulse: {}", e);
            self.shared.notify(Notice::action_failed("pulse", None, &e));
            e
        })?;

        self.store.write().await.prepend_item(item.clone());
        info!("[FeedEngine] Created pulse {}", item.id);
        Ok(item)
    }

    pub async fn delete_pulse(&self, id: &str) -> Result<()> {
        self.require_auth("delete a pulse")?;
        self.shared.remote.delete_pulse(id).await.map_err(|e| {
            error!("[FeedEngine] Failed to delete pulse {}: {}", id, e);
            self.shared
                .notify(Notice::action_failed("deletion", Some(id), &e));
            e
        })?;
        self.store.write().await.remove_item(id);
        Ok(())
    }

    /// Fetch the first page of comments for an item into the store.
    pub async fn load_comments(&self, id: &str) -> Result<usize> {
        if !self.store.read().await.contains(id) {
            return Err(ApiError::NotFound { id: id.to_string() });
        }
        let comments = self.shared.remote.list_comments(id, 1).await.map_err(|e| {
            error!("[FeedEngine] Failed to load comments for {}: {}", id, e);
            self.shared.notify(Notice::load_failed("comments", &e));
            e
        })?;
        let count = comments.len();
        self.store.write().await.set_comments(id, comments);
        Ok(count)
    }

    /// Ask the server for the user's vote on a review and store it.
    ///
    /// Without credentials no request is made and `None` is returned.
    pub async fn load_user_vote(&self, review_id: &str) -> Result<Option<VoteKind>> {
        if !self.shared.remote.is_authenticated() {
            return Ok(None);
        }
        if !self.store.read().await.contains(review_id) {
            return Err(ApiError::NotFound {
                id: review_id.to_string(),
            });
        }
        let vote = self.shared.remote.get_vote(review_id).await.map_err(|e| {
            warn!("[FeedEngine] Failed to load vote for {}: {}", review_id, e);
            e
        })?;
        self.store.write().await.set_user_vote(review_id, vote);
        Ok(vote)
    }
}
