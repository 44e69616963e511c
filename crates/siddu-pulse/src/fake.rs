//! In-memory Siddu backend for tests and offline runs
//!
//! `FakeRemote` implements `EngagementRemote` against a local list of items:
//! - Writes change the fake's own copy, the way the real server would
//! - Every call is recorded so tests can assert what was (not) sent
//! - Failures can be injected per operation, once or permanently
//! - Requests can be held open with a gate to observe in-flight state

use async_trait::async_trait;
use siddu_api::{
    ApiError, Comment, EngagementRecord, FeedItem, FeedPage, FeedQuery, PulseCreate,
    ReactionKind, Result, VoteKind,
};
use siddu_core::{mutate, EngagementAction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

use crate::models::ReactionSnapshot;
use crate::remote::EngagementRemote;

/// Remote operation names, for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    GetFeed,
    CreatePulse,
    DeletePulse,
    ToggleReaction,
    Bookmark,
    Unbookmark,
    Share,
    AddComment,
    ListComments,
    Vote,
    RemoveVote,
    GetVote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub op: RemoteOp,
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
enum Failure {
    Once(ApiError),
    Always(ApiError),
}

#[derive(Default)]
struct FakeState {
    items: Vec<FeedItem>,
    comments: HashMap<String, Vec<Comment>>,
    /// Report `has_more` in feed responses; `false` mimics the bare-array shape
    paginated: bool,
}

pub struct FakeRemote {
    state: Mutex<FakeState>,
    authenticated: AtomicBool,
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<HashMap<RemoteOp, Failure>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("Item {} not found", id),
    }
}

impl FakeRemote {
    /// Authenticated fake serving `items` as the feed.
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                items,
                comments: HashMap::new(),
                paginated: true,
            }),
            authenticated: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    /// Answer feed requests without pagination metadata.
    pub async fn set_paginated(&self, paginated: bool) {
        self.state.lock().await.paginated = paginated;
    }

    pub async fn fail_next(&self, op: RemoteOp, error: ApiError) {
        self.failures.lock().await.insert(op, Failure::Once(error));
    }

    pub async fn fail_always(&self, op: RemoteOp, error: ApiError) {
        self.failures.lock().await.insert(op, Failure::Always(error));
    }

    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    /// Block every subsequent request until a permit is added to the
    /// returned semaphore (one permit releases one request).
    pub async fn hold_requests(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().await = Some(gate.clone());
        gate
    }

    pub async fn release_requests(&self) {
        if let Some(gate) = self.gate.lock().await.take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self, op: RemoteOp) -> usize {
        self.calls.lock().await.iter().filter(|c| c.op == op).count()
    }

    /// The server's copy of an item.
    pub async fn item(&self, id: &str) -> Option<FeedItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Change the server's copy behind the client's back.
    pub async fn update_item(&self, id: &str, update: impl FnOnce(&mut EngagementRecord)) {
        let mut state = self.state.lock().await;
        if let Some(item) = state.items.iter_mut().find(|i| i.id == id) {
            update(&mut item.engagement);
        }
    }

    pub async fn insert_item(&self, item: FeedItem) {
        self.state.lock().await.items.insert(0, item);
    }

    /// Record the call, wait at the gate, then apply injected failures.
    async fn enter(&self, op: RemoteOp, target: Option<&str>) -> Result<()> {
        self.calls.lock().await.push(RemoteCall {
            op,
            target: target.map(String::from),
        });

        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let mut failures = self.failures.lock().await;
        match failures.get(&op).cloned() {
            Some(Failure::Once(error)) => {
                failures.remove(&op);
                Err(error)
            }
            Some(Failure::Always(error)) => Err(error),
            None => Ok(()),
        }
    }

    fn require_auth(&self, action: &str) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated {
                action: action.to_string(),
            })
        }
    }

    /// Apply an engagement action to the server copy.
    async fn apply(&self, id: &str, action: EngagementAction) -> Result<EngagementRecord> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found(id))?;
        item.engagement = mutate(&item.engagement, &action).after;
        Ok(item.engagement.clone())
    }
}

#[async_trait]
impl EngagementRemote for FakeRemote {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn get_feed(&self, query: &FeedQuery, page: u32, limit: u32) -> Result<FeedPage> {
        self.enter(RemoteOp::GetFeed, None).await?;
        let state = self.state.lock().await;

        let matching: Vec<&FeedItem> = state
            .items
            .iter()
            .filter(|item| match &query.hashtag {
                Some(tag) => item.payload["content"]["hashtags"]
                    .as_array()
                    .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(tag.as_str()))),
                None => true,
            })
            .collect();

        let limit = limit.max(1) as usize;
        let start = (page.max(1) as usize - 1) * limit;
        let items: Vec<FeedItem> = matching
            .iter()
            .skip(start)
            .take(limit)
            .map(|item| (*item).clone())
            .collect();
        let has_more = start + items.len() < matching.len();

        Ok(FeedPage {
            items,
            current_page: state.paginated.then_some(page),
            has_more: state.paginated.then_some(has_more),
        })
    }

    async fn create_pulse(&self, body: &PulseCreate) -> Result<FeedItem> {
        self.require_auth("post a pulse")?;
        self.enter(RemoteOp::CreatePulse, None).await?;

        let payload = serde_json::json!({
            "content": {
                "text": body.content_text,
                "hashtags": body.hashtags.clone().unwrap_or_default(),
                "starRating": body.star_rating,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let item = FeedItem::pulse(uuid::Uuid::new_v4().to_string(), EngagementRecord::default())
            .with_payload(payload);
        self.state.lock().await.items.insert(0, item.clone());
        Ok(item)
    }

    async fn delete_pulse(&self, id: &str) -> Result<()> {
        self.require_auth("delete a pulse")?;
        self.enter(RemoteOp::DeletePulse, Some(id)).await?;
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(not_found(id));
        }
        state.comments.remove(id);
        Ok(())
    }

    async fn toggle_reaction(&self, id: &str, kind: ReactionKind) -> Result<ReactionSnapshot> {
        self.require_auth("react")?;
        self.enter(RemoteOp::ToggleReaction, Some(id)).await?;
        let record = self.apply(id, EngagementAction::React(kind)).await?;
        Ok(ReactionSnapshot {
            reactions: record.reactions.clone(),
            total: record.total,
            user_reaction: record.user_reaction,
        })
    }

    async fn bookmark(&self, id: &str) -> Result<()> {
        self.require_auth("bookmark")?;
        self.enter(RemoteOp::Bookmark, Some(id)).await?;
        self.update_checked(id, |r| r.has_bookmarked = true).await
    }

    async fn unbookmark(&self, id: &str) -> Result<()> {
        self.require_auth("remove a bookmark")?;
        self.enter(RemoteOp::Unbookmark, Some(id)).await?;
        self.update_checked(id, |r| r.has_bookmarked = false).await
    }

    async fn share(&self, id: &str) -> Result<Option<u64>> {
        self.require_auth("share")?;
        self.enter(RemoteOp::Share, Some(id)).await?;
        let record = self.apply(id, EngagementAction::Share).await?;
        Ok(Some(record.shares))
    }

    async fn add_comment(&self, id: &str, content: &str) -> Result<Comment> {
        self.require_auth("comment")?;
        self.enter(RemoteOp::AddComment, Some(id)).await?;
        self.apply(
            id,
            EngagementAction::Comment {
                content: content.to_string(),
            },
        )
        .await?;

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: id.to_string(),
            content: content.to_string(),
            author: serde_json::json!({ "username": "fake-user" }),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.state
            .lock()
            .await
            .comments
            .entry(id.to_string())
            .or_default()
            .insert(0, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, id: &str, _page: u32) -> Result<Vec<Comment>> {
        self.enter(RemoteOp::ListComments, Some(id)).await?;
        let state = self.state.lock().await;
        Ok(state.comments.get(id).cloned().unwrap_or_default())
    }

    async fn vote(&self, review_id: &str, kind: VoteKind) -> Result<VoteKind> {
        self.require_auth("vote")?;
        self.enter(RemoteOp::Vote, Some(review_id)).await?;
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == review_id)
            .ok_or_else(|| not_found(review_id))?;
        // Repeating the current vote is a no-op on the server
        if item.engagement.user_vote != Some(kind) {
            item.engagement = mutate(&item.engagement, &EngagementAction::Vote(kind)).after;
        }
        Ok(kind)
    }

    async fn remove_vote(&self, review_id: &str) -> Result<()> {
        self.require_auth("remove a vote")?;
        self.enter(RemoteOp::RemoveVote, Some(review_id)).await?;
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == review_id)
            .ok_or_else(|| not_found(review_id))?;
        if let Some(current) = item.engagement.user_vote {
            item.engagement = mutate(&item.engagement, &EngagementAction::Vote(current)).after;
        }
        Ok(())
    }

    async fn get_vote(&self, review_id: &str) -> Result<Option<VoteKind>> {
        self.require_auth("read your vote")?;
        self.enter(RemoteOp::GetVote, Some(review_id)).await?;
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .find(|i| i.id == review_id)
            .and_then(|i| i.engagement.user_vote))
    }
}

impl FakeRemote {
    async fn update_checked(&self, id: &str, update: impl FnOnce(&mut EngagementRecord)) -> Result<()> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found(id))?;
        update(&mut item.engagement);
        Ok(())
    }
}
