//! Log of dispatched engagement actions.
//!
//! Every action the engine dispatches gets an entry that starts `Pending` and
//! is settled exactly once. The ledger is also how the engine detects that an
//! item already has an unconfirmed action.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::action::EngagementAction;
use crate::mutator::Transition;

pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Settlement status of a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    /// Applied locally, waiting for the server
    Pending,
    /// Server accepted the action
    Confirmed,
    /// Server rejected it and the local transition was inverted
    Reverted,
    /// Server rejected it and the feed was re-fetched
    Resynced,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Confirmed => "confirmed",
            ActionStatus::Reverted => "reverted",
            ActionStatus::Resynced => "resynced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ActionStatus::Pending),
            "confirmed" => Some(ActionStatus::Confirmed),
            "reverted" => Some(ActionStatus::Reverted),
            "resynced" => Some(ActionStatus::Resynced),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ActionStatus::Pending)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub seq: u64,
    pub item_id: String,
    pub action: EngagementAction,
    /// Local transition, kept so a failure can be inverted
    pub transition: Transition,
    pub status: ActionStatus,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
    pub settled_at: Option<i64>,
}

/// Bounded in-memory action log.
///
/// Settled entries are trimmed oldest-first once the log grows past
/// `max_entries`. Pending entries are never trimmed.
#[derive(Debug)]
pub struct ActionLedger {
    entries: VecDeque<LedgerEntry>,
    next_seq: u64,
    max_entries: usize,
}

impl Default for ActionLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl ActionLedger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 1,
            max_entries,
        }
    }

    /// Record a newly dispatched action and return its sequence number.
    pub fn begin(
        &mut self,
        item_id: impl Into<String>,
        action: EngagementAction,
        transition: Transition,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.push_back(LedgerEntry {
            seq,
            item_id: item_id.into(),
            action,
            transition,
            status: ActionStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
            settled_at: None,
        });
        self.trim();
        seq
    }

    /// Move a pending entry to its final status.
    ///
    /// Returns `false` if the entry is unknown or already settled.
    pub fn settle(&mut self, seq: u64, status: ActionStatus) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.seq == seq) else {
            return false;
        };
        if entry.status.is_settled() || !status.is_settled() {
            return false;
        }
        entry.status = status;
        entry.settled_at = Some(chrono::Utc::now().timestamp_millis());
        self.trim();
        true
    }

    pub fn in_flight(&self, item_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.item_id == item_id && e.status == ActionStatus::Pending)
    }

    pub fn get(&self, seq: u64) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.seq == seq)
    }

    pub fn pending(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == ActionStatus::Pending)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.max_entries {
            let Some(pos) = self.entries.iter().position(|e| e.status.is_settled()) else {
                break;
            };
            self.entries.remove(pos);
        }
    }
}
