//! Core engagement state machinery for Siddu feeds
//!
//! This crate is synchronous and does no I/O:
//! - `store` - `EngagementStore`, the single owner of the in-memory feed
//! - `mutator` - forward and inverse transforms of an `EngagementRecord`
//! - `action` - user actions and the per-action reconciliation policy table
//! - `confirmation` - canonical values a server may return after an action
//! - `ledger` - log of dispatched actions and their settlement status
//! - `pagination` - `FeedCursor` for incremental page loading

pub mod action;
pub mod confirmation;
pub mod ledger;
pub mod mutator;
pub mod pagination;
pub mod store;

#[cfg(test)]
mod store_pbt;

pub use action::{ActionKind, ActionPolicy, EngagementAction, FailureStrategy, PolicyTable, ToggleKind};
pub use confirmation::Confirmation;
pub use ledger::{ActionLedger, ActionStatus, LedgerEntry};
pub use mutator::{invert, mutate, EngagementDelta, FlagChange, Transition};
pub use pagination::{FeedCursor, PaginationState};
pub use store::{Applied, EngagementStore};
