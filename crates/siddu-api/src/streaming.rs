//! Change notifications emitted by the engagement store
//!
//! A renderer subscribes to these to know when to redraw. Local changes come
//! from optimistic mutations and their reversal; remote changes come from
//! server data (page loads, resyncs, canonical counters).

use serde::{Deserialize, Serialize};

/// Origin of a change event (local vs. remote).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Change applied by this client before or instead of server confirmation
    Local {
        /// Ledger sequence number of the action that caused it
        operation_id: Option<u64>,
    },
    /// Change derived from a server response
    Remote,
}

impl ChangeOrigin {
    pub fn local(operation_id: u64) -> Self {
        ChangeOrigin::Local {
            operation_id: Some(operation_id),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ChangeOrigin::Local { .. })
    }
}

/// Change to an entity in an ordered collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Change<T> {
    Created { data: T, origin: ChangeOrigin },
    Updated { id: String, data: T, origin: ChangeOrigin },
    Deleted { id: String, origin: ChangeOrigin },
    /// The whole collection was replaced; `count` is the new length
    Reset { count: usize, origin: ChangeOrigin },
}

impl<T> Change<T> {
    pub fn origin(&self) -> &ChangeOrigin {
        match self {
            Change::Created { origin, .. }
            | Change::Updated { origin, .. }
            | Change::Deleted { origin, .. }
            | Change::Reset { origin, .. } => origin,
        }
    }
}
