//! User-facing notices (toasts) emitted by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    /// The server rejected an action that was already shown as done
    ActionFailed,
    /// The user tried an action that needs a signed-in session
    AuthRequired,
    /// A feed or comment load failed
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    /// Display name of the action, e.g. "bookmark"
    pub action: Option<String>,
    pub item_id: Option<String>,
    pub message: String,
}

impl Notice {
    pub fn action_failed(action: &str, item_id: Option<&str>, reason: impl fmt::Display) -> Self {
        Self {
            kind: NoticeKind::ActionFailed,
            action: Some(action.to_string()),
            item_id: item_id.map(String::from),
            message: format!("Could not save your {}: {}", action, reason),
        }
    }

    pub fn auth_required(action: &str, item_id: Option<&str>) -> Self {
        Self {
            kind: NoticeKind::AuthRequired,
            action: Some(action.to_string()),
            item_id: item_id.map(String::from),
            message: format!("Sign in to {}", action),
        }
    }

    pub fn load_failed(what: &str, reason: impl fmt::Display) -> Self {
        Self {
            kind: NoticeKind::LoadFailed,
            action: None,
            item_id: None,
            message: format!("Could not load {}: {}", what, reason),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}
