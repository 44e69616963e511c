//! Page tracking for incremental feed loading.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Where a feed is in its paging sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Last page successfully loaded, starting at 1
    pub page: u32,
    pub has_more: bool,
    pub is_loading_more: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            has_more: true,
            is_loading_more: false,
        }
    }
}

/// Gatekeeper for "load more" requests.
///
/// A caller asks [`FeedCursor::begin_load_more`] for the next page number; it
/// gets `None` while a load is already running or after the feed ran out, so
/// scroll events arriving in bursts produce one request.
#[derive(Debug, Clone)]
pub struct FeedCursor {
    state: PaginationState,
    page_size: u32,
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            state: PaginationState::default(),
            page_size: page_size.max(1),
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Claim the next page. Sets `is_loading_more` until completed or failed.
    pub fn begin_load_more(&mut self) -> Option<u32> {
        if self.state.is_loading_more || !self.state.has_more {
            return None;
        }
        self.state.is_loading_more = true;
        Some(self.state.page + 1)
    }

    /// Record a successful page load of `returned` items.
    ///
    /// `server_has_more` wins when present; otherwise a full page means there
    /// may be more.
    pub fn complete_load_more(&mut self, returned: usize, server_has_more: Option<bool>) {
        if !self.state.is_loading_more {
            return;
        }
        self.state.page += 1;
        self.state.has_more = self.more_after(returned, server_has_more);
        self.state.is_loading_more = false;
    }

    /// Clear the in-progress flag without advancing the page.
    pub fn fail_load_more(&mut self) {
        self.state.is_loading_more = false;
    }

    /// Back to page 1 with `has_more` set, used when the query changes.
    pub fn reset(&mut self) {
        self.state = PaginationState::default();
    }

    /// Record the result of loading page 1.
    pub fn complete_first_page(&mut self, returned: usize, server_has_more: Option<bool>) {
        self.state = PaginationState {
            page: 1,
            has_more: self.more_after(returned, server_has_more),
            is_loading_more: false,
        };
    }

    fn more_after(&self, returned: usize, server_has_more: Option<bool>) -> bool {
        server_has_more.unwrap_or(returned >= self.page_size as usize)
    }
}
