//! Feed entities and query parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engagement::EngagementRecord;

/// What kind of content a feed item is. Reviews carry votes, pulses carry reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Pulse,
    Review,
}

/// A single post or review in a feed.
///
/// `payload` holds author and content data as received from the server.
/// The engagement machinery never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub kind: ItemKind,
    pub engagement: EngagementRecord,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl FeedItem {
    pub fn pulse(id: impl Into<String>, engagement: EngagementRecord) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Pulse,
            engagement,
            payload: serde_json::Value::Null,
        }
    }

    pub fn review(id: impl Into<String>, engagement: EngagementRecord) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Review,
            engagement,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A comment on a pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub content: String,
    #[serde(default)]
    pub author: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFilter {
    #[default]
    Latest,
    Popular,
    Following,
    Trending,
}

impl FeedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFilter::Latest => "latest",
            FeedFilter::Popular => "popular",
            FeedFilter::Following => "following",
            FeedFilter::Trending => "trending",
        }
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(FeedFilter::Latest),
            "popular" => Ok(FeedFilter::Popular),
            "following" => Ok(FeedFilter::Following),
            "trending" => Ok(FeedFilter::Trending),
            other => Err(format!("Unknown feed filter: {}", other)),
        }
    }
}

/// Ranking window for popular/trending feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "24h",
            TimeWindow::Week => "7d",
            TimeWindow::Month => "30d",
        }
    }
}

/// Everything that selects a feed except the page number.
///
/// Changing any of these fields starts a new feed from page 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    pub filter: FeedFilter,
    pub window: Option<TimeWindow>,
    pub hashtag: Option<String>,
    pub linked_movie_id: Option<String>,
    pub linked_type: Option<String>,
    pub user_id: Option<String>,
}

impl FeedQuery {
    pub fn new(filter: FeedFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn hashtag(mut self, tag: impl Into<String>) -> Self {
        self.hashtag = Some(tag.into());
        self
    }

    pub fn linked_movie(mut self, movie_id: impl Into<String>) -> Self {
        self.linked_movie_id = Some(movie_id.into());
        self
    }
}

/// One decoded page of a feed.
///
/// `has_more` and `current_page` are `None` when the server answered with a
/// bare array instead of the paginated envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub current_page: Option<u32>,
    pub has_more: Option<bool>,
}

/// Professional role a pulse can be posted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosterRole {
    Critic,
    IndustryPro,
    TalentPro,
}

/// Body of a new pulse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseCreate {
    pub content_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_media: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_movie_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_as_role: Option<PosterRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<u8>,
}

impl PulseCreate {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content_text: content.into(),
            ..Default::default()
        }
    }
}
