use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use siddu_api::{
    ApiError, Comment, FeedItem, FeedPage, FeedQuery, PulseCreate, ReactionKind, Result, VoteKind,
};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::SidduConfig;
use crate::models::{
    parse_vote, share_count, CommentDto, CommentsResponse, FeedResponse, PulseDto,
    ReactionSnapshot, ReactionSnapshotDto, VoteDto,
};
use crate::remote::EngagementRemote;

const API_PREFIX: &str = "/api/v1";
const MAX_ERROR_BODY: usize = 500;

/// HTTP client for the Siddu pulse and review endpoints.
pub struct SidduClient {
    base_url: String,
    default_headers: HeaderMap,
    client: reqwest::Client,
    authenticated: bool,
}

impl SidduClient {
    pub fn new(base_url: &str, access_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let token = access_token.map(str::trim).filter(|t| !t.is_empty());
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::invalid_input("Access token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: headers,
            client,
            authenticated: token.is_some(),
        })
    }

    pub fn from_config(config: &SidduConfig) -> Result<Self> {
        Self::new(
            &config.api_url,
            config.access_token.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn require_auth(&self, action: &str) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated {
                action: action.to_string(),
            })
        }
    }

    /// Helper to create better error messages from reqwest errors
    fn format_reqwest_error(e: &reqwest::Error, url: &str, operation: &str) -> String {
        if e.is_timeout() {
            format!(
                "Failed to {} for {}: timeout - request took too long",
                operation, url
            )
        } else if e.is_connect() {
            format!(
                "Failed to {} for {}: connection error - check network connectivity. Error: {}",
                operation, url, e
            )
        } else if e.is_request() {
            format!(
                "Failed to {} for {}: request error - invalid URL or parameters. Error: {}",
                operation, url, e
            )
        } else {
            format!("Failed to {} for {}: {}", operation, url, e)
        }
    }

    /// Turn a non-2xx response into `ApiError::Status`.
    ///
    /// The backend puts a human readable reason in `detail`; otherwise the
    /// body is used, truncated.
    async fn handle_response(response: reqwest::Response, url: &str) -> Result<String> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| ApiError::Transport {
            message: format!("Failed to read response body from {}: {}", url, e),
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<serde_json::Value>(&response_text)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from));
            let message = detail.unwrap_or_else(|| {
                if response_text.chars().count() > MAX_ERROR_BODY {
                    let head: String = response_text.chars().take(MAX_ERROR_BODY).collect();
                    format!("{}... (truncated)", head)
                } else {
                    response_text
                }
            });
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response_text)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        operation: &str,
    ) -> Result<String> {
        let url = self.url(path);
        debug!("[SidduClient] {} {} ({})", method, url, operation);

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.default_headers.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            let message = Self::format_reqwest_error(&e, &url, operation);
            error!("[SidduClient] {}", message);
            ApiError::Transport { message }
        })?;

        Self::handle_response(response, &url).await.map_err(|e| {
            error!("[SidduClient] Failed to {}: {}", operation, e);
            e
        })
    }

    fn decode<T: DeserializeOwned>(text: &str, operation: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            error!(
                "[SidduClient] Failed to parse {} response: {} - Response: {}",
                operation,
                e,
                text.chars().take(200).collect::<String>()
            );
            ApiError::malformed(format!("{}: {}", operation, e))
        })
    }

    /// Fetch one page of the pulse feed.
    pub async fn get_feed(&self, query: &FeedQuery, page: u32, limit: u32) -> Result<FeedPage> {
        let mut params = vec![
            ("filter", query.filter.as_str().to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(window) = query.window {
            params.push(("window", window.as_str().to_string()));
        }
        if let Some(tag) = &query.hashtag {
            params.push(("hashtag", tag.clone()));
        }
        if let Some(movie) = &query.linked_movie_id {
            params.push(("linkedMovieId", movie.clone()));
        }
        if let Some(linked_type) = &query.linked_type {
            params.push(("linkedType", linked_type.clone()));
        }
        if let Some(user) = &query.user_id {
            params.push(("userId", user.clone()));
        }

        let text = self
            .send(Method::GET, "/pulse/feed", &params, None, "load feed")
            .await?;
        let page_data = Self::decode::<FeedResponse>(&text, "feed")?.into_page()?;
        info!(
            "[SidduClient] Loaded feed page {} ({} items, filter={})",
            page,
            page_data.items.len(),
            query.filter
        );
        Ok(page_data)
    }

    pub async fn create_pulse(&self, body: &PulseCreate) -> Result<FeedItem> {
        self.require_auth("post a pulse")?;
        let payload = serde_json::to_value(body).map_err(|e| ApiError::Internal {
            message: format!("Failed to encode pulse: {}", e),
        })?;
        let text = self
            .send(Method::POST, "/pulse", &[], Some(payload), "create pulse")
            .await?;
        Self::decode::<PulseDto>(&text, "create pulse")?.into_feed_item()
    }

    pub async fn delete_pulse(&self, id: &str) -> Result<()> {
        self.require_auth("delete a pulse")?;
        self.send(
            Method::DELETE,
            &format!("/pulse/{}", id),
            &[],
            None,
            "delete pulse",
        )
        .await?;
        Ok(())
    }

    pub async fn toggle_reaction(&self, id: &str, kind: ReactionKind) -> Result<ReactionSnapshot> {
        self.require_auth("react")?;
        let text = self
            .send(
                Method::POST,
                &format!("/pulse/{}/reactions", id),
                &[],
                Some(json!({ "type": kind.as_str() })),
                "toggle reaction",
            )
            .await?;
        Self::decode::<ReactionSnapshotDto>(&text, "toggle reaction")?.into_snapshot()
    }

    pub async fn bookmark(&self, id: &str) -> Result<()> {
        self.require_auth("bookmark")?;
        self.send(
            Method::POST,
            &format!("/pulse/{}/bookmark", id),
            &[],
            None,
            "bookmark pulse",
        )
        .await?;
        Ok(())
    }

    pub async fn unbookmark(&self, id: &str) -> Result<()> {
        self.require_auth("remove a bookmark")?;
        self.send(
            Method::DELETE,
            &format!("/pulse/{}/bookmark", id),
            &[],
            None,
            "unbookmark pulse",
        )
        .await?;
        Ok(())
    }

    pub async fn share(&self, id: &str) -> Result<Option<u64>> {
        self.require_auth("share")?;
        let text = self
            .send(
                Method::POST,
                &format!("/pulse/{}/share", id),
                &[],
                None,
                "share pulse",
            )
            .await?;
        // An empty body carries no count
        if text.trim().is_empty() {
            return Ok(None);
        }
        let body = Self::decode::<serde_json::Value>(&text, "share")?;
        Ok(share_count(&body))
    }

    pub async fn add_comment(&self, id: &str, content: &str) -> Result<Comment> {
        self.require_auth("comment")?;
        let text = self
            .send(
                Method::POST,
                &format!("/pulse/{}/comments", id),
                &[],
                Some(json!({ "content": content })),
                "add comment",
            )
            .await?;
        Ok(Self::decode::<CommentDto>(&text, "add comment")?.into_comment(id))
    }

    pub async fn list_comments(&self, id: &str, page: u32) -> Result<Vec<Comment>> {
        let text = self
            .send(
                Method::GET,
                &format!("/pulse/{}/comments", id),
                &[("page", page.to_string())],
                None,
                "load comments",
            )
            .await?;
        Ok(Self::decode::<CommentsResponse>(&text, "comments")?.into_comments(id))
    }

    pub async fn vote(&self, review_id: &str, kind: VoteKind) -> Result<VoteKind> {
        self.require_auth("vote")?;
        let text = self
            .send(
                Method::POST,
                &format!("/reviews/{}/vote", review_id),
                &[],
                Some(json!({ "voteType": kind.as_str() })),
                "vote on review",
            )
            .await?;
        let vote = Self::decode::<VoteDto>(&text, "vote")?;
        parse_vote(&vote.vote_type)
    }

    pub async fn remove_vote(&self, review_id: &str) -> Result<()> {
        self.require_auth("remove a vote")?;
        self.send(
            Method::DELETE,
            &format!("/reviews/{}/vote", review_id),
            &[],
            None,
            "remove vote",
        )
        .await?;
        Ok(())
    }

    /// Current user's vote on a review; `None` when they have not voted.
    pub async fn get_vote(&self, review_id: &str) -> Result<Option<VoteKind>> {
        self.require_auth("read your vote")?;
        let text = self
            .send(
                Method::GET,
                &format!("/reviews/{}/vote", review_id),
                &[],
                None,
                "load vote",
            )
            .await?;
        let vote = Self::decode::<Option<VoteDto>>(&text, "vote")?;
        vote.map(|v| parse_vote(&v.vote_type)).transpose()
    }
}

#[async_trait]
impl EngagementRemote for SidduClient {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn get_feed(&self, query: &FeedQuery, page: u32, limit: u32) -> Result<FeedPage> {
        SidduClient::get_feed(self, query, page, limit).await
    }

    async fn create_pulse(&self, body: &PulseCreate) -> Result<FeedItem> {
        SidduClient::create_pulse(self, body).await
    }

    async fn delete_pulse(&self, id: &str) -> Result<()> {
        SidduClient::delete_pulse(self, id).await
    }

    async fn toggle_reaction(&self, id: &str, kind: ReactionKind) -> Result<ReactionSnapshot> {
        SidduClient::toggle_reaction(self, id, kind).await
    }

    async fn bookmark(&self, id: &str) -> Result<()> {
        SidduClient::bookmark(self, id).await
    }

    async fn unbookmark(&self, id: &str) -> Result<()> {
        SidduClient::unbookmark(self, id).await
    }

    async fn share(&self, id: &str) -> Result<Option<u64>> {
        SidduClient::share(self, id).await
    }

    async fn add_comment(&self, id: &str, content: &str) -> Result<Comment> {
        SidduClient::add_comment(self, id, content).await
    }

    async fn list_comments(&self, id: &str, page: u32) -> Result<Vec<Comment>> {
        SidduClient::list_comments(self, id, page).await
    }

    async fn vote(&self, review_id: &str, kind: VoteKind) -> Result<VoteKind> {
        SidduClient::vote(self, review_id, kind).await
    }

    async fn remove_vote(&self, review_id: &str) -> Result<()> {
        SidduClient::remove_vote(self, review_id).await
    }

    async fn get_vote(&self, review_id: &str) -> Result<Option<VoteKind>> {
        SidduClient::get_vote(self, review_id).await
    }
}
