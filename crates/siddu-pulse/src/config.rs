use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use siddu_api::FeedFilter;
use std::fs;
use std::path::Path;

pub const ENV_API_URL: &str = "SIDDU_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "SIDDU_ACCESS_TOKEN";
pub const ENV_PAGE_SIZE: &str = "SIDDU_PAGE_SIZE";

/// Client configuration, from a YAML file and/or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SidduConfig {
    pub api_url: String,
    /// Bearer token; obtained elsewhere (login is not handled here)
    pub access_token: Option<String>,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub default_filter: FeedFilter,
}

impl Default for SidduConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            access_token: None,
            page_size: 20,
            request_timeout_secs: 30,
            default_filter: FeedFilter::Latest,
        }
    }
}

impl SidduConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;

        let config: SidduConfig = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config YAML {}: {}", path.display(), e)
        })?;

        config.validate()?;
        Ok(config)
    }

    /// File (if given) first, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token).filter(|t| !t.trim().is_empty());
        }
        if let Ok(size) = std::env::var(ENV_PAGE_SIZE) {
            self.page_size = size
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_PAGE_SIZE, size))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            anyhow::bail!("api_url must not be empty");
        }
        if self.page_size == 0 || self.page_size > 100 {
            anyhow::bail!("page_size must be between 1 and 100, got {}", self.page_size);
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
