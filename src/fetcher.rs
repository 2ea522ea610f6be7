use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::feed::{FeedSource, Post};

const USER_AGENT: &str = "Startpage/1.0 (Feed Poller)";

/// Why a source contributed no post this run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing in the feed was published inside the time window
    #[error("no new posts")]
    NoUpdate,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Fetch and parse together exceeded the per-source deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("could not build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub fn is_no_update(&self) -> bool {
        matches!(self, FetchError::NoUpdate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Posts older than `now - window` are ignored
    pub window: Duration,
    /// Bounds the whole fetch-and-parse of one source
    pub timeout: Duration,
}

impl From<&Config> for FetchOptions {
    fn from(config: &Config) -> Self {
        Self {
            window: config.window(),
            timeout: config.fetch_timeout(),
        }
    }
}

/// Retrieves one feed and picks out its newest qualifying post.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    options: FetchOptions,
}

impl Fetcher {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch(&self, source: &FeedSource) -> Result<Post, FetchError> {
        let deadline = self.options.timeout;
        let feed = tokio::time::timeout(deadline, self.fetch_feed(&source.url))
            .await
            .map_err(|_| FetchError::Timeout(deadline))??;

        select_post(&feed, source, cutoff(Utc::now(), self.options.window))
    }

    async fn fetch_feed(&self, url: &str) -> Result<Feed, FetchError> {
        debug!(url, "fetching feed");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;

        parser::parse(&bytes[..]).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// `now - window`, clamped to the earliest representable instant.
pub fn cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns the first entry, in feed order, published strictly after `cutoff`.
///
/// Entries without a publish (or updated) date or without a link never match,
/// so an in-window entry with no link is passed over for a later linked one.
pub fn select_post(
    feed: &Feed,
    source: &FeedSource,
    cutoff: DateTime<Utc>,
) -> Result<Post, FetchError> {
    for entry in &feed.entries {
        let Some(published) = entry.published.or(entry.updated) else {
            continue;
        };
        if published <= cutoff {
            continue;
        }

        let Some(url) = entry
            .links
            .first()
            .map(|l| l.href.trim())
            .filter(|href| !href.is_empty())
        else {
            continue;
        };

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        return Ok(Post {
            source: source_name(feed, source),
            title,
            url: url.to_string(),
            published,
        });
    }

    Err(FetchError::NoUpdate)
}

fn source_name(feed: &Feed, source: &FeedSource) -> String {
    source
        .name
        .clone()
        .or_else(|| {
            feed.title
                .as_ref()
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| source.url.clone())
}
