//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler:
//! - Building the shared client with the crawler's user agent
//! - Following redirects only while they stay inside the URL policy
//! - Retrying transient failures with exponential backoff
//! - Honouring `Retry-After` on HTTP 429
//! - Refusing to hand non-HTML bodies to the extractor

use crate::config::{Config, CrawlerConfig};
use crate::url::UrlPolicy;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Longest redirect chain followed
pub const MAX_REDIRECTS: usize = 10;

/// Content types handed to the extractor
const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Successful fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// An HTML page; `final_url` is the URL after redirects
    Html { final_url: Url, body: String },

    /// Anything that is not HTML
    NotHtml { final_url: Url, content_type: String },
}

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("HTTP 429 (rate limited)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("redirect refused: {0}")]
    Redirect(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unreadable response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Short label used to group errors in health tracking
    pub fn kind(&self) -> String {
        match self {
            FetchError::Status(code) => format!("http_{}", code),
            FetchError::RateLimited { .. } => "http_429".to_string(),
            FetchError::Timeout => "timeout".to_string(),
            FetchError::Connect(_) => "connect".to_string(),
            FetchError::Redirect(_) => "redirect".to_string(),
            FetchError::Transport(_) => "transport".to_string(),
            FetchError::Body(_) => "body".to_string(),
        }
    }

    /// Whether another attempt may succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | HTTP 5xx | yes |
    /// | HTTP 429 | yes, after `Retry-After` when given |
    /// | Other HTTP 4xx | no |
    /// | Timeout, connect, reset | yes |
    /// | Refused redirect | no |
    /// | Broken or undecodable body | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code >= 500,
            FetchError::RateLimited { .. } => true,
            FetchError::Timeout | FetchError::Connect(_) | FetchError::Transport(_) => true,
            FetchError::Redirect(_) | FetchError::Body(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_redirect() {
            FetchError::Redirect(e.to_string())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Builds the HTTP client shared by page and robots.txt requests
///
/// Redirects are followed up to [`MAX_REDIRECTS`] hops and only while every
/// hop passes `policy`; anything else surfaces as [`FetchError::Redirect`].
///
/// # Example
///
/// ```no_run
/// use curio::config::load_config;
/// use curio::crawler::build_http_client;
/// use curio::url::UrlPolicy;
/// use std::path::Path;
///
/// let config = load_config(Path::new("curio.toml")).unwrap();
/// let policy = UrlPolicy::new(config.whitelist(), config.crawler.allow_private_hosts);
/// let client = build_http_client(&config, policy).unwrap();
/// ```
pub fn build_http_client(config: &Config, policy: UrlPolicy) -> Result<Client, reqwest::Error> {
    let redirect_policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        if attempt.previous().contains(attempt.url()) {
            return attempt.error("redirect loop");
        }
        match policy.check(attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(rejection) => {
                let message = format!("{} is outside the crawl policy ({:?})", attempt.url(), rejection);
                attempt.error(message)
            }
        }
    });

    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect_policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page, retrying transient failures
///
/// # Arguments
///
/// * `client` - Client from [`build_http_client`]
/// * `url` - Canonical URL to fetch
/// * `config` - Retry and backoff settings
///
/// # Returns
///
/// * `Ok(FetchOutcome)` - The response was 2xx
/// * `Err(FetchError)` - A terminal failure, or the last retryable one once
///   `max_retries` is exhausted
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    config: &CrawlerConfig,
) -> Result<FetchOutcome, FetchError> {
    let mut attempt = 0;

    loop {
        let error = match fetch_once(client, url).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => e,
        };

        if !error.is_retryable() || attempt >= config.max_retries {
            return Err(error);
        }

        let delay = match &error {
            FetchError::RateLimited {
                retry_after: Some(wait),
            } => (*wait).min(Duration::from_secs(config.max_retry_after_secs)),
            _ => backoff_delay(config.retry_base_delay_ms, attempt),
        };

        warn!(
            "Fetching {} failed ({}), retry {}/{} in {:?}",
            url,
            error,
            attempt + 1,
            config.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn fetch_once(client: &Client, url: &Url) -> Result<FetchOutcome, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_retry_after(value, Utc::now()));
        return Err(FetchError::RateLimited { retry_after });
    }

    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html(&content_type) {
        debug!("Skipping {} ({})", final_url, content_type);
        return Ok(FetchOutcome::NotHtml {
            final_url,
            content_type,
        });
    }

    let body = response.text().await?;
    Ok(FetchOutcome::Html { final_url, body })
}

/// Checks whether a Content-Type header names an HTML document
pub fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    HTML_TYPES.contains(&mime.as_str())
}

/// `base_ms * 2^attempt`, saturating
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt.min(20))))
}

/// Parses a `Retry-After` value: delta-seconds or an HTTP-date
///
/// Dates in the past yield a zero wait.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - now;
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
