//! Curio: a curated-domain crawler with a full-text search index
//!
//! This crate crawls a whitelist of domains, politely and resumably, extracts
//! readable text from each page and keeps it queryable through a ranked
//! keyword index.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod index;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Curio operations
#[derive(Debug, Error)]
pub enum CurioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Crawl state error: {0}")]
    State(#[from] state::StateError),

    #[error("Invalid crawler transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crawler::CrawlStatus,
        to: crawler::CrawlStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
///
/// Every variant is a policy rejection: callers skip the URL and move on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Curio operations
pub type Result<T> = std::result::Result<T, CurioError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler, StopReason};
pub use extract::{extract, ExtractedContent, Quality, SiteType};
pub use index::{Document, Indexer, SearchOptions, SearchResponse};
pub use crate::url::{extract_domain, is_blocked_host, is_whitelisted, normalize_url};
