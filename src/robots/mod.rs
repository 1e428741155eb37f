//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A robots.txt that cannot be fetched never blocks the crawl: any failure
//! falls back to a permissive policy.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Bodies beyond this size are truncated before parsing
const MAX_ROBOTS_BYTES: usize = 512 * 1024;

/// Builds the robots.txt URL for the host serving `page_url`
///
/// The page's own scheme and port are kept.
pub fn robots_url(page_url: &Url) -> Option<Url> {
    page_url.host_str()?;
    page_url.join("/robots.txt").ok()
}

/// Fetches robots.txt for the host serving `page_url`
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `page_url` - Any URL on the host whose policy is wanted
///
/// # Returns
///
/// The parsed policy. Non-OK responses and network failures yield
/// [`ParsedRobots::allow_all`].
pub async fn fetch_robots(client: &Client, page_url: &Url) -> ParsedRobots {
    let Some(robots_url) = robots_url(page_url) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to fetch {}: {}, assuming no restrictions", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        debug!("{} returned {}, assuming no restrictions", robots_url, status);
        return ParsedRobots::allow_all();
    }

    match response.bytes().await {
        Ok(body) => {
            let body = &body[..body.len().min(MAX_ROBOTS_BYTES)];
            debug!("Fetched {} ({} bytes)", robots_url, body.len());
            ParsedRobots::from_content(&String::from_utf8_lossy(body))
        }
        Err(e) => {
            warn!("Failed to read {}: {}, assuming no restrictions", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_url_keeps_scheme_and_port() {
        let page = Url::parse("http://127.0.0.1:8080/docs/page?x=1").unwrap();
        assert_eq!(
            robots_url(&page).unwrap().as_str(),
            "http://127.0.0.1:8080/robots.txt"
        );
    }

    #[test]
    fn test_robots_url_https() {
        let page = Url::parse("https://docs.example.com/a/b").unwrap();
        assert_eq!(
            robots_url(&page).unwrap().as_str(),
            "https://docs.example.com/robots.txt"
        );
    }
}
