//! URL handling module for Curio
//!
//! This module provides URL normalization, domain extraction, whitelist
//! matching, and the private-network filter that keeps the crawler out of
//! internal infrastructure. All functions are pure and never panic on bad
//! input.

mod domain;
mod matcher;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_blocked_host};
pub use matcher::{is_host_whitelisted, is_url_whitelisted, is_whitelisted, matches_domain};
pub use normalize::normalize_url;

/// Why a discovered URL was refused entry into the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Could not be parsed or normalized
    Invalid,
    /// Literal address inside a private or loopback range
    BlockedHost,
    /// Host is outside the domain whitelist
    NotWhitelisted,
}

/// Crawl admission policy: whitelist plus private-network filter
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    whitelist: Vec<String>,
    allow_private_hosts: bool,
}

impl UrlPolicy {
    pub fn new(whitelist: Vec<String>, allow_private_hosts: bool) -> Self {
        Self {
            whitelist,
            allow_private_hosts,
        }
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    /// Normalizes a URL and checks it against the policy
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The canonical URL, safe to crawl
    /// * `Err(Rejection)` - Why the URL must be skipped
    pub fn admit(&self, raw: &str) -> Result<Url, Rejection> {
        let url = normalize_url(raw).map_err(|_| Rejection::Invalid)?;
        self.check(&url)?;
        Ok(url)
    }

    /// Checks an already canonical URL against the policy
    pub fn check(&self, url: &Url) -> Result<(), Rejection> {
        let host = url.host_str().ok_or(Rejection::Invalid)?;

        if !self.allow_private_hosts && is_blocked_host(host) {
            return Err(Rejection::BlockedHost);
        }

        if !is_host_whitelisted(host, &self.whitelist) {
            return Err(Rejection::NotWhitelisted);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow_private: bool) -> UrlPolicy {
        UrlPolicy::new(
            vec!["example.com".to_string(), "127.0.0.1".to_string()],
            allow_private,
        )
    }

    #[test]
    fn test_admit_canonicalizes() {
        let url = policy(false)
            .admit("https://Docs.Example.com/a/?utm_source=x")
            .unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/a");
    }

    #[test]
    fn test_rejects_invalid() {
        assert_eq!(
            policy(false).admit("mailto:a@example.com"),
            Err(Rejection::Invalid)
        );
    }

    #[test]
    fn test_rejects_off_whitelist() {
        assert_eq!(
            policy(false).admit("https://other.org/"),
            Err(Rejection::NotWhitelisted)
        );
    }

    #[test]
    fn test_blocked_host_even_when_whitelisted() {
        assert_eq!(
            policy(false).admit("http://127.0.0.1:8080/"),
            Err(Rejection::BlockedHost)
        );
    }

    #[test]
    fn test_private_hosts_allowed_when_configured() {
        assert!(policy(true).admit("http://127.0.0.1:8080/").is_ok());
        // The whitelist still applies
        assert_eq!(
            policy(true).admit("http://10.0.0.1/"),
            Err(Rejection::NotWhitelisted)
        );
    }
}
