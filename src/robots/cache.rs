//! Robots.txt caching implementation
//!
//! Policies are cached per host with a 24 hour TTL. The cache is shared
//! between the coordinator (which fills it) and the rate limiter (which reads
//! crawl-delay from it), and it round-trips through the persisted crawl state.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Cached robots.txt data for a host
///
/// Stores the raw robots.txt body along with the timestamp when it was
/// fetched, allowing for cache expiration checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRobots {
    /// Raw robots.txt content; empty means no restrictions
    pub content: String,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots stamped with the current time
    pub fn new(robots: &ParsedRobots) -> Self {
        Self {
            content: robots.content().to_string(),
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is stale (older than 24 hours)
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    /// Returns the age of the cached robots.txt
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// Returns the parsed policy
    pub fn robots(&self) -> ParsedRobots {
        ParsedRobots::from_content(&self.content)
    }
}

/// Thread-safe per-host robots policy cache
///
/// Each host entry is independent; lock scopes never span an await point.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: RwLock<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates a cache from a persisted snapshot, dropping stale entries
    pub fn from_snapshot(snapshot: HashMap<String, CachedRobots>) -> Self {
        let entries = snapshot
            .into_iter()
            .filter(|(_, cached)| !cached.is_stale())
            .collect();

        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a fresh policy for the host, or `None` if missing or stale
    pub fn get(&self, host: &str) -> Option<ParsedRobots> {
        let entries = self.entries.read().ok()?;
        entries
            .get(host)
            .filter(|cached| !cached.is_stale())
            .map(CachedRobots::robots)
    }

    /// Stores a freshly fetched policy for the host
    pub fn insert(&self, host: &str, robots: &ParsedRobots) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(host.to_string(), CachedRobots::new(robots));
        }
    }

    /// Crawl-delay declared for the host, if a fresh policy is cached
    pub fn crawl_delay(&self, host: &str, user_agent: &str) -> Option<f64> {
        self.get(host)?.crawl_delay(user_agent)
    }

    /// Whether the URL is allowed; hosts with no cached policy are allowed
    pub fn is_allowed(&self, host: &str, url: &str, user_agent: &str) -> bool {
        self.get(host)
            .map_or(true, |robots| robots.is_allowed(url, user_agent))
    }

    /// Copies the fresh entries out for persistence
    pub fn snapshot(&self) -> HashMap<String, CachedRobots> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, cached)| !cached.is_stale())
                    .map(|(host, cached)| (host.clone(), cached.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_not_stale() {
        let cache = CachedRobots::new(&ParsedRobots::allow_all());
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_cache_is_stale() {
        let mut cache = CachedRobots::new(&ParsedRobots::allow_all());
        cache.fetched_at = Utc::now() - Duration::hours(25);
        assert!(cache.is_stale());
    }

    #[test]
    fn test_cache_not_stale_at_23_hours() {
        let mut cache = CachedRobots::new(&ParsedRobots::allow_all());
        cache.fetched_at = Utc::now() - Duration::hours(23);
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_age() {
        let mut cache = CachedRobots::new(&ParsedRobots::allow_all());
        cache.fetched_at = Utc::now() - Duration::hours(12);

        let age = cache.age();
        assert!(age.num_hours() >= 11 && age.num_hours() <= 13);
    }

    #[test]
    fn test_get_and_insert() {
        let cache = RobotsCache::new();
        assert!(cache.get("example.com").is_none());

        cache.insert(
            "example.com",
            &ParsedRobots::from_content("User-agent: *\nDisallow: /private\nCrawl-delay: 2"),
        );

        assert!(cache.get("example.com").is_some());
        assert_eq!(cache.crawl_delay("example.com", "TestBot"), Some(2.0));
        assert!(!cache.is_allowed(
            "example.com",
            "https://example.com/private/x",
            "TestBot"
        ));
        assert!(cache.is_allowed("example.com", "https://example.com/public", "TestBot"));
    }

    #[test]
    fn test_unknown_host_is_permissive() {
        let cache = RobotsCache::new();
        assert!(cache.is_allowed("other.org", "https://other.org/", "TestBot"));
        assert_eq!(cache.crawl_delay("other.org", "TestBot"), None);
    }

    #[test]
    fn test_snapshot_drops_stale_entries() {
        let mut snapshot = HashMap::new();
        let fresh = CachedRobots::new(&ParsedRobots::from_content("User-agent: *\nDisallow: /"));
        let mut stale = fresh.clone();
        stale.fetched_at = Utc::now() - Duration::hours(30);
        snapshot.insert("fresh.example.com".to_string(), fresh);
        snapshot.insert("stale.example.com".to_string(), stale);

        let cache = RobotsCache::from_snapshot(snapshot);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh.example.com").is_some());
        assert!(cache.get("stale.example.com").is_none());
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[test]
    fn test_cached_robots_serde_field_names() {
        let cached = CachedRobots::new(&ParsedRobots::from_content("User-agent: *"));
        let json = serde_json::to_value(&cached).unwrap();
        assert!(json.get("content").is_some());
        assert!(json.get("fetchedAt").is_some());
    }
}
