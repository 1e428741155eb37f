use crate::robots::CachedRobots;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Format version written into every state file
pub const STATE_VERSION: u32 = 1;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Last terminal failure recorded for a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEntry {
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainStats {
    pub indexed: u64,
    pub errors: u64,
}

/// Crawl progress counters, persisted across runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlStats {
    pub documents_indexed: u64,
    pub requests_made: u64,
    pub errors: u64,
    pub robots_blocked: u64,
    /// Links dropped by the URL policy
    pub rejected: u64,
    /// Responses that were not HTML
    pub skipped: u64,
    pub max_depth_reached: u32,
    pub domains: BTreeMap<String, DomainStats>,
}

impl CrawlStats {
    pub fn record_indexed(&mut self, domain: &str, depth: u32) {
        self.documents_indexed += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);
        self.domains.entry(domain.to_string()).or_default().indexed += 1;
    }

    pub fn record_error(&mut self, domain: &str) {
        self.errors += 1;
        self.domains.entry(domain.to_string()).or_default().errors += 1;
    }
}

/// Everything needed to resume a crawl
///
/// The frontier, the seen set and the robots cache travel together so a
/// resumed run neither refetches what it already queued nor re-asks hosts
/// for fresh policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlState {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of the config file the run started with
    #[serde(default)]
    pub config_hash: Option<String>,
    pub queue: VecDeque<FrontierEntry>,
    /// URL to first-seen time
    pub seen: HashMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub failed: HashMap<String, FailedEntry>,
    #[serde(default)]
    pub robots_cache: HashMap<String, CachedRobots>,
    #[serde(default)]
    pub stats: CrawlStats,
    #[serde(default)]
    pub last_checkpoint: Option<DateTime<Utc>>,
}

impl CrawlState {
    pub fn new(config_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            version: STATE_VERSION,
            created_at: now,
            updated_at: now,
            config_hash,
            queue: VecDeque::new(),
            seen: HashMap::new(),
            failed: HashMap::new(),
            robots_cache: HashMap::new(),
            stats: CrawlStats::default(),
            last_checkpoint: None,
        }
    }

    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains_key(url)
    }

    /// Queues `url` unless it has been seen before
    ///
    /// Returns `true` when the URL was added.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> bool {
        if self.is_seen(url) {
            return false;
        }
        self.seen.insert(url.to_string(), Utc::now());
        self.queue.push_back(FrontierEntry::new(url, depth));
        true
    }

    pub fn pop_front(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Returns an entry to the head of the frontier
    pub fn push_front(&mut self, entry: FrontierEntry) {
        self.queue.push_front(entry);
    }

    pub fn record_failure(&mut self, url: &str, error: impl Into<String>) {
        let error = error.into();
        let now = Utc::now();
        self.failed
            .entry(url.to_string())
            .and_modify(|entry| {
                entry.error = error.clone();
                entry.attempts += 1;
                entry.failed_at = now;
            })
            .or_insert(FailedEntry {
                error,
                attempts: 1,
                failed_at: now,
            });
    }

    /// Shrinks the seen set to at most `max` entries
    ///
    /// Oldest entries go first. URLs still in the frontier are never evicted,
    /// so the set may stay above `max` when the frontier alone exceeds it.
    /// Returns the number of evicted entries.
    pub fn truncate_seen(&mut self, max: usize) -> usize {
        if self.seen.len() <= max {
            return 0;
        }

        let queued: HashSet<&str> = self.queue.iter().map(|e| e.url.as_str()).collect();
        let mut candidates: Vec<(DateTime<Utc>, String)> = self
            .seen
            .iter()
            .filter(|(url, _)| !queued.contains(url.as_str()))
            .map(|(url, at)| (*at, url.clone()))
            .collect();
        candidates.sort();

        let excess = self.seen.len() - max;
        let mut evicted = 0;
        for (_, url) in candidates.into_iter().take(excess) {
            self.seen.remove(&url);
            evicted += 1;
        }
        evicted
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
