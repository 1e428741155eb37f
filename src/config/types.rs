use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Curio
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

impl Config {
    /// Returns the whitelisted domains, in configuration order
    pub fn whitelist(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.domain.to_lowercase()).collect()
    }

    /// Formats the user agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.user_agent.crawler_name,
            self.user_agent.crawler_version,
            self.user_agent.contact_url,
            self.user_agent.contact_email
        )
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum link depth from a seed URL
    pub max_depth: u32,

    /// Stop after this many documents are indexed (0 means unlimited)
    pub max_documents: u64,

    /// Minimum time between requests to the same host (milliseconds)
    pub min_delay_ms: u64,

    /// Whether robots.txt disallow rules are enforced
    pub respect_robots: bool,

    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,

    /// Base of the exponential backoff schedule (milliseconds)
    pub retry_base_delay_ms: u64,

    /// Upper bound for a server-supplied Retry-After (seconds)
    pub max_retry_after_secs: u64,

    /// Whole-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Allow loopback and private network targets (test servers only)
    pub allow_private_hosts: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_documents: 0,
            min_delay_ms: 1000,
            respect_robots: true,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            max_retry_after_secs: 120,
            request_timeout_secs: 30,
            allow_private_hosts: false,
        }
    }
}

impl CrawlerConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Returns the document cap, if any
    pub fn document_cap(&self) -> Option<u64> {
        (self.max_documents > 0).then_some(self.max_documents)
    }
}

/// When crawl state and index are written to disk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CheckpointConfig {
    /// Checkpoint after this many newly indexed documents
    pub every_documents: u64,

    /// Checkpoint at least this often (minutes)
    pub interval_minutes: u64,

    /// Seen-set entries kept after a checkpoint
    pub max_seen: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            every_documents: 25,
            interval_minutes: 5,
            max_seen: 100_000,
        }
    }
}

impl CheckpointConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// Content extraction limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionConfig {
    /// Maximum stored content length (characters, including the ellipsis)
    pub max_content_length: usize,

    /// Target excerpt length (characters, excluding the ellipsis)
    pub excerpt_length: usize,

    /// Content shorter than this is flagged `content_too_short`
    pub min_content_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_content_length: 50_000,
            excerpt_length: 200,
            min_content_length: 200,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// On-disk locations of the crawl state and the search index
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Crawl state JSON file
    pub state_path: PathBuf,

    /// Serialized ranked index
    pub index_path: PathBuf,

    /// Document array backing the index
    pub documents_path: PathBuf,
}

/// A whitelisted site with its seed URLs
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Domain (subdomains are included)
    pub domain: String,

    /// URLs to start crawling from
    #[serde(default)]
    pub seeds: Vec<String>,
}
