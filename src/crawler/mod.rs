//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML link discovery
//! - Per-host rate limiting
//! - Overall crawl coordination and graceful shutdown

mod coordinator;
mod fetcher;
mod parser;
mod rate_limiter;
mod shutdown;

pub use coordinator::{CrawlReport, CrawlStatus, Crawler, StopReason};
pub use fetcher::{
    backoff_delay, build_http_client, fetch_page, is_html, parse_retry_after, FetchError,
    FetchOutcome, MAX_REDIRECTS,
};
pub use parser::{discover_links, parse_links};
pub use rate_limiter::RateLimiter;
pub use shutdown::{install_signal_handlers, ShutdownSignal, FORCED_EXIT_CODE};

use crate::config::Config;
use crate::index::{IndexPaths, Indexer};
use crate::state::{FileStateStore, StateStore};
use crate::CurioError;

/// Runs a complete crawl against the configured storage paths
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the crawl state file and the index
/// 2. Wipe both first when `fresh` is set
/// 3. Resume or seed the frontier
/// 4. Crawl until the frontier empties, the document cap is hit, the crawl
///    turns unhealthy or `shutdown` fires
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the config file, recorded in the crawl state
/// * `fresh` - Discard previous state and index before starting
/// * `shutdown` - Signal that stops the crawl gracefully
///
/// # Example
///
/// ```no_run
/// use curio::config::load_config_with_hash;
/// use curio::crawler::{run_crawl, ShutdownSignal};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("curio.toml"))?;
/// let report = run_crawl(config, Some(hash), false, ShutdownSignal::new()).await?;
/// println!("{}", report.reason);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    config_hash: Option<String>,
    fresh: bool,
    shutdown: ShutdownSignal,
) -> Result<CrawlReport, CurioError> {
    let store = FileStateStore::new(&config.storage.state_path);
    let mut indexer = Indexer::open(IndexPaths::new(
        &config.storage.index_path,
        &config.storage.documents_path,
    ))
    .with_excerpt_length(config.extraction.excerpt_length);

    if fresh {
        tracing::info!("Discarding previous crawl state and index");
        store.clear()?;
        indexer.clear(true)?;
    }

    let mut crawler = Crawler::new(config, Box::new(store), indexer, shutdown)?;
    if let Some(hash) = config_hash {
        crawler = crawler.with_config_hash(hash);
    }
    crawler.crawl().await
}
