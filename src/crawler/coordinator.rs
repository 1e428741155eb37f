//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading or creating the crawl state and seeding the frontier
//! - Robots.txt policy, politeness delays and fetching with retry
//! - Extraction, indexing and link discovery
//! - Health tracking, periodic checkpoints and graceful shutdown

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchOutcome};
use crate::crawler::parser::discover_links;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::ShutdownSignal;
use crate::extract::{extract_document, ExtractedContent};
use crate::index::{DocumentInput, Indexer};
use crate::robots::{fetch_robots, ParsedRobots, RobotsCache};
use crate::state::{CrawlState, CrawlStats, FrontierEntry, HealthMonitor, StateStore};
use crate::url::{extract_domain, normalize_url, UrlPolicy};
use crate::CurioError;
use chrono::Utc;
use reqwest::Client;
use scraper::Html;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Progress is logged every this many processed URLs
const PROGRESS_EVERY: u64 = 10;

/// Lifecycle of a [`Crawler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl CrawlStatus {
    fn can_become(self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (CrawlStatus::Idle, CrawlStatus::Running)
                | (CrawlStatus::Running, CrawlStatus::Stopping)
                | (CrawlStatus::Stopping, CrawlStatus::Stopped)
        )
    }
}

/// Why a crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    FrontierExhausted,
    DocumentCap(u64),
    Unhealthy(String),
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FrontierExhausted => write!(f, "frontier exhausted"),
            StopReason::DocumentCap(cap) => write!(f, "document cap reached ({})", cap),
            StopReason::Unhealthy(reason) => write!(f, "unhealthy: {}", reason),
            StopReason::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Summary returned by [`Crawler::crawl`]
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub reason: StopReason,
    pub duration: Duration,
    /// Documents indexed during this run
    pub documents_indexed: u64,
    /// Page fetches made during this run
    pub requests_made: u64,
    /// Errors during this run
    pub errors: u64,
    /// Counters accumulated over every run of this crawl
    pub stats: CrawlStats,
}

enum Step {
    Continue,
    Interrupted,
}

/// Main crawler structure
pub struct Crawler {
    config: Config,
    store: Box<dyn StateStore>,
    indexer: Indexer,
    shutdown: ShutdownSignal,
    state: CrawlState,
    status: CrawlStatus,
    policy: UrlPolicy,
    client: Client,
    robots: Arc<RobotsCache>,
    limiter: RateLimiter,
    health: HealthMonitor,
    robots_agent: String,
    docs_since_checkpoint: u64,
    last_checkpoint: Instant,
    processed: u64,
}

impl Crawler {
    /// Creates a crawler, resuming whatever state `store` holds
    ///
    /// Seeds from the configuration are queued at depth 0 unless they were
    /// already seen by an earlier run.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to [`crawl`](Crawler::crawl)
    /// * `Err(CurioError)` - The state could not be read or the HTTP client
    ///   could not be built
    pub fn new(
        config: Config,
        store: Box<dyn StateStore>,
        indexer: Indexer,
        shutdown: ShutdownSignal,
    ) -> Result<Self, CurioError> {
        let mut state = match store.load()? {
            Some(state) => {
                info!(
                    "Resuming crawl started {} ({} queued, {} indexed)",
                    state.created_at,
                    state.queue.len(),
                    state.stats.documents_indexed
                );
                state
            }
            None => {
                info!("No previous crawl state, starting a new crawl");
                CrawlState::new(None)
            }
        };

        let policy = UrlPolicy::new(config.whitelist(), config.crawler.allow_private_hosts);

        let mut seeded = 0;
        for site in &config.sites {
            for seed in &site.seeds {
                match policy.admit(seed) {
                    Ok(url) => {
                        if state.enqueue(url.as_str(), 0) {
                            seeded += 1;
                        }
                    }
                    Err(rejection) => warn!("Ignoring seed {}: {:?}", seed, rejection),
                }
            }
        }
        if seeded > 0 {
            info!("Queued {} seed URLs", seeded);
        }

        let client = build_http_client(&config, policy.clone())?;
        let robots = Arc::new(RobotsCache::from_snapshot(state.robots_cache.clone()));
        let robots_agent = config.user_agent.crawler_name.clone();
        let limiter = RateLimiter::new(config.crawler.min_delay(), Arc::clone(&robots), &robots_agent);

        Ok(Self {
            config,
            store,
            indexer,
            shutdown,
            state,
            status: CrawlStatus::Idle,
            policy,
            client,
            robots,
            limiter,
            health: HealthMonitor::new(),
            robots_agent,
            docs_since_checkpoint: 0,
            last_checkpoint: Instant::now(),
            processed: 0,
        })
    }

    /// Records the hash of the configuration file driving this run
    ///
    /// A resumed crawl whose configuration changed is logged, not refused.
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        if let Some(previous) = &self.state.config_hash {
            if *previous != hash {
                warn!(
                    "Configuration changed since this crawl started ({} -> {})",
                    previous, hash
                );
            }
        }
        self.state.config_hash = Some(hash);
        self
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn into_indexer(self) -> Indexer {
        self.indexer
    }

    fn transition(&mut self, next: CrawlStatus) -> Result<(), CurioError> {
        if !self.status.can_become(next) {
            return Err(CurioError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        debug!("Crawler {:?} -> {:?}", self.status, next);
        self.status = next;
        Ok(())
    }

    /// Runs the crawl until a stop condition is met
    ///
    /// Whatever ends the loop, a final checkpoint is attempted before the
    /// crawler reaches [`CrawlStatus::Stopped`].
    pub async fn crawl(&mut self) -> Result<CrawlReport, CurioError> {
        self.transition(CrawlStatus::Running)?;

        let started = Instant::now();
        let baseline = self.state.stats.clone();
        info!(
            "Starting crawl: {} queued, {} documents indexed so far",
            self.state.queue.len(),
            baseline.documents_indexed
        );

        let reason = self.run_loop().await;

        self.transition(CrawlStatus::Stopping)?;
        info!("Stopping crawl: {}", reason);
        if let Err(e) = self.checkpoint() {
            error!("Final checkpoint failed: {}", e);
        }
        self.transition(CrawlStatus::Stopped)?;

        let stats = self.state.stats.clone();
        let report = CrawlReport {
            reason,
            duration: started.elapsed(),
            documents_indexed: stats.documents_indexed - baseline.documents_indexed,
            requests_made: stats.requests_made - baseline.requests_made,
            errors: stats.errors - baseline.errors,
            stats,
        };

        info!(
            "Crawl finished ({}) in {:.1?}: {} documents indexed, {} requests, {} errors, {} still queued",
            report.reason,
            report.duration,
            report.documents_indexed,
            report.requests_made,
            report.errors,
            self.state.queue.len()
        );

        Ok(report)
    }

    async fn run_loop(&mut self) -> StopReason {
        loop {
            if self.shutdown.is_triggered() {
                return StopReason::Shutdown;
            }

            if let Some(cap) = self.config.crawler.document_cap() {
                if self.state.stats.documents_indexed >= cap {
                    return StopReason::DocumentCap(cap);
                }
            }

            let Some(entry) = self.state.pop_front() else {
                return StopReason::FrontierExhausted;
            };

            if let Step::Interrupted = self.process_entry(entry).await {
                return StopReason::Shutdown;
            }

            self.processed += 1;
            if self.processed % PROGRESS_EVERY == 0 {
                info!(
                    "Progress: {} URLs processed, {} indexed, {} queued",
                    self.processed,
                    self.state.stats.documents_indexed,
                    self.state.queue.len()
                );
            }

            self.maybe_checkpoint();

            if let Some(reason) = self.health.check() {
                return StopReason::Unhealthy(reason);
            }
        }
    }

    /// Processes a single frontier entry
    ///
    /// This method:
    /// 1. Fetches or reuses robots.txt for the host
    /// 2. Waits for the host's politeness slot
    /// 3. Checks robots.txt rules
    /// 4. Fetches the page
    /// 5. Indexes its content and queues its links
    async fn process_entry(&mut self, entry: FrontierEntry) -> Step {
        let url = match Url::parse(&entry.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Dropping unparseable frontier URL {}: {}", entry.url, e);
                self.state.stats.rejected += 1;
                self.health.record_failure("invalid_url");
                return Step::Continue;
            }
        };
        let Some(host) = url.host_str().map(str::to_string) else {
            warn!("Dropping frontier URL without a host: {}", entry.url);
            self.state.stats.rejected += 1;
            self.health.record_failure("invalid_url");
            return Step::Continue;
        };
        debug!("Processing {} (depth {})", url, entry.depth);

        let respect_robots = self.config.crawler.respect_robots;
        let robots = if respect_robots {
            match robots_for(&self.client, &self.robots, &self.limiter, &self.shutdown, &url, &host).await {
                Some(robots) => Some(robots),
                None => {
                    self.state.push_front(entry);
                    return Step::Interrupted;
                }
            }
        } else {
            None
        };

        if polite_wait(&self.limiter, &self.shutdown, &host).await {
            debug!("Shutdown while waiting for {}, requeueing", url);
            self.state.push_front(entry);
            return Step::Interrupted;
        }

        if let Some(robots) = &robots {
            if !robots.is_allowed(url.as_str(), &self.robots_agent) {
                debug!("{} disallowed by robots.txt", url);
                self.state.stats.robots_blocked += 1;
                return Step::Continue;
            }
        }

        self.state.stats.requests_made += 1;
        match fetch_page(&self.client, &url, &self.config.crawler).await {
            Ok(FetchOutcome::Html { final_url, body }) => {
                self.health.record_success();
                let final_url = normalize_url(final_url.as_str()).unwrap_or(final_url);

                if respect_robots && final_url != url {
                    let Some(host) = final_url.host_str() else {
                        return Step::Continue;
                    };
                    let Some(target_robots) = robots_for(
                        &self.client,
                        &self.robots,
                        &self.limiter,
                        &self.shutdown,
                        &final_url,
                        host,
                    )
                    .await
                    else {
                        self.state.push_front(entry);
                        return Step::Interrupted;
                    };
                    if !target_robots.is_allowed(final_url.as_str(), &self.robots_agent) {
                        debug!("{} redirected to {}, disallowed by robots.txt", url, final_url);
                        self.state.stats.robots_blocked += 1;
                        self.mark_seen(&final_url);
                        return Step::Continue;
                    }
                }

                self.handle_page(&url, final_url, &body, entry.depth);
            }
            Ok(FetchOutcome::NotHtml {
                final_url,
                content_type,
            }) => {
                self.health.record_success();
                debug!("Skipping {}: not HTML ({})", final_url, content_type);
                self.state.stats.skipped += 1;
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                self.health.record_failure(&e.kind());
                self.state.stats.record_error(&host);
                self.state.record_failure(url.as_str(), e.to_string());
            }
        }

        Step::Continue
    }

    fn mark_seen(&mut self, url: &Url) {
        self.state.seen.entry(url.to_string()).or_insert_with(Utc::now);
    }

    /// Indexes a fetched page and queues its links
    ///
    /// `final_url` is already normalized.
    fn handle_page(&mut self, requested: &Url, final_url: Url, body: &str, depth: u32) {
        if final_url != *requested {
            debug!("{} redirected to {}", requested, final_url);
            self.mark_seen(&final_url);
        }

        let (page, links) = process_html(body, &final_url, &self.config);
        let domain = extract_domain(&final_url).unwrap_or_default();

        for issue in &page.issues {
            debug!("{}: {} ({})", final_url, issue.code, issue.message);
        }

        match self
            .indexer
            .add_document(DocumentInput::from_extracted(final_url.as_str(), depth, page))
        {
            Ok(()) => {
                debug!("Indexed {}", final_url);
                self.state.stats.record_indexed(&domain, depth);
                self.docs_since_checkpoint += 1;
            }
            Err(e) => {
                warn!("Failed to index {}: {}", final_url, e);
                self.state.stats.record_error(&domain);
                self.state.record_failure(final_url.as_str(), e.to_string());
            }
        }

        if depth >= self.config.crawler.max_depth {
            return;
        }

        let mut queued = 0;
        for link in links {
            match self.policy.admit(&link) {
                Ok(url) => {
                    if self.state.enqueue(url.as_str(), depth + 1) {
                        queued += 1;
                    }
                }
                Err(rejection) => {
                    debug!("Rejected {}: {:?}", link, rejection);
                    self.state.stats.rejected += 1;
                }
            }
        }
        debug!("Queued {} new links from {}", queued, final_url);
    }

    fn maybe_checkpoint(&mut self) {
        let every = self.config.checkpoint.every_documents;
        let due_by_count = every > 0 && self.docs_since_checkpoint >= every;
        let due_by_time = self.last_checkpoint.elapsed() >= self.config.checkpoint.interval();

        if due_by_count || due_by_time {
            if let Err(e) = self.checkpoint() {
                error!("Checkpoint failed, will retry at the next one: {}", e);
            }
        }
    }

    /// Persists crawl state, then the index
    ///
    /// Both writes are attempted even if the first fails; the first error is
    /// returned.
    pub fn checkpoint(&mut self) -> Result<(), CurioError> {
        let evicted = self.state.truncate_seen(self.config.checkpoint.max_seen);
        if evicted > 0 {
            debug!("Evicted {} entries from the seen set", evicted);
        }

        let now = Utc::now();
        self.state.robots_cache = self.robots.snapshot();
        self.state.updated_at = now;
        self.state.last_checkpoint = Some(now);

        let state_result = self.store.save(&self.state);
        let index_result = self.indexer.save();

        self.docs_since_checkpoint = 0;
        self.last_checkpoint = Instant::now();

        if let (Err(_), Err(e)) = (&state_result, &index_result) {
            error!("Saving the index failed as well: {}", e);
        }
        state_result?;
        index_result?;

        info!(
            "Checkpoint: {} documents indexed, {} queued, {} seen",
            self.state.stats.documents_indexed,
            self.state.queue.len(),
            self.state.seen.len()
        );
        Ok(())
    }
}

/// Returns the cached policy for `host`, fetching it when missing or stale
///
/// The robots.txt request takes its turn in the host's politeness schedule.
/// `None` means shutdown was requested while waiting for that turn.
async fn robots_for(
    client: &Client,
    cache: &RobotsCache,
    limiter: &RateLimiter,
    shutdown: &ShutdownSignal,
    url: &Url,
    host: &str,
) -> Option<ParsedRobots> {
    if let Some(robots) = cache.get(host) {
        return Some(robots);
    }
    if polite_wait(limiter, shutdown, host).await {
        return None;
    }
    let robots = fetch_robots(client, url).await;
    cache.insert(host, &robots);
    Some(robots)
}

/// Waits for the host's next slot; returns true if shutdown cut the wait short
async fn polite_wait(limiter: &RateLimiter, shutdown: &ShutdownSignal, host: &str) -> bool {
    tokio::select! {
        _ = limiter.wait_for_slot(host) => false,
        _ = shutdown.triggered() => true,
    }
}

/// Parses the page once for both extraction and link discovery
fn process_html(body: &str, url: &Url, config: &Config) -> (ExtractedContent, Vec<String>) {
    let document = Html::parse_document(body);
    let page = extract_document(&document, url, &config.extraction);
    let links = discover_links(&document, url);
    (page, links)
}
