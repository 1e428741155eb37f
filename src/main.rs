//! Curio main entry point
//!
//! This is the command-line interface for the Curio crawler and search index.

use anyhow::Context;
use clap::Parser;
use curio::config::{load_config_with_hash, Config};
use curio::crawler::{install_signal_handlers, run_crawl, ShutdownSignal, StopReason};
use curio::index::{IndexPaths, Indexer, SearchOptions};
use curio::state::{FileStateStore, StateStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Curio: a curated-domain crawler with a full-text search index
///
/// Curio crawls a whitelist of sites while respecting robots.txt and
/// per-host delays, extracts readable text from every page and keeps it
/// searchable. Interrupted crawls resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "curio")]
#[command(version)]
#[command(about = "A curated-domain crawler and search index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding previous state and index
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "search"])]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "search"])]
    dry_run: bool,

    /// Show index and crawl statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "search"])]
    stats: bool,

    /// Search the index and exit
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Maximum number of search results
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Number of search results to skip
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Only return results from this domain
    #[arg(long, requires = "search")]
    domain: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(query) = &cli.search {
        let mut options = SearchOptions::default()
            .with_limit(cli.limit)
            .with_offset(cli.offset);
        if let Some(domain) = &cli.domain {
            options = options.with_domain(domain.clone());
        }
        handle_search(&config, query, &options);
    } else {
        handle_crawl(config, config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("curio=info,warn"),
            1 => EnvFilter::new("curio=debug,info"),
            2 => EnvFilter::new("curio=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_index(config: &Config) -> Indexer {
    Indexer::open(IndexPaths::new(
        &config.storage.index_path,
        &config.storage.documents_path,
    ))
    .with_excerpt_length(config.extraction.excerpt_length)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Curio Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    match config.crawler.document_cap() {
        Some(cap) => println!("  Max documents: {}", cap),
        None => println!("  Max documents: unlimited"),
    }
    println!("  Min delay per host: {}ms", config.crawler.min_delay_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!(
        "  Retries: {} (base delay {}ms)",
        config.crawler.max_retries, config.crawler.retry_base_delay_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent_string());

    println!("\nStorage:");
    println!("  State: {}", config.storage.state_path.display());
    println!("  Index: {}", config.storage.index_path.display());
    println!("  Documents: {}", config.storage.documents_path.display());

    println!("\nSites ({}):", config.sites.len());
    for entry in &config.sites {
        println!("  - {} ({} seeds)", entry.domain, entry.seeds.len());
        for seed in &entry.seeds {
            println!("    * {}", seed);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.sites.iter().map(|s| s.seeds.len()).sum::<usize>()
    );
}

/// Handles the --stats mode: shows index and crawl statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let indexer = open_index(config);
    let stats = indexer.get_stats();

    println!("=== Index ===\n");
    println!("Documents: {}", stats.documents);
    println!("Domains: {}", stats.domains);
    if let (Some(oldest), Some(newest)) = (stats.oldest_crawl, stats.newest_crawl) {
        println!("Crawled: {} .. {}", oldest.to_rfc3339(), newest.to_rfc3339());
    }
    for domain in &stats.per_domain {
        println!("  {:>8}  {}", domain.documents, domain.domain);
    }

    let store = FileStateStore::new(&config.storage.state_path);
    match store.load().context("failed to read crawl state")? {
        Some(state) => {
            let s = &state.stats;
            println!("\n=== Crawl ===\n");
            println!("Started: {}", state.created_at.to_rfc3339());
            println!("Updated: {}", state.updated_at.to_rfc3339());
            println!("Queued: {}", state.queue.len());
            println!("Seen: {}", state.seen.len());
            println!("Failed URLs: {}", state.failed.len());
            println!("Documents indexed: {}", s.documents_indexed);
            println!("Requests made: {}", s.requests_made);
            println!("Errors: {}", s.errors);
            println!("Robots blocked: {}", s.robots_blocked);
            println!("Rejected links: {}", s.rejected);
            println!("Skipped (non-HTML): {}", s.skipped);
            println!("Max depth reached: {}", s.max_depth_reached);
        }
        None => println!("\nNo crawl state found"),
    }

    Ok(())
}

/// Handles the --search mode: prints ranked results
fn handle_search(config: &Config, query: &str, options: &SearchOptions) {
    let indexer = open_index(config);
    let response = indexer.search(query, options);

    println!(
        "{} results for \"{}\" (showing {}-{})\n",
        response.total,
        query,
        if response.results.is_empty() { 0 } else { options.offset + 1 },
        options.offset + response.results.len()
    );

    for hit in &response.results {
        println!("{:.3}  {}", hit.score, hit.title);
        println!("       {}", hit.url);
        if !hit.snippet.is_empty() {
            println!("       {}", hit.snippet);
        }
        println!();
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if previous state exists)");
    }

    let seed_count: usize = config.sites.iter().map(|s| s.seeds.len()).sum();
    tracing::info!("Sites: {}, seed URLs: {}", config.sites.len(), seed_count);

    let shutdown = ShutdownSignal::new();
    install_signal_handlers(shutdown.clone());

    let report = run_crawl(config, Some(config_hash), fresh, shutdown)
        .await
        .context("crawl failed")?;

    if let StopReason::Unhealthy(reason) = &report.reason {
        anyhow::bail!("crawl stopped because it became unhealthy: {}", reason);
    }

    Ok(())
}
