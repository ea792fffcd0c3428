//! Spindex main entry point
//!
//! Command-line driver for building a positional inverted index from local
//! text files or a web crawl, running search queries against it, and
//! writing the results as JSON.

use clap::Parser;
use spindex::builder;
use spindex::config::load_config;
use spindex::index::InvertedIndex;
use spindex::output;
use spindex::queue::{WorkQueue, DEFAULT_THREADS};
use spindex::searcher::{IndexSearcher, Searcher, ThreadedIndexSearcher};
use spindex::{FetchConfig, ThreadSafeInvertedIndex, WebCrawler, MAX_URLS_DEFAULT};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Spindex: a positional inverted index and search engine
///
/// Spindex indexes local text files or crawled web pages into a positional
/// inverted index, answers exact and prefix queries ranked by relevance,
/// and writes the index, word counts, and search results as JSON.
#[derive(Parser, Debug)]
#[command(name = "spindex")]
#[command(version = "1.0.0")]
#[command(about = "A positional inverted index and search engine", long_about = None)]
struct Cli {
    /// Text file or directory to index (directories walked recursively)
    #[arg(long, value_name = "PATH")]
    text: Option<PathBuf>,

    /// Seed URL to crawl and index
    #[arg(long, value_name = "URL")]
    html: Option<String>,

    /// Maximum number of pages to crawl
    #[arg(long, value_name = "TOTAL", default_value_t = MAX_URLS_DEFAULT)]
    max_urls: usize,

    /// Number of worker threads (enables concurrent indexing and search)
    #[arg(long, value_name = "THREADS", num_args = 0..=1, default_missing_value = "5")]
    threads: Option<usize>,

    /// Query file with one search per line
    #[arg(long, value_name = "PATH")]
    query: Option<PathBuf>,

    /// Use exact search instead of prefix search
    #[arg(long)]
    exact: bool,

    /// Write the inverted index as JSON
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,

    /// Write per-location word counts as JSON
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "counts.json")]
    counts: Option<PathBuf>,

    /// Write search results as JSON
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,

    /// Write crawled page metadata as JSON
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "metadata.json")]
    metadata: Option<PathBuf>,

    /// Path to TOML configuration file for fetch settings
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => FetchConfig::default(),
    };

    // A crawl always runs on the queue; --threads opts local indexing and
    // searching into it as well.
    if cli.threads.is_some() || cli.html.is_some() {
        run_threaded(&cli, &config)
    } else {
        run_single(&cli)
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spindex=info,warn"),
            1 => EnvFilter::new("spindex=debug,info"),
            2 => EnvFilter::new("spindex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds, searches, and writes output on the calling thread.
fn run_single(cli: &Cli) -> anyhow::Result<()> {
    let mut index = InvertedIndex::new();

    if let Some(text) = &cli.text {
        tracing::info!("Indexing files under: {}", text.display());
        if let Err(e) = builder::build(text, &mut index) {
            tracing::error!("Unable to index {}: {}", text.display(), e);
        }
    }

    let mut searcher = IndexSearcher::new(&index);
    if let Some(query) = &cli.query {
        tracing::info!("Searching queries from: {}", query.display());
        if let Err(e) = searcher.search_file(query, cli.exact) {
            tracing::error!("Unable to search {}: {}", query.display(), e);
        }
    }

    if let Some(path) = &cli.results {
        output::write_json(&output::results_to_value(&searcher.results_map()), path)?;
    }
    write_index_output(&index, cli)?;
    Ok(())
}

/// Builds, searches, and writes output with a worker pool, crawling first
/// if a seed URL was given.
fn run_threaded(cli: &Cli, config: &FetchConfig) -> anyhow::Result<()> {
    let threads = cli.threads.unwrap_or(DEFAULT_THREADS);
    let queue = WorkQueue::with_threads(threads);
    let index = Arc::new(ThreadSafeInvertedIndex::new());
    let mut crawler = None;

    if let Some(seed) = &cli.html {
        tracing::info!("Crawling up to {} pages from: {}", cli.max_urls, seed);
        let web_crawler = WebCrawler::new(config)?;
        web_crawler.crawl(seed, cli.max_urls, &index, &queue)?;
        crawler = Some(web_crawler);
    }

    if let Some(text) = &cli.text {
        tracing::info!("Indexing files under: {}", text.display());
        if let Err(e) = builder::build_concurrent(text, &index, &queue) {
            tracing::error!("Unable to index {}: {}", text.display(), e);
        }
    }

    // The index must be complete before any query task runs.
    queue.finish();

    let mut searcher = ThreadedIndexSearcher::new(&index, &queue);
    if let Some(query) = &cli.query {
        tracing::info!("Searching queries from: {}", query.display());
        if let Err(e) = searcher.search_file(query, cli.exact) {
            tracing::error!("Unable to search {}: {}", query.display(), e);
        }
    }
    queue.finish();

    for failure in queue.take_failures() {
        tracing::error!("Worker task failed: {}", failure);
    }

    if let Some(path) = &cli.results {
        let mut results = searcher.results_map();
        if let Some(crawler) = &crawler {
            for found in results.values_mut() {
                crawler.attach(found);
            }
        }
        output::write_json(&output::results_to_value(&results), path)?;
    }

    if let (Some(path), Some(crawler)) = (&cli.metadata, &crawler) {
        output::write_json(&output::metadata_to_value(&crawler.all_metadata()), path)?;
    }

    drop(searcher);
    queue.join();

    let index = Arc::try_unwrap(index)
        .map_err(|_| anyhow::anyhow!("index still shared after queue shutdown"))?
        .into_inner();
    write_index_output(&index, cli)?;
    Ok(())
}

/// Writes the index and word-count JSON files if requested.
fn write_index_output(index: &InvertedIndex, cli: &Cli) -> anyhow::Result<()> {
    if let Some(path) = &cli.index {
        tracing::info!("Writing index to: {}", path.display());
        output::write_json(&output::index_to_value(index), path)?;
    }
    if let Some(path) = &cli.counts {
        output::write_json(&output::counts_to_value(index), path)?;
    }
    Ok(())
}
