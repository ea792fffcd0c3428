//! Spindex: a concurrent crawl-and-search engine
//!
//! This crate crawls a web (or local text) corpus, builds a positional
//! inverted index over it, and serves ranked exact and partial (prefix)
//! search, all on a fixed-size worker pool.

pub mod builder;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod html;
pub mod index;
pub mod output;
pub mod queue;
pub mod searcher;
pub mod sync;
pub mod text;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for spindex operations
#[derive(Debug, Error)]
pub enum SpindexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid corpus path: {0}")]
    InvalidPath(PathBuf),

    #[error("Invalid query file: {0}")]
    InvalidQueryFile(PathBuf),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

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
}

/// Result type alias for spindex operations
pub type Result<T> = std::result::Result<T, SpindexError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::FetchConfig;
pub use crawler::{PageMetadata, WebCrawler, MAX_URLS_DEFAULT};
pub use index::{InvertedIndex, SearchResult, ThreadSafeInvertedIndex};
pub use queue::WorkQueue;
pub use searcher::{IndexSearcher, Searcher, ThreadedIndexSearcher};
pub use sync::ReadWriteLock;
