//! Recursive concurrent web crawler
//!
//! Each crawl task claims its URL against a shared visited set, fetches and
//! parses the page, builds a private index fragment, merges it into the
//! shared index under one lock acquisition, and submits a new task per
//! extracted link into the same pool it runs on. The claim is the only
//! deduplication point: over-submitting links is cheap, and duplicate URLs
//! no-op when they fail to claim.

use crate::fetch;
use crate::html;
use crate::index::{InvertedIndex, SearchResult, ThreadSafeInvertedIndex};
use crate::queue::{TaskHandle, WorkQueue};
use crate::text::{self, StemFn};
use crate::{FetchConfig, Result, SpindexError};
use chrono::Utc;
use reqwest::blocking::Client;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use url::Url;

/// Default maximum number of pages to crawl.
pub const MAX_URLS_DEFAULT: usize = 1;

/// Metadata recorded once per successfully fetched page, never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub title: String,

    /// RFC 3339 UTC timestamp of when the page was crawled.
    pub timestamp: String,

    pub description: String,
}

type MetadataMap = Arc<Mutex<BTreeMap<String, PageMetadata>>>;

/// Crawls pages recursively, feeding a shared thread-safe index.
///
/// One `WebCrawler` serves one crawl invocation; concurrent crawls in the
/// same process each need their own crawler, index, and queue.
pub struct WebCrawler {
    client: Client,
    max_redirects: usize,
    stem: StemFn,
    metadata: MetadataMap,
}

/// State shared by every task of one crawl.
struct CrawlContext {
    client: Client,
    max_redirects: usize,
    max_urls: usize,
    stem: StemFn,
    visited: Mutex<HashSet<String>>,
    metadata: MetadataMap,
    index: Arc<ThreadSafeInvertedIndex>,
}

impl WebCrawler {
    /// Creates a crawler with the given fetch settings and no stemming.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::with_stem(config, text::identity_stem)
    }

    /// Creates a crawler that normalizes every indexed word with `stem`.
    pub fn with_stem(config: &FetchConfig, stem: StemFn) -> Result<Self> {
        Ok(Self {
            client: fetch::build_http_client(config)?,
            max_redirects: config.max_redirects,
            stem,
            metadata: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Starts a crawl from `seed`, claiming at most `max_urls` pages.
    ///
    /// Submits the first task and returns immediately; the caller drains
    /// the queue (`queue.finish()`) before querying or serializing the
    /// index. The cap binds claims, not submissions: link tasks may be
    /// over-submitted without bound, but the claim's single critical
    /// section means at most `max_urls` pages are ever claimed and indexed.
    pub fn crawl(
        &self,
        seed: &str,
        max_urls: usize,
        index: &Arc<ThreadSafeInvertedIndex>,
        queue: &WorkQueue,
    ) -> Result<()> {
        // A seed that cannot parse is a configuration error, not a
        // silently skipped page.
        Url::parse(seed).map_err(|_| SpindexError::InvalidSeed(seed.to_string()))?;

        let context = Arc::new(CrawlContext {
            client: self.client.clone(),
            max_redirects: self.max_redirects,
            max_urls,
            stem: self.stem,
            visited: Mutex::new(HashSet::new()),
            metadata: Arc::clone(&self.metadata),
            index: Arc::clone(index),
        });

        let handle = queue.handle();
        let seed = seed.to_string();
        let task_handle = handle.clone();
        handle.execute(move || crawl_task(context, seed, task_handle));
        Ok(())
    }

    /// Returns the recorded metadata for a crawled URL, or an empty
    /// default if the URL was never indexed.
    pub fn metadata(&self, url: &str) -> PageMetadata {
        self.metadata
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a snapshot of all recorded page metadata, sorted by URL.
    pub fn all_metadata(&self) -> BTreeMap<String, PageMetadata> {
        self.metadata.lock().unwrap().clone()
    }

    /// Copies page metadata onto search results for locations this crawl
    /// indexed. Ranking inputs are unaffected; this only enriches output.
    pub fn attach(&self, results: &mut [SearchResult]) {
        let metadata = self.metadata.lock().unwrap();
        for result in results {
            result.metadata = Some(
                metadata
                    .get(&result.location)
                    .cloned()
                    .unwrap_or_default(),
            );
        }
    }
}

/// One crawl task: claim, fetch, parse, index, resubmit.
fn crawl_task(context: Arc<CrawlContext>, url: String, handle: TaskHandle) {
    // Claim: membership test, cap check, and insert in one critical
    // section, so the page cap holds exactly at claim time.
    {
        let mut visited = context.visited.lock().unwrap();
        if visited.contains(&url) || visited.len() >= context.max_urls {
            return;
        }
        visited.insert(url.clone());
    }

    let Some(html) = fetch::fetch(&context.client, &url, context.max_redirects) else {
        tracing::debug!("Skipping {} (no HTML content)", url);
        return;
    };

    let base = match Url::parse(&url) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!("Claimed URL {} failed to parse: {}", url, e);
            return;
        }
    };

    let page = html::parse_page(&html, &base);

    // Everything below the claim runs on task-private state until the
    // single merge at the end.
    let mut local = InvertedIndex::new();
    local.add_words(text::stems_with(&page.text, context.stem), &url);

    let metadata = PageMetadata {
        title: page.title.unwrap_or_default(),
        timestamp: Utc::now().to_rfc3339(),
        description: page.description.unwrap_or_default(),
    };

    context.index.add_all(local);
    context.metadata.lock().unwrap().insert(url.clone(), metadata);

    tracing::debug!("Indexed {} ({} outbound links)", url, page.links.len());

    // Duplicates are filtered at claim time, not here; submitting an
    // already-visited link is a harmless no-op.
    for link in page.links {
        let context = Arc::clone(&context);
        let task_handle = handle.clone();
        handle.execute(move || crawl_task(context, link, task_handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_default_for_unknown_url() {
        let crawler = WebCrawler::new(&FetchConfig::default()).unwrap();
        assert_eq!(crawler.metadata("https://unknown.example/"), PageMetadata::default());
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let crawler = WebCrawler::new(&FetchConfig::default()).unwrap();
        let index = Arc::new(ThreadSafeInvertedIndex::new());
        let queue = WorkQueue::with_threads(1);

        let result = crawler.crawl("not a url", 3, &index, &queue);
        assert!(matches!(result, Err(SpindexError::InvalidSeed(_))));

        queue.join();
    }

    #[test]
    fn test_attach_fills_missing_metadata_with_default() {
        let crawler = WebCrawler::new(&FetchConfig::default()).unwrap();
        let mut results = vec![SearchResult::new("https://never-crawled.example/")];
        crawler.attach(&mut results);
        assert_eq!(results[0].metadata, Some(PageMetadata::default()));
    }

    // Live crawl behavior (page cap, redirects, self-loops) is covered
    // against a mock server in tests/crawl_tests.rs.
}
