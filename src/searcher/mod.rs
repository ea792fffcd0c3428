//! Query handling against a built index.
//!
//! A query line is cleaned into a sorted set of unique stems; the set joined
//! with single spaces is the line's cache key, so `"Hello, WORLD"` and
//! `"world hello"` share one cached result list. Blank lines (after
//! cleaning) are skipped entirely.

use crate::index::{InvertedIndex, SearchResult, ThreadSafeInvertedIndex};
use crate::queue::{TaskHandle, WorkQueue};
use crate::sync::ReadWriteLock;
use crate::text::{self, StemFn};
use crate::{Result, SpindexError};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Common interface for single-threaded and queued query processing.
pub trait Searcher {
    /// Searches the index for one query line, caching the ranked results
    /// under the line's normalized key. Repeated lines are not re-searched.
    fn search(&mut self, line: &str, exact: bool);

    /// Returns the cached results for a query line, or an empty list if
    /// the line was never searched.
    fn results(&self, line: &str) -> Vec<SearchResult>;

    /// Returns a snapshot of all cached results, keyed by normalized query.
    fn results_map(&self) -> BTreeMap<String, Vec<SearchResult>>;

    /// Searches every line of a query file.
    fn search_file(&mut self, path: &Path, exact: bool) -> Result<()> {
        let contents = fs::read_to_string(path)
            .map_err(|_| SpindexError::InvalidQueryFile(path.to_path_buf()))?;
        for line in contents.lines() {
            self.search(line, exact);
        }
        Ok(())
    }
}

/// Normalizes a query line to its cache key, or `None` if nothing remains
/// after cleaning. The stem function must match the one the index was
/// built with, or query stems will miss index stems.
fn query_key(line: &str, stem: StemFn) -> Option<String> {
    let stems = text::unique_stems_with(line, stem);
    if stems.is_empty() {
        None
    } else {
        Some(stems.into_iter().collect::<Vec<_>>().join(" "))
    }
}

/// Searches a single-threaded index, caching results per query line.
pub struct IndexSearcher<'a> {
    index: &'a InvertedIndex,
    stem: StemFn,
    results: BTreeMap<String, Vec<SearchResult>>,
}

impl<'a> IndexSearcher<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self::with_stem(index, text::identity_stem)
    }

    /// Creates a searcher that stems query words with `stem`.
    pub fn with_stem(index: &'a InvertedIndex, stem: StemFn) -> Self {
        Self {
            index,
            stem,
            results: BTreeMap::new(),
        }
    }
}

impl Searcher for IndexSearcher<'_> {
    fn search(&mut self, line: &str, exact: bool) {
        let stems = text::unique_stems_with(line, self.stem);
        let Some(key) = query_key(line, self.stem) else {
            return;
        };
        if self.results.contains_key(&key) {
            return;
        }
        let found = self.index.search(&stems, exact);
        self.results.insert(key, found);
    }

    fn results(&self, line: &str) -> Vec<SearchResult> {
        query_key(line, self.stem)
            .and_then(|key| self.results.get(&key).cloned())
            .unwrap_or_default()
    }

    fn results_map(&self) -> BTreeMap<String, Vec<SearchResult>> {
        self.results.clone()
    }
}

/// Searches a shared index with one queue task per query line.
///
/// The caller drains the queue before reading results. Two tasks racing on
/// the same key may both run the search; the loser overwrites the winner
/// with an identical list, so the race is benign.
pub struct ThreadedIndexSearcher {
    index: Arc<ThreadSafeInvertedIndex>,
    stem: StemFn,
    results: Arc<ReadWriteLock<BTreeMap<String, Vec<SearchResult>>>>,
    handle: TaskHandle,
}

impl ThreadedIndexSearcher {
    pub fn new(index: &Arc<ThreadSafeInvertedIndex>, queue: &WorkQueue) -> Self {
        Self::with_stem(index, queue, text::identity_stem)
    }

    /// Creates a searcher that stems query words with `stem`.
    pub fn with_stem(
        index: &Arc<ThreadSafeInvertedIndex>,
        queue: &WorkQueue,
        stem: StemFn,
    ) -> Self {
        Self {
            index: Arc::clone(index),
            stem,
            results: Arc::new(ReadWriteLock::new(BTreeMap::new())),
            handle: queue.handle(),
        }
    }
}

impl Searcher for ThreadedIndexSearcher {
    fn search(&mut self, line: &str, exact: bool) {
        let line = line.to_string();
        let index = Arc::clone(&self.index);
        let results = Arc::clone(&self.results);
        let stem = self.stem;
        self.handle.execute(move || {
            let stems = text::unique_stems_with(&line, stem);
            let Some(key) = query_key(&line, stem) else {
                return;
            };
            if results.read().contains_key(&key) {
                return;
            }
            let found = index.search(&stems, exact);
            results.write().insert(key, found);
        });
    }

    fn results(&self, line: &str) -> Vec<SearchResult> {
        query_key(line, self.stem)
            .and_then(|key| self.results.read().get(&key).cloned())
            .unwrap_or_default()
    }

    fn results_map(&self) -> BTreeMap<String, Vec<SearchResult>> {
        self.results.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_index() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        index.add_words("the quick brown fox".split_whitespace(), "a.txt");
        index.add_words("the lazy dog".split_whitespace(), "b.txt");
        index
    }

    #[test]
    fn test_query_key_normalizes_case_order_and_duplicates() {
        let key = query_key("Quick BROWN quick", text::identity_stem);
        assert_eq!(key, Some("brown quick".to_string()));
        assert_eq!(query_key("  ,.! ", text::identity_stem), None);
    }

    #[test]
    fn test_searcher_stems_queries_like_the_index() {
        fn chop(word: &str) -> String {
            word.trim_end_matches('s').to_string()
        }

        let mut index = InvertedIndex::new();
        crate::builder::add_stems_with("cats chase dogs", "a.txt", &mut index, chop);

        let mut searcher = IndexSearcher::with_stem(&index, chop);
        searcher.search("Dogs!", true);
        let results = searcher.results("dogs");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].count, 1);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let index = sample_index();
        let mut searcher = IndexSearcher::new(&index);
        searcher.search("", true);
        searcher.search("  !!  ", true);
        assert!(searcher.results_map().is_empty());
    }

    #[test]
    fn test_equivalent_lines_share_one_entry() {
        let index = sample_index();
        let mut searcher = IndexSearcher::new(&index);
        searcher.search("quick fox", true);
        searcher.search("Fox, Quick!", true);
        assert_eq!(searcher.results_map().len(), 1);
        assert_eq!(searcher.results("fox quick").len(), 1);
    }

    #[test]
    fn test_results_for_unsearched_line_are_empty() {
        let index = sample_index();
        let searcher = IndexSearcher::new(&index);
        assert!(searcher.results("quick").is_empty());
    }

    #[test]
    fn test_search_file_reads_every_line() {
        let index = sample_index();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "quick").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "dog").unwrap();

        let mut searcher = IndexSearcher::new(&index);
        searcher.search_file(&path, true).unwrap();

        let map = searcher.results_map();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("quick"));
        assert!(map.contains_key("dog"));
    }

    #[test]
    fn test_missing_query_file_is_an_error() {
        let index = sample_index();
        let mut searcher = IndexSearcher::new(&index);
        let result = searcher.search_file(Path::new("/no/such/queries.txt"), true);
        assert!(matches!(result, Err(SpindexError::InvalidQueryFile(_))));
    }

    #[test]
    fn test_threaded_searcher_matches_single_threaded() {
        let shared = Arc::new(ThreadSafeInvertedIndex::new());
        shared.add_words("the quick brown fox".split_whitespace(), "a.txt");
        shared.add_words("the lazy dog".split_whitespace(), "b.txt");

        let queue = WorkQueue::with_threads(4);
        let mut threaded = ThreadedIndexSearcher::new(&shared, &queue);
        for line in ["quick fox", "the", "dog", "quick fox"] {
            threaded.search(line, true);
        }
        queue.finish();

        let single_index = sample_index();
        let mut single = IndexSearcher::new(&single_index);
        for line in ["quick fox", "the", "dog"] {
            single.search(line, true);
        }

        assert_eq!(threaded.results_map(), single.results_map());
        queue.join();
    }
}
