//! Thread-safe facade over the inverted index
//!
//! Composition rather than inheritance: the unsynchronized core sits behind
//! the crate's read/write lock, and every public operation routes through
//! one guard acquisition. Accessors take the read lock, mutators the write
//! lock, held for the duration of the call; no lock is ever held across
//! network or file I/O.

use super::{InvertedIndex, SearchResult};
use crate::sync::{ReadGuard, ReadWriteLock};
use std::collections::BTreeSet;

/// An inverted index shareable across worker threads.
#[derive(Debug, Default)]
pub struct ThreadSafeInvertedIndex {
    inner: ReadWriteLock<InvertedIndex>,
}

impl ThreadSafeInvertedIndex {
    /// Creates an empty thread-safe index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_word(&self, word: &str, location: &str, position: usize) {
        self.inner.write().add_word(word, location, position);
    }

    pub fn add_words<I, S>(&self, words: I, location: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.write().add_words(words, location);
    }

    /// Merges a worker-local fragment under a single write-lock
    /// acquisition. This is the crawl hot path for index mutation.
    pub fn add_all(&self, other: InvertedIndex) {
        self.inner.write().add_all(other);
    }

    pub fn search(&self, queries: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        self.inner.read().search(queries, exact)
    }

    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        self.inner.read().exact_search(queries)
    }

    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        self.inner.read().partial_search(queries)
    }

    pub fn get_count(&self, location: &str) -> usize {
        self.inner.read().get_count(location)
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.inner.read().has_word(word)
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.inner.read().has_location(word, location)
    }

    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.inner.read().has_position(word, location, position)
    }

    pub fn num_words(&self) -> usize {
        self.inner.read().num_words()
    }

    pub fn num_locations(&self, word: &str) -> usize {
        self.inner.read().num_locations(word)
    }

    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.inner.read().num_positions(word, location)
    }

    pub fn words(&self) -> Vec<String> {
        self.inner.read().words().map(str::to_string).collect()
    }

    pub fn locations(&self, word: &str) -> Vec<String> {
        self.inner.read().locations(word).map(str::to_string).collect()
    }

    pub fn all_locations(&self) -> Vec<String> {
        self.inner.read().all_locations().map(str::to_string).collect()
    }

    pub fn positions(&self, word: &str, location: &str) -> Vec<usize> {
        self.inner.read().positions(word, location)
    }

    /// Takes the read lock for the duration of a guard, so serialization
    /// can walk the whole structure under one acquisition.
    pub fn read(&self) -> ReadGuard<'_, InvertedIndex> {
        self.inner.read()
    }

    /// Consumes the facade and returns the inner index.
    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_fragment_merges() {
        let shared = Arc::new(ThreadSafeInvertedIndex::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut local = InvertedIndex::new();
                    local.add_words(["shared", "word"], &format!("doc{}", i));
                    shared.add_all(local);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.num_locations("shared"), 8);
        for i in 0..8 {
            assert_eq!(shared.get_count(&format!("doc{}", i)), 2);
        }
    }

    #[test]
    fn test_search_while_writing() {
        let shared = Arc::new(ThreadSafeInvertedIndex::new());
        shared.add_words(["stable", "content"], "doc0");

        let writer = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for i in 1..50 {
                    let mut local = InvertedIndex::new();
                    local.add_words(["stable", "extra"], &format!("doc{}", i));
                    shared.add_all(local);
                }
            })
        };

        let queries: BTreeSet<String> = ["stable".to_string()].into_iter().collect();
        for _ in 0..50 {
            let results = shared.exact_search(&queries);
            // Every observed snapshot is internally consistent.
            for result in results {
                assert!(result.count >= 1);
                assert!(result.score > 0.0);
            }
        }

        writer.join().unwrap();
        assert_eq!(shared.num_locations("stable"), 50);
    }
}
