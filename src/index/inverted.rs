//! The unsynchronized inverted index core

use super::SearchResult;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Positional inverted index: word → location → ordered position set.
///
/// Both maps are BTree-ordered. Lexicographic word order is load-bearing:
/// partial search scans the sorted key range from a query word forward and
/// stops at the first non-prefix, and the serialization boundary promises
/// sorted iteration.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// word → location → 1-based positions (deduplicated, ordered).
    index: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>>,

    /// location → total distinct (word, position) insertions; the
    /// denominator for relevance scores.
    word_count: BTreeMap<String, usize>,
}

impl InvertedIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a position for a word at a location. The location's word
    /// count grows only if the (word, location, position) triple is new, so
    /// re-inserting the same triple never double-counts.
    pub fn add_word(&mut self, word: &str, location: &str, position: usize) {
        let inserted = self
            .index
            .entry(word.to_string())
            .or_default()
            .entry(location.to_string())
            .or_default()
            .insert(position);
        if inserted {
            *self.word_count.entry(location.to_string()).or_insert(0) += 1;
        }
    }

    /// Adds a sequence of words at a location with positions 1..=n.
    pub fn add_words<I, S>(&mut self, words: I, location: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (offset, word) in words.into_iter().enumerate() {
            self.add_word(word.as_ref(), location, offset + 1);
        }
    }

    /// Merges another index into this one: per word, per location, the
    /// position sets are unioned; per-location word counts are summed.
    ///
    /// Takes the other index by value so a worker-local fragment merges into
    /// the shared index with a single lock acquisition instead of one per
    /// word.
    pub fn add_all(&mut self, other: InvertedIndex) {
        for (word, other_locations) in other.index {
            match self.index.entry(word) {
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(other_locations);
                }
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    for (location, positions) in other_locations {
                        entry.get_mut().entry(location).or_default().extend(positions);
                    }
                }
            }
        }
        for (location, count) in other.word_count {
            *self.word_count.entry(location).or_insert(0) += count;
        }
    }

    /// Dispatches to exact or partial search.
    pub fn search(&self, queries: &BTreeSet<String>, exact: bool) -> Vec<SearchResult> {
        if exact {
            self.exact_search(queries)
        } else {
            self.partial_search(queries)
        }
    }

    /// Returns ranked results for words present verbatim in the index.
    pub fn exact_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut matches = HashMap::new();
        let mut results = Vec::new();
        for query in queries {
            if self.index.contains_key(query) {
                self.accumulate(query, &mut matches, &mut results);
            }
        }
        results.sort_by(SearchResult::ranking);
        results
    }

    /// Returns ranked results for every indexed word that has a query word
    /// as prefix, scanning the sorted word range from the query forward and
    /// stopping at the first non-prefix.
    pub fn partial_search(&self, queries: &BTreeSet<String>) -> Vec<SearchResult> {
        let mut matches = HashMap::new();
        let mut results = Vec::new();
        for query in queries {
            for word in self
                .index
                .range::<str, _>((
                    std::ops::Bound::Included(query.as_str()),
                    std::ops::Bound::Unbounded,
                ))
                .map(|(w, _)| w)
            {
                if !word.starts_with(query.as_str()) {
                    break;
                }
                self.accumulate(word, &mut matches, &mut results);
            }
        }
        results.sort_by(SearchResult::ranking);
        results
    }

    /// Folds one matched index word into the running per-location results.
    /// The first match for a location creates its result; later matching
    /// words update count and score in place.
    fn accumulate(
        &self,
        word: &str,
        matches: &mut HashMap<String, usize>,
        results: &mut Vec<SearchResult>,
    ) {
        let Some(locations) = self.index.get(word) else {
            return;
        };
        for (location, positions) in locations {
            let slot = match matches.get(location) {
                Some(&slot) => slot,
                None => {
                    matches.insert(location.clone(), results.len());
                    results.push(SearchResult::new(location));
                    results.len() - 1
                }
            };
            let result = &mut results[slot];
            result.count += positions.len();
            let total = self.get_count(location);
            if total > 0 {
                result.score = result.count as f64 / total as f64;
            }
        }
    }

    /// Returns the word count recorded for a location, or 0 if absent.
    pub fn get_count(&self, location: &str) -> usize {
        self.word_count.get(location).copied().unwrap_or(0)
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn has_location(&self, word: &str, location: &str) -> bool {
        self.index
            .get(word)
            .map_or(false, |locations| locations.contains_key(location))
    }

    pub fn has_position(&self, word: &str, location: &str, position: usize) -> bool {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .map_or(false, |positions| positions.contains(&position))
    }

    /// Returns the number of distinct words in the index.
    pub fn num_words(&self) -> usize {
        self.index.len()
    }

    /// Returns the number of locations recorded for a word, 0 if absent.
    pub fn num_locations(&self, word: &str) -> usize {
        self.index.get(word).map_or(0, BTreeMap::len)
    }

    /// Returns the number of positions for a (word, location), 0 if absent.
    pub fn num_positions(&self, word: &str, location: &str) -> usize {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .map_or(0, BTreeSet::len)
    }

    /// Iterates words in lexicographic order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Iterates a word's locations in lexicographic order.
    pub fn locations<'a>(&'a self, word: &str) -> impl Iterator<Item = &'a str> {
        self.index
            .get(word)
            .into_iter()
            .flat_map(|locations| locations.keys().map(String::as_str))
    }

    /// Iterates every location with a word count, in lexicographic order.
    pub fn all_locations(&self) -> impl Iterator<Item = &str> {
        self.word_count.keys().map(String::as_str)
    }

    /// Returns the ordered positions for a (word, location).
    pub fn positions(&self, word: &str, location: &str) -> Vec<usize> {
        self.index
            .get(word)
            .and_then(|locations| locations.get(location))
            .map(|positions| positions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sorted iteration over the full word → location → positions structure,
    /// for the serialization boundary.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeMap<String, BTreeSet<usize>>)> {
        self.index.iter()
    }

    /// Sorted iteration over location → word count.
    pub fn counts(&self) -> impl Iterator<Item = (&String, usize)> {
        self.word_count.iter().map(|(location, &count)| (location, count))
    }
}
