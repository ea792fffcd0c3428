//! Tokenization and the pluggable stemming hook
//!
//! The index stores already-normalized stems; this module produces them.
//! Cleaning lowercases and strips non-alphanumeric characters. The stemming
//! algorithm itself is a collaborator supplied as a plain function, with an
//! identity default, so the core stays locale- and algorithm-agnostic.

use std::collections::BTreeSet;

/// A text-normalization function mapping a cleaned word to its stem.
pub type StemFn = fn(&str) -> String;

/// The default stem function: the cleaned word itself.
pub fn identity_stem(word: &str) -> String {
    word.to_string()
}

/// Splits a line into cleaned words: lowercased, with every
/// non-alphanumeric character removed. Words that clean to nothing are
/// dropped.
pub fn clean(line: &str) -> Vec<String> {
    line.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Cleans a line and stems each word with the given stem function.
pub fn stems_with(line: &str, stem: StemFn) -> Vec<String> {
    clean(line)
        .iter()
        .map(|word| stem(word))
        .filter(|stem| !stem.is_empty())
        .collect()
}

/// Cleans and stems a line with the default stem function.
pub fn stems(line: &str) -> Vec<String> {
    stems_with(line, identity_stem)
}

/// Returns the sorted, deduplicated stem set for a query line.
pub fn unique_stems(line: &str) -> BTreeSet<String> {
    unique_stems_with(line, identity_stem)
}

/// Returns the sorted, deduplicated stem set using the given stem function.
/// Queries must stem with the same function the index was built with.
pub fn unique_stems_with(line: &str, stem: StemFn) -> BTreeSet<String> {
    stems_with(line, stem).into_iter().collect()
}
