//! JSON rendering for the index, word counts, search results, and page
//! metadata.
//!
//! Every object is built from sorted map iteration, so output is
//! byte-for-byte deterministic for a given index state.

use crate::crawler::PageMetadata;
use crate::index::{InvertedIndex, SearchResult};
use crate::Result;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// Renders the full word → location → positions structure.
pub fn index_to_value(index: &InvertedIndex) -> Value {
    let mut words = Map::new();
    for (word, locations) in index.iter() {
        let mut entries = Map::new();
        for (location, positions) in locations {
            entries.insert(location.clone(), json!(positions));
        }
        words.insert(word.clone(), Value::Object(entries));
    }
    Value::Object(words)
}

/// Renders location → total word count.
pub fn counts_to_value(index: &InvertedIndex) -> Value {
    let mut counts = Map::new();
    for (location, count) in index.counts() {
        counts.insert(location.clone(), json!(count));
    }
    Value::Object(counts)
}

/// Renders normalized query → ranked result list.
pub fn results_to_value(results: &BTreeMap<String, Vec<SearchResult>>) -> Value {
    let mut queries = Map::new();
    for (query, found) in results {
        queries.insert(query.clone(), json!(found));
    }
    Value::Object(queries)
}

/// Renders URL → crawled page metadata.
pub fn metadata_to_value(metadata: &BTreeMap<String, PageMetadata>) -> Value {
    let mut pages = Map::new();
    for (url, page) in metadata {
        pages.insert(url.clone(), json!(page));
    }
    Value::Object(pages)
}

/// Pretty-prints a value to any writer.
pub fn write_json_to<W: io::Write>(writer: W, value: &Value) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Pretty-prints a value to a file.
pub fn write_json(value: &Value, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_json_to(BufWriter::new(file), value)
}
