//! Ranked search results

use crate::crawler::PageMetadata;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;

/// One location's match for a query, with its relevance score.
///
/// Score is the number of matched word occurrences at the location divided
/// by the total word count recorded for that location. Results are ephemeral
/// and recomputed per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Total matched word occurrences at this location.
    pub count: usize,

    /// count / total words at this location.
    #[serde(serialize_with = "serialize_score")]
    pub score: f64,

    /// The matched location (URL or file path).
    #[serde(rename = "where")]
    pub location: String,

    /// Page metadata when the corpus was crawled; absent for local builds.
    /// A flattened `None` serializes no fields at all.
    #[serde(flatten)]
    pub metadata: Option<PageMetadata>,
}

impl SearchResult {
    /// Creates an empty result for a location; the caller updates count and
    /// score as matching words accumulate.
    pub fn new(location: &str) -> Self {
        Self {
            count: 0,
            score: 0.0,
            location: location.to_string(),
            metadata: None,
        }
    }

    /// Ranking order: score descending, then count descending, then
    /// location ascending case-insensitively. Downstream output formatting
    /// depends on this order being exact.
    pub fn ranking(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.count.cmp(&self.count))
            .then_with(|| {
                self.location
                    .to_lowercase()
                    .cmp(&other.location.to_lowercase())
            })
    }
}

/// Scores round to 8 decimal places on export so output stays stable
/// across float formatting differences.
fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((score * 1e8).round() / 1e8)
}
