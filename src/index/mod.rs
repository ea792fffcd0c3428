//! Positional inverted index and its thread-safe facade
//!
//! `InvertedIndex` is the unsynchronized core: word → location → ordered
//! position set, plus per-location word counts for relevance scoring.
//! `ThreadSafeInvertedIndex` wraps it in the crate's read/write lock so one
//! shared instance can be mutated by many crawl tasks.

mod inverted;
mod result;
mod safe;

pub use inverted::InvertedIndex;
pub use result::SearchResult;
pub use safe::ThreadSafeInvertedIndex;
