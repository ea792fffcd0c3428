//! Builds an inverted index from text files on disk.
//!
//! A path argument may be a single file (indexed regardless of extension)
//! or a directory, walked recursively with only `.txt` and `.text` files
//! indexed. The concurrent builder submits one task per file and merges
//! each file's private fragment into the shared index in a single lock
//! acquisition.

use crate::index::{InvertedIndex, ThreadSafeInvertedIndex};
use crate::queue::WorkQueue;
use crate::text::{self, StemFn};
use crate::{Result, SpindexError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Returns true if `path` has a `.txt` or `.text` extension, compared
/// case-insensitively.
pub fn is_text_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            let ext = ext.to_lowercase();
            ext == "txt" || ext == "text"
        }
        None => false,
    }
}

/// Collects every indexable file under `path` in sorted order.
///
/// A file path is returned as-is; extension filtering only applies inside
/// directories, so an explicitly named file is always indexed.
pub fn find_text_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_text_files(path, true, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_text_files(path: &Path, explicit: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            collect_text_files(&entry?.path(), false, files)?;
        }
    } else if explicit || is_text_file(path) {
        files.push(path.to_path_buf());
    }
    Ok(())
}

/// Adds the cleaned word stems of `text` to the index under `location`,
/// with positions numbered from 1 across the whole text.
pub fn add_stems(text: &str, location: &str, index: &mut InvertedIndex) {
    add_stems_with(text, location, index, text::identity_stem);
}

/// Like [`add_stems`], normalizing each word with the given stem function.
pub fn add_stems_with(text: &str, location: &str, index: &mut InvertedIndex, stem: StemFn) {
    index.add_words(text::stems_with(text, stem), location);
}

/// Reads one file and indexes its contents under its path string.
pub fn add_file(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    add_file_with(path, index, text::identity_stem)
}

fn add_file_with(path: &Path, index: &mut InvertedIndex, stem: StemFn) -> Result<()> {
    let contents = fs::read_to_string(path)?;
    add_stems_with(&contents, &path.to_string_lossy(), index, stem);
    Ok(())
}

/// Indexes a file or directory tree into `index` on the calling thread.
pub fn build(path: &Path, index: &mut InvertedIndex) -> Result<()> {
    build_with(path, index, text::identity_stem)
}

/// Like [`build`], normalizing every word with the given stem function.
pub fn build_with(path: &Path, index: &mut InvertedIndex, stem: StemFn) -> Result<()> {
    if !path.exists() {
        return Err(SpindexError::InvalidPath(path.to_path_buf()));
    }

    for file in find_text_files(path)? {
        tracing::debug!("Indexing {}", file.display());
        add_file_with(&file, index, stem)?;
    }
    Ok(())
}

/// Indexes a file or directory tree with one queue task per file.
///
/// Each task builds a private fragment and merges it once, so the shared
/// lock is touched once per file rather than once per word. File read
/// errors are logged and skipped rather than aborting the other tasks.
/// The caller drains the queue before using the index.
pub fn build_concurrent(
    path: &Path,
    index: &Arc<ThreadSafeInvertedIndex>,
    queue: &WorkQueue,
) -> Result<()> {
    build_concurrent_with(path, index, queue, text::identity_stem)
}

/// Like [`build_concurrent`], normalizing every word with the given stem
/// function.
pub fn build_concurrent_with(
    path: &Path,
    index: &Arc<ThreadSafeInvertedIndex>,
    queue: &WorkQueue,
    stem: StemFn,
) -> Result<()> {
    if !path.exists() {
        return Err(SpindexError::InvalidPath(path.to_path_buf()));
    }

    for file in find_text_files(path)? {
        let index = Arc::clone(index);
        queue.execute(move || {
            let mut local = InvertedIndex::new();
            match add_file_with(&file, &mut local, stem) {
                Ok(()) => index.add_all(local),
                Err(e) => tracing::warn!("Skipping {}: {}", file.display(), e),
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Path::new("notes.txt")));
        assert!(is_text_file(Path::new("notes.TEXT")));
        assert!(!is_text_file(Path::new("notes.md")));
        assert!(!is_text_file(Path::new("notes")));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let mut index = InvertedIndex::new();
        let result = build(Path::new("/no/such/path"), &mut index);
        assert!(matches!(result, Err(SpindexError::InvalidPath(_))));
    }

    #[test]
    fn test_explicit_file_indexed_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "readme.md", "hello world");

        let mut index = InvertedIndex::new();
        build(&path, &mut index).unwrap();
        assert!(index.has_word("hello"));
    }

    #[test]
    fn test_directory_walk_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "apple");
        write_file(dir.path(), "b.md", "banana");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_file(&nested, "c.text", "cherry");

        let mut index = InvertedIndex::new();
        build(dir.path(), &mut index).unwrap();

        assert!(index.has_word("apple"));
        assert!(!index.has_word("banana"));
        assert!(index.has_word("cherry"));
    }

    #[test]
    fn test_positions_continue_across_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "lines.txt", "first line\nsecond line\n");

        let mut index = InvertedIndex::new();
        build(&path, &mut index).unwrap();

        let location = path.to_string_lossy().to_string();
        assert!(index.has_position("second", &location, 3));
        assert!(index.has_position("line", &location, 4));
        assert_eq!(index.get_count(&location), 4);
    }

    #[test]
    fn test_custom_stem_function_reaches_the_index() {
        fn chop(word: &str) -> String {
            word.trim_end_matches('s').to_string()
        }

        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "plural.txt", "cats chase dogs");

        let mut index = InvertedIndex::new();
        build_with(dir.path(), &mut index, chop).unwrap();

        assert!(index.has_word("cat"));
        assert!(index.has_word("dog"));
        assert!(!index.has_word("cats"));
    }

    #[test]
    fn test_concurrent_build_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "shared words here");
        write_file(dir.path(), "b.txt", "shared words there");

        let mut sequential = InvertedIndex::new();
        build(dir.path(), &mut sequential).unwrap();

        let concurrent = Arc::new(ThreadSafeInvertedIndex::new());
        let queue = WorkQueue::with_threads(4);
        build_concurrent(dir.path(), &concurrent, &queue).unwrap();
        queue.join();

        let concurrent = Arc::try_unwrap(concurrent).ok().unwrap().into_inner();
        assert_eq!(sequential.num_words(), concurrent.num_words());
        assert_eq!(
            sequential.counts().collect::<Vec<_>>(),
            concurrent.counts().collect::<Vec<_>>()
        );
    }
}
