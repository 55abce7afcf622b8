//! Depth-first directory traversal as plain iterators.
//!
//! Each call starts a fresh walk, so a traversal can be restarted by calling again.
//! Nothing is read from disk until the iterator is advanced.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Directories under and including `root`, children before their parents,
/// siblings in name order.
///
/// Walk errors are yielded as items so callers can decide which ones are fatal.
pub fn directories_bottom_up(root: &Path) -> impl Iterator<Item = walkdir::Result<PathBuf>> + use<> {
    WalkDir::new(root)
        .contents_first(true)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
}

/// Regular files under `root`, skipping hidden files and directories.
///
/// Only direct children are visited unless `recursive` is set.
pub fn files(root: &Path, recursive: bool) -> impl Iterator<Item = walkdir::Result<PathBuf>> + use<> {
    let walker = if recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };
    walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !crate::is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
}

/// Immediate subdirectories of `dir` in name order.
pub fn subdirectories(dir: &Path) -> impl Iterator<Item = walkdir::Result<PathBuf>> + use<> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(error) => Some(Err(error)),
        })
}
