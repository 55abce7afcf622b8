//! Bottom-up removal of directories left empty.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::mover::Mover;
use crate::{print_error, print_warning, walk};

/// Remove every directory under `dir` that has no entries left, deepest first,
/// and finally `dir` itself if it ended up empty.
///
/// Returns the number of directories removed, or that would be removed in dryrun mode.
/// A directory that disappears mid-run is skipped with a warning;
/// any other listing error aborts.
pub fn prune_empty_dirs(dir: &Path, mover: &mut Mover) -> Result<usize> {
    if dir.symlink_metadata().is_err() {
        if mover.verbose() {
            println!("Nothing to prune, directory does not exist: {}", dir.display());
        }
        return Ok(0);
    }
    prune_walked(dir, walk::directories_bottom_up(dir), mover)
}

/// Prune the directories yielded by `walk`, which must list children before their parents.
fn prune_walked(
    dir: &Path,
    walk: impl Iterator<Item = walkdir::Result<PathBuf>>,
    mover: &mut Mover,
) -> Result<usize> {
    // Directories already removed. In dryrun these still exist on disk
    // but must not count as entries of their parent.
    let mut removed: HashSet<PathBuf> = HashSet::new();

    for entry in walk {
        let path = match entry {
            Ok(path) => path,
            Err(error) => {
                let vanished = error.io_error().is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
                if vanished && error.path() != Some(dir) {
                    print_warning!("Directory disappeared while pruning: {error}");
                    continue;
                }
                return Err(error).with_context(|| format!("Failed to list directory {}", dir.display()));
            }
        };

        match remaining_entries(&path, &removed) {
            Ok(0) => match mover.remove_dir(&path) {
                Ok(()) => {
                    removed.insert(path);
                }
                Err(error) => {
                    if !path.exists() {
                        print_warning!("Directory disappeared before removal: {}", path.display());
                    } else {
                        print_error!("{error:#}");
                    }
                }
            },
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                print_warning!("Directory disappeared while pruning: {}", path.display());
            }
            Err(error) => {
                return Err(error).with_context(|| format!("Failed to list directory {}", path.display()));
            }
        }
    }

    Ok(removed.len())
}

/// Count entries in `dir` that have not been removed during this run.
fn remaining_entries(dir: &Path, removed: &HashSet<PathBuf>) -> io::Result<usize> {
    Ok(fs::read_dir(dir)?
        .filter(|entry| !matches!(entry, Ok(entry) if removed.contains(&entry.path())))
        .count())
}

#[cfg(test)]
mod prune_tests {
    use super::*;

    use tempfile::tempdir;

    fn snapshot(dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .map(|entry| entry.unwrap().into_path())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn removes_nested_empty_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("a").join("b").join("c")).unwrap();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep").join("movie.mp4"), "x").unwrap();

        let mut mover = Mover::new(&root, false, false);
        let removed = prune_empty_dirs(&root, &mut mover).unwrap();

        assert_eq!(removed, 3);
        assert!(!root.join("a").exists());
        assert!(root.join("keep").join("movie.mp4").is_file());
        assert!(root.exists());
    }

    #[test]
    fn removes_root_when_everything_is_empty() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("x").join("y")).unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let removed = prune_empty_dirs(&root, &mut mover).unwrap();

        assert_eq!(removed, 3);
        assert!(!root.exists());
    }

    #[test]
    fn second_run_is_noop() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("empty").join("deeper")).unwrap();
        fs::create_dir_all(root.join("full")).unwrap();
        fs::write(root.join("full").join("a.mkv"), "x").unwrap();

        let mut mover = Mover::new(&root, false, false);
        assert_eq!(prune_empty_dirs(&root, &mut mover).unwrap(), 2);
        let after_first = snapshot(&root);

        assert_eq!(prune_empty_dirs(&root, &mut mover).unwrap(), 0);
        assert_eq!(snapshot(&root), after_first);
    }

    #[test]
    fn missing_root_is_noop() {
        let dir = tempdir().unwrap();
        let mut mover = Mover::new(dir.path(), false, false);
        assert_eq!(prune_empty_dirs(&dir.path().join("missing"), &mut mover).unwrap(), 0);
    }

    #[test]
    fn dryrun_counts_parents_of_removable_children() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("a").join("b")).unwrap();
        fs::write(root.join("file.mp4"), "x").unwrap();
        let before = snapshot(&root);

        let mut mover = Mover::new(&root, true, false);
        assert_eq!(prune_empty_dirs(&root, &mut mover).unwrap(), 2);
        assert_eq!(snapshot(&root), before);
    }

    #[test]
    fn directory_vanishing_mid_walk_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b").join("inner")).unwrap();
        fs::write(root.join("keep.mp4"), "x").unwrap();

        // Remove `b` after `a` has been yielded, before the walk descends into it.
        let vanishing = root.join("b");
        let walk = walk::directories_bottom_up(&root).inspect(|entry| {
            if entry.as_ref().is_ok_and(|path| path.ends_with("a")) {
                fs::remove_dir_all(&vanishing).unwrap();
            }
        });

        let mut mover = Mover::new(&root, false, false);
        let removed = prune_walked(&root, walk, &mut mover).unwrap();

        assert_eq!(removed, 1);
        assert!(!root.join("a").exists());
        assert!(root.join("keep.mp4").is_file());
    }

    #[test]
    fn directory_vanishing_before_listing_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("media");
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("keep.mp4"), "x").unwrap();
        let walk: Vec<walkdir::Result<PathBuf>> = vec![Ok(root.join("gone")), Ok(root.join("empty")), Ok(root.clone())];

        let mut mover = Mover::new(&root, false, false);
        assert_eq!(prune_walked(&root, walk.into_iter(), &mut mover).unwrap(), 1);
        assert!(!root.join("empty").exists());
        assert!(root.is_dir());
    }
}
