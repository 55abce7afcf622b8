//! Library-wide reorganisation stages built on top of [`Mover`].
//!
//! - [`clean_and_move`] flattens a downloaded tree into its root, dropping junk files.
//! - [`file_by_records`] moves identified files into `<name>/<identifier>` folders.
//! - [`rename_to_folder`] names media files after the folder they are in.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::mover::Mover;
use crate::record::RecordMap;
use crate::{part, print_error, prune, walk};

/// Default minimum size in megabytes for a media file to be kept by [`clean_and_move`].
pub const DEFAULT_MIN_SIZE_MB: u64 = 120;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Result counts for [`clean_and_move`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub deleted: usize,
    pub moved: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Result counts for [`file_by_records`] and [`rename_to_folder`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilingReport {
    pub moved: usize,
    /// Records without a matching file, or files already named correctly.
    pub skipped: usize,
    pub failed: usize,
}

/// Which files count as media worth keeping.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    extensions: Vec<String>,
    min_size_bytes: u64,
}

impl MediaFilter {
    #[must_use]
    pub fn new(extensions: &[String], min_size_mb: u64) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|extension| extension.trim_start_matches('.').to_lowercase())
                .collect(),
            min_size_bytes: min_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// True if the file has a media extension and is at least the minimum size.
    pub fn keeps(&self, path: &Path) -> Result<bool> {
        if !crate::has_media_extension(path, &self.extensions) {
            return Ok(false);
        }
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to read file size: {}", path.display()))?
            .len();
        Ok(size >= self.min_size_bytes)
    }
}

/// Delete every file below the top level of `root` that is not kept by `filter`,
/// move the remaining files up into `root`, then prune the emptied directories.
///
/// Files directly in `root` are never touched.
pub fn clean_and_move(root: &Path, filter: &MediaFilter, mover: &mut Mover) -> Result<CleanReport> {
    let files = walk::files(root, true)
        .collect::<walkdir::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list directory {}", root.display()))?;

    let mut report = CleanReport::default();
    for path in files.iter().filter(|path| path.parent() != Some(root)) {
        let result = filter.keeps(path).and_then(|keep| {
            if keep {
                let target = root.join(crate::path_to_filename_string(path));
                mover.move_path(path, &target).map(|_| report.moved += 1)
            } else {
                mover.remove_file(path).map(|()| report.deleted += 1)
            }
        });
        if let Err(error) = result {
            print_error!("{error:#}");
            mover.record_failure("clean", path, &error);
            report.failed += 1;
        }
    }

    report.pruned = prune::prune_empty_dirs(root, mover)?;
    Ok(report)
}

/// Move each record's source file from the top level of `root` into its record folder,
/// named `<identifier>.<ext>`.
///
/// The folder is the record `path`, or `<display name>/<identifier>` when the record has none.
/// Records with an empty display name are skipped. `delay` is waited after each move.
pub fn file_by_records(
    root: &Path,
    records: &RecordMap,
    mover: &mut Mover,
    delay: Duration,
) -> Result<FilingReport> {
    let mut files_by_stem: HashMap<String, PathBuf> = HashMap::new();
    for entry in walk::files(root, false) {
        let path = entry.with_context(|| format!("Failed to list directory {}", root.display()))?;
        let (stem, _) = crate::get_normalized_file_name_and_extension(&path)?;
        files_by_stem.insert(stem, path);
    }

    let mut report = FilingReport::default();
    for (identifier, record) in records {
        if record.display_name.is_empty() {
            report.skipped += 1;
            continue;
        }
        let Some(source) = files_by_stem.get(&record.filename) else {
            if mover.verbose() {
                println!("No file for {identifier}: {}", record.filename);
            }
            report.skipped += 1;
            continue;
        };

        let folder = record.path.as_deref().filter(|path| !path.is_empty()).map_or_else(
            || root.join(&record.display_name).join(identifier),
            |path| root.join(path),
        );
        let target = crate::with_stem_in_dir(source, &folder, identifier);

        match mover.ensure_dir(&folder).and_then(|_| mover.move_path(source, &target)) {
            Ok(_) => report.moved += 1,
            Err(error) => {
                print_error!("{error:#}");
                mover.record_failure("file", source, &error);
                report.failed += 1;
            }
        }
        if !delay.is_zero() && !mover.dryrun() {
            thread::sleep(delay);
        }
    }
    Ok(report)
}

/// Rename every media file below `root` after its parent folder,
/// keeping a multi-part marker as the part number.
///
/// A file without a part marker whose name already starts with the folder name is left alone,
/// so files filed by [`file_by_records`] keep their part numbers.
/// Files directly in `root` and files in a `quarantine_dir` folder are not renamed.
pub fn rename_to_folder(
    root: &Path,
    extensions: &[String],
    quarantine_dir: &str,
    mover: &mut Mover,
) -> Result<FilingReport> {
    let files = walk::files(root, true)
        .collect::<walkdir::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list directory {}", root.display()))?;

    let mut report = FilingReport::default();
    for path in files {
        let Some(parent) = path.parent() else {
            continue;
        };
        if parent == root || !crate::has_media_extension(&path, extensions) {
            continue;
        }

        let folder_name = crate::get_normalized_dir_name(parent)?;
        if folder_name == quarantine_dir {
            report.skipped += 1;
            continue;
        }
        let (stem, _) = crate::get_normalized_file_name_and_extension(&path)?;
        let (_, part_number) = part::extract_part(&stem);
        let new_stem = part::compose_identifier(&folder_name, part_number);
        if new_stem == stem || (part_number.is_none() && stem.starts_with(&folder_name)) {
            report.skipped += 1;
            continue;
        }

        match mover.move_path(&path, &crate::with_stem_in_dir(&path, parent, &new_stem)) {
            Ok(_) => report.moved += 1,
            Err(error) => {
                print_error!("{error:#}");
                mover.record_failure("rename", &path, &error);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deleted {}, moved {}, failed {}, pruned {}",
            self.deleted, self.moved, self.failed, self.pruned
        )
    }
}

impl fmt::Display for FilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "moved {}, skipped {}, failed {}", self.moved, self.skipped, self.failed)
    }
}
