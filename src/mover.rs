//! Conflict-safe move, rename and delete.
//!
//! All filesystem mutations in the crate go through [`Mover`],
//! which never overwrites an existing file or directory:
//! when the target name is taken,
//! the previous occupant is renamed out of the way with a prefix taken from its own
//! modification time (`YYYYMMDDhhmmss_<name>`) and the incoming item takes the target name.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;

use crate::journal::Journal;

/// Timestamp format used for disambiguation prefixes.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Default)]
pub struct Mover {
    /// Root directory used for printing relative paths.
    root: PathBuf,
    dryrun: bool,
    verbose: bool,
    journal: Option<Journal>,
}

impl Mover {
    #[must_use]
    pub fn new(root: &Path, dryrun: bool, verbose: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            dryrun,
            verbose,
            journal: None,
        }
    }

    /// Record every operation to the given journal.
    #[must_use]
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    #[must_use]
    pub const fn dryrun(&self) -> bool {
        self.dryrun
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Move or rename `source` to `target` without clobbering anything.
    ///
    /// Returns the path the item ended up at.
    /// If `target` is already taken, the occupant is first renamed to a name prefixed with
    /// its own modification timestamp. A failure while doing that aborts this move,
    /// and the source is left where it was.
    pub fn move_path(&mut self, source: &Path, target: &Path) -> Result<PathBuf> {
        self.move_displacing(source, target)?;
        Ok(target.to_path_buf())
    }

    /// Like [`Mover::move_path`], but returns where the previous occupant of `target` was moved to.
    ///
    /// Returns `None` if the target was free.
    pub fn move_displacing(&mut self, source: &Path, target: &Path) -> Result<Option<PathBuf>> {
        if source == target {
            return Ok(None);
        }
        if source.symlink_metadata().is_err() {
            anyhow::bail!("Source does not exist: {}", source.display());
        }

        let case_only = is_case_only_change(source, target);
        let displaced = if !case_only && target.symlink_metadata().is_ok() {
            let free = self
                .displace(target)
                .with_context(|| format!("Failed to make room for {}", target.display()))?;
            Some(free)
        } else {
            None
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                self.ensure_dir(parent)?;
            }
        }

        self.print_move(source, target);
        if self.dryrun {
            return Ok(displaced);
        }

        let result = if case_only {
            rename_with_temp_file(source, target)
        } else {
            fs::rename(source, target)
        };

        match result {
            Ok(()) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_move(source, target);
                }
                Ok(displaced)
            }
            Err(error) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_error("move", source, &error.to_string());
                }
                Err(error).with_context(|| format!("Failed to move {} to {}", source.display(), target.display()))
            }
        }
    }

    /// Delete a single file.
    pub fn remove_file(&mut self, path: &Path) -> Result<()> {
        let display = self.display(path);
        if self.dryrun {
            println!("{} {display}", "Dryrun delete:".bold().cyan());
            return Ok(());
        }

        println!("{} {display}", "Delete:".bold().red());
        match fs::remove_file(path) {
            Ok(()) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_delete(path);
                }
                Ok(())
            }
            Err(error) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_error("delete", path, &error.to_string());
                }
                Err(error).with_context(|| format!("Failed to delete {}", path.display()))
            }
        }
    }

    /// Make sure `dir` exists as a directory, creating it and any missing parents.
    ///
    /// Returns true if the directory was created.
    pub fn ensure_dir(&mut self, dir: &Path) -> Result<bool> {
        if dir.is_dir() {
            return Ok(false);
        }
        if dir.exists() {
            anyhow::bail!("Path exists but is not a directory: {}", dir.display());
        }
        if self.dryrun {
            if self.verbose {
                println!("Would create directory: {}", self.display(dir));
            }
            return Ok(true);
        }

        match fs::create_dir_all(dir) {
            Ok(()) => {
                if self.verbose {
                    println!("Created directory: {}", self.display(dir));
                }
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_mkdir(dir);
                }
                Ok(true)
            }
            Err(error) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_error("mkdir", dir, &error.to_string());
                }
                Err(error).with_context(|| format!("Failed to create directory {}", dir.display()))
            }
        }
    }

    /// Remove an empty directory.
    pub fn remove_dir(&mut self, dir: &Path) -> Result<()> {
        if self.dryrun {
            println!("{} {}", "Dryrun remove directory:".bold().cyan(), self.display(dir));
            return Ok(());
        }
        if self.verbose {
            println!("Removing empty directory: {}", self.display(dir));
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_rmdir(dir);
                }
                Ok(())
            }
            Err(error) => {
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_error("rmdir", dir, &error.to_string());
                }
                Err(error).with_context(|| format!("Failed to remove directory {}", dir.display()))
            }
        }
    }

    /// Write a failure for an item that was skipped to the journal.
    pub fn record_failure(&mut self, operation: &str, path: &Path, error: &anyhow::Error) {
        if let Some(journal) = self.journal.as_mut() {
            journal.log_error(operation, path, &format!("{error:#}"));
        }
    }

    /// Rename the current occupant of `target` to a free timestamp-prefixed name next to it.
    fn displace(&mut self, target: &Path) -> Result<PathBuf> {
        let prefixed = timestamp_prefixed_path(target)?;
        let free = next_free_path(&prefixed)?;

        let old_str = self.display(target);
        let new_str = self.display(&free);
        if self.dryrun {
            println!("{}", "Dryrun rename existing:".bold().cyan());
            crate::show_diff(&old_str, &new_str);
            return Ok(free);
        }

        println!("{}", "Rename existing:".bold().yellow());
        crate::show_diff(&old_str, &new_str);
        fs::rename(target, &free)
            .with_context(|| format!("Failed to rename {} to {}", target.display(), free.display()))?;
        if let Some(journal) = self.journal.as_mut() {
            journal.log_displace(target, &free);
        }
        Ok(free)
    }

    fn print_move(&self, source: &Path, target: &Path) {
        let old_str = self.display(source);
        let new_str = self.display(target);
        if self.dryrun {
            println!("{}", "Dryrun move:".bold().cyan());
        } else {
            println!("{}", "Move:".bold().magenta());
        }
        crate::show_diff(&old_str, &new_str);
    }

    fn display(&self, path: &Path) -> String {
        crate::get_relative_path_or_filename(path, &self.root)
    }
}

/// Format a modification time as a disambiguation prefix in local time.
#[must_use]
pub fn timestamp_prefix(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

/// Get the sibling path `<timestamp>_<name>` for an existing file or directory,
/// using its own last modified time.
pub fn timestamp_prefixed_path(path: &Path) -> Result<PathBuf> {
    let modified = fs::symlink_metadata(path)
        .and_then(|metadata| metadata.modified())
        .with_context(|| format!("Failed to read modified time of {}", path.display()))?;

    let name = crate::path_to_filename_string(path);
    if name.is_empty() {
        anyhow::bail!("Failed to get file name: {}", path.display());
    }
    Ok(path.with_file_name(format!("{}_{name}", timestamp_prefix(modified))))
}

/// Return `path` if it is free, otherwise the first free `<stem>.<index>.<ext>` variant of it.
pub fn next_free_path(path: &Path) -> Result<PathBuf> {
    if path.symlink_metadata().is_err() {
        return Ok(path.to_path_buf());
    }
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let (name, extension) = crate::get_normalized_file_name_and_extension(path)?;
    let mut index = 2;
    loop {
        let file_name = if extension.is_empty() {
            format!("{name}.{index}")
        } else {
            format!("{name}.{index}.{extension}")
        };
        let new_path = parent.join(file_name);
        if new_path.symlink_metadata().is_err() {
            return Ok(new_path);
        }
        index += 1;
    }
}

/// True when `target` only changes letter case of `source` in the same directory
/// and the target name does not exist as a separate entry.
fn is_case_only_change(source: &Path, target: &Path) -> bool {
    if source.parent() != target.parent() {
        return false;
    }
    let old_name = crate::path_to_filename_string(source);
    let new_name = crate::path_to_filename_string(target);
    if old_name == new_name || old_name.to_lowercase() != new_name.to_lowercase() {
        return false;
    }

    // Case-sensitive filesystems can hold both names as separate entries.
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    fs::read_dir(parent).is_ok_and(|entries| {
        !entries
            .filter_map(std::result::Result::ok)
            .any(|entry| crate::os_str_to_string(&entry.file_name()) == new_name)
    })
}

/// Rename through a temporary name to work around case-insensitive filesystems.
fn rename_with_temp_file(path: &Path, new_path: &Path) -> std::io::Result<()> {
    let temp_file = crate::append_extension_to_path(new_path.to_path_buf(), "tmp");
    fs::rename(path, &temp_file)?;
    fs::rename(&temp_file, new_path)
}
