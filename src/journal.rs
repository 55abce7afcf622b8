//! Append-only journal of filesystem mutations.
//!
//! Every move, rename, delete and directory change attempted by the [`Mover`](crate::mover::Mover)
//! is written here with source and destination, so a batch can be audited or undone by hand.

use std::fmt;
use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Simple file logger for filesystem operations with buffered writes
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Journal {
    /// Create a new journal in the default log directory `~/logs/media-tidy`.
    pub fn new(stage: &str) -> Result<Self> {
        let log_dir = crate::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::in_dir(log_dir, stage)
    }

    /// Create a new journal file `media_tidy_<timestamp>.log` in the given directory.
    pub fn in_dir(log_dir: &Path, stage: &str) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("media_tidy_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        let mut journal = Self {
            writer: BufWriter::new(file),
            path: log_path,
        };
        journal.write_line(&format!("INIT    {stage}"));
        Ok(journal)
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.writer, "[{}] {line}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log a move or rename from `source` to `target`.
    pub fn log_move(&mut self, source: &Path, target: &Path) {
        self.write_line(&format!("MOVE    \"{}\" => \"{}\"", source.display(), target.display()));
    }

    /// Log renaming the previous occupant of a target name out of the way.
    pub fn log_displace(&mut self, occupant: &Path, target: &Path) {
        self.write_line(&format!(
            "RENAME  \"{}\" => \"{}\"",
            occupant.display(),
            target.display()
        ));
    }

    /// Log a file deletion.
    pub fn log_delete(&mut self, path: &Path) {
        self.write_line(&format!("DELETE  \"{}\"", path.display()));
    }

    /// Log directory creation.
    pub fn log_mkdir(&mut self, path: &Path) {
        self.write_line(&format!("MKDIR   \"{}\"", path.display()));
    }

    /// Log directory removal.
    pub fn log_rmdir(&mut self, path: &Path) {
        self.write_line(&format!("RMDIR   \"{}\"", path.display()));
    }

    /// Log a failed operation.
    pub fn log_error(&mut self, operation: &str, path: &Path, error: &str) {
        self.write_line(&format!("ERROR   {operation} \"{}\": {error}", path.display()));
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}
