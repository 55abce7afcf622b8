//! Batch delete, quarantine and rename driven by a human-edited action file.
//!
//! The action file maps a file stem to `{ "filename": <directive> }`:
//! `"d"` deletes the file, `"m"` moves it to the quarantine folder,
//! and anything else is the new stem for the file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mover::Mover;
use crate::{print_error, walk};

/// Default name of the quarantine folder.
pub const DEFAULT_QUARANTINE_DIR: &str = "Later";

const DELETE_TOKEN: &str = "d";
const QUARANTINE_TOKEN: &str = "m";

/// Actions keyed by file stem.
pub type ActionMap = BTreeMap<String, ActionEntry>;

/// A single action file entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Directive token or the new stem.
    pub filename: String,
}

/// What to do with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Delete,
    Quarantine,
    Rename(&'a str),
}

/// Result counts for one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub deleted: usize,
    pub quarantined: usize,
    pub renamed: usize,
    /// Files with a matching entry that needed no change.
    pub unchanged: usize,
    pub failed: usize,
}

/// Previous occupant of a target path and where it was moved to.
type Displaced = (PathBuf, PathBuf);

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Deleted,
    Quarantined,
    Renamed,
    Unchanged,
}

/// Applies an [`ActionMap`] to the files in a directory.
#[derive(Debug, Clone)]
pub struct ActionProcessor {
    quarantine_dir: String,
    recursive: bool,
}

impl ActionEntry {
    #[must_use]
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }

    #[must_use]
    pub fn directive(&self) -> Directive<'_> {
        Directive::from(self.filename.as_str())
    }
}

impl<'a> From<&'a str> for Directive<'a> {
    fn from(value: &'a str) -> Self {
        match value {
            DELETE_TOKEN => Self::Delete,
            QUARANTINE_TOKEN => Self::Quarantine,
            stem => Self::Rename(stem),
        }
    }
}

impl ActionReport {
    const fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Deleted => self.deleted += 1,
            Outcome::Quarantined => self.quarantined += 1,
            Outcome::Renamed => self.renamed += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deleted {}, quarantined {}, renamed {}, unchanged {}, failed {}",
            self.deleted, self.quarantined, self.renamed, self.unchanged, self.failed
        )
    }
}

impl Default for ActionProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_QUARANTINE_DIR, false)
    }
}

impl ActionProcessor {
    #[must_use]
    pub fn new(quarantine_dir: &str, recursive: bool) -> Self {
        Self {
            quarantine_dir: quarantine_dir.to_string(),
            recursive,
        }
    }

    /// Apply `actions` to every file in `dir` whose stem has an entry.
    ///
    /// Files are gathered before anything is changed,
    /// so files created or renamed by this run are not visited again.
    /// Each file keeps the directive of the stem it had when gathered,
    /// even if an earlier rename pushed it aside to a timestamped name.
    /// Entries without a matching file are ignored.
    /// A failing file is reported and the batch continues.
    pub fn apply(&self, dir: &Path, actions: &ActionMap, mover: &mut Mover) -> Result<ActionReport> {
        let mut pending = Vec::new();
        for entry in walk::files(dir, self.recursive) {
            let path = entry.with_context(|| format!("Failed to list directory {}", dir.display()))?;
            let (stem, _) = crate::get_normalized_file_name_and_extension(&path)?;
            if actions.contains_key(&stem) {
                pending.push((path, stem));
            }
        }

        let mut report = ActionReport::default();
        for index in 0..pending.len() {
            let (path, stem) = pending[index].clone();
            let Some(entry) = actions.get(&stem) else {
                continue;
            };

            let result = match entry.directive() {
                Directive::Delete => mover.remove_file(&path).map(|()| (Outcome::Deleted, None)),
                Directive::Quarantine => self.quarantine(&path, mover),
                Directive::Rename(new_stem) => Self::rename(&path, new_stem, mover),
            };

            match result {
                Ok((outcome, displaced)) => {
                    report.add(outcome);
                    // Follow a pending file that was pushed aside to its new name.
                    if let Some((occupied, moved_to)) = displaced.filter(|_| !mover.dryrun()) {
                        for (later_path, _) in &mut pending[index + 1..] {
                            if *later_path == occupied {
                                later_path.clone_from(&moved_to);
                            }
                        }
                    }
                }
                Err(error) => {
                    print_error!("{error:#}");
                    mover.record_failure("apply", &path, &error);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Move a file into the quarantine folder next to it.
    ///
    /// Unchanged if the file already is in a quarantine folder.
    fn quarantine(&self, path: &Path, mover: &mut Mover) -> Result<(Outcome, Option<Displaced>)> {
        let parent = path.parent().context("Failed to get parent directory")?;
        if crate::path_to_filename_string(parent) == self.quarantine_dir {
            return Ok((Outcome::Unchanged, None));
        }
        let quarantine = parent.join(&self.quarantine_dir);
        mover.ensure_dir(&quarantine)?;
        let target = quarantine.join(crate::path_to_filename_string(path));
        let displaced = mover.move_displacing(path, &target)?;
        Ok((Outcome::Quarantined, displaced.map(|moved_to| (target, moved_to))))
    }

    /// Rename a file to a new stem, keeping its extension.
    fn rename(path: &Path, new_stem: &str, mover: &mut Mover) -> Result<(Outcome, Option<Displaced>)> {
        let new_stem = new_stem.trim();
        if new_stem.is_empty() || new_stem.contains(['/', '\\']) {
            anyhow::bail!("Invalid new name \"{new_stem}\" for {}", path.display());
        }
        let (current_stem, _) = crate::get_normalized_file_name_and_extension(path)?;
        if current_stem == new_stem {
            return Ok((Outcome::Unchanged, None));
        }
        let parent = path.parent().context("Failed to get parent directory")?;
        let target = crate::with_stem_in_dir(path, parent, new_stem);
        let displaced = mover.move_displacing(path, &target)?;
        Ok((Outcome::Renamed, displaced.map(|moved_to| (target, moved_to))))
    }
}

/// Build an action map with an unchanged entry for every file directly in `dir`.
///
/// Editing the directives and applying the map performs the batch.
pub fn emit_action_map(dir: &Path) -> Result<ActionMap> {
    let mut actions = ActionMap::new();
    for entry in walk::files(dir, false) {
        let path = entry.with_context(|| format!("Failed to list directory {}", dir.display()))?;
        let (stem, _) = crate::get_normalized_file_name_and_extension(&path)?;
        actions.insert(stem.clone(), ActionEntry { filename: stem });
    }
    Ok(actions)
}

#[cfg(test)]
mod actions_tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    fn actions(entries: &[(&str, &str)]) -> ActionMap {
        entries
            .iter()
            .map(|(stem, directive)| ((*stem).to_string(), ActionEntry::new(directive)))
            .collect()
    }

    #[test]
    fn directive_tokens() {
        assert_eq!(Directive::from("d"), Directive::Delete);
        assert_eq!(Directive::from("m"), Directive::Quarantine);
        assert_eq!(Directive::from("final_cut"), Directive::Rename("final_cut"));
        assert_eq!(Directive::from("D"), Directive::Rename("D"));
    }

    #[test]
    fn delete_directive_removes_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip1.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip1", "d")]), &mut mover)
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(!dir.path().join("clip1.mp4").exists());
    }

    #[test]
    fn quarantine_directive_moves_to_later() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip2.mkv"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip2", "m")]), &mut mover)
            .unwrap();

        assert_eq!(report.quarantined, 1);
        assert!(!dir.path().join("clip2.mkv").exists());
        assert!(dir.path().join("Later").join("clip2.mkv").is_file());
    }

    #[test]
    fn quarantine_into_existing_folder() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Later")).unwrap();
        fs::write(dir.path().join("clip2.mkv"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip2", "m")]), &mut mover)
            .unwrap();
        assert!(dir.path().join("Later").join("clip2.mkv").is_file());
    }

    #[test]
    fn custom_quarantine_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        ActionProcessor::new("Review", false)
            .apply(dir.path(), &actions(&[("clip", "m")]), &mut mover)
            .unwrap();
        assert!(dir.path().join("Review").join("clip.mp4").is_file());
    }

    #[test]
    fn rename_directive_keeps_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip3.avi"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip3", "final_cut")]), &mut mover)
            .unwrap();

        assert_eq!(report.renamed, 1);
        assert!(!dir.path().join("clip3.avi").exists());
        assert!(dir.path().join("final_cut.avi").is_file());
    }

    #[test]
    fn same_stem_is_noop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("keep", "keep")]), &mut mover)
            .unwrap();

        assert_eq!(report.unchanged, 1);
        assert!(dir.path().join("keep.mp4").is_file());
    }

    #[test]
    fn unmatched_entries_and_files_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("other.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("gone", "d")]), &mut mover)
            .unwrap();

        assert_eq!(report, ActionReport::default());
        assert!(dir.path().join("other.mp4").is_file());
    }

    #[test]
    fn rename_onto_existing_keeps_both() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), "a").unwrap();
        fs::write(dir.path().join("b.mp4"), "b").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        ActionProcessor::default()
            .apply(dir.path(), &actions(&[("a", "b")]), &mut mover)
            .unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("b.mp4")).unwrap(), "a");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    fn contents(dir: &Path) -> Vec<(String, String)> {
        let mut files: Vec<(String, String)> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let path = entry.unwrap().path();
                (crate::path_to_filename_string(&path), fs::read_to_string(&path).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn chained_renames_follow_each_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), "A").unwrap();
        fs::write(dir.path().join("b.mp4"), "B").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("a", "b"), ("b", "c")]), &mut mover)
            .unwrap();

        assert_eq!(report.renamed, 2);
        assert_eq!(
            contents(dir.path()),
            vec![
                ("b.mp4".to_string(), "A".to_string()),
                ("c.mp4".to_string(), "B".to_string())
            ]
        );
    }

    #[test]
    fn swapped_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), "A").unwrap();
        fs::write(dir.path().join("b.mp4"), "B").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("a", "b"), ("b", "a")]), &mut mover)
            .unwrap();

        assert_eq!(report.renamed, 2);
        assert_eq!(
            contents(dir.path()),
            vec![
                ("a.mp4".to_string(), "B".to_string()),
                ("b.mp4".to_string(), "A".to_string())
            ]
        );
    }

    #[test]
    fn displaced_file_keeps_its_own_directive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), "A").unwrap();
        fs::write(dir.path().join("b.mp4"), "B").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("a", "b"), ("b", "d")]), &mut mover)
            .unwrap();

        assert_eq!(report.renamed, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(contents(dir.path()), vec![("b.mp4".to_string(), "A".to_string())]);
    }

    #[test]
    fn padded_same_stem_is_noop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip", " clip ")]), &mut mover)
            .unwrap();

        assert_eq!(report.unchanged, 1);
        assert_eq!(report.renamed, 0);
        assert!(dir.path().join("clip.mp4").is_file());
    }

    #[test]
    fn invalid_new_name_is_counted_as_failure() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::default()
            .apply(dir.path(), &actions(&[("clip", "../escape")]), &mut mover)
            .unwrap();

        assert_eq!(report.failed, 1);
        assert!(dir.path().join("clip.mp4").is_file());
    }

    #[test]
    fn recursive_visits_nested_files_once() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.mp4"), "x").unwrap();
        fs::write(dir.path().join("top.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::new(DEFAULT_QUARANTINE_DIR, true)
            .apply(dir.path(), &actions(&[("nested", "m"), ("top", "m")]), &mut mover)
            .unwrap();

        assert_eq!(report.quarantined, 2);
        assert!(dir.path().join("sub").join("Later").join("nested.mp4").is_file());
        assert!(dir.path().join("Later").join("top.mp4").is_file());
    }

    #[test]
    fn quarantined_file_is_not_moved_again() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Later")).unwrap();
        fs::write(dir.path().join("Later").join("clip.mp4"), "x").unwrap();

        let mut mover = Mover::new(dir.path(), false, false);
        let report = ActionProcessor::new(DEFAULT_QUARANTINE_DIR, true)
            .apply(dir.path(), &actions(&[("clip", "m")]), &mut mover)
            .unwrap();

        assert_eq!(report.unchanged, 1);
        assert!(dir.path().join("Later").join("clip.mp4").is_file());
    }

    #[test]
    fn emit_maps_stems_to_themselves() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.mp4"), "x").unwrap();
        fs::write(dir.path().join("two.cd1.mkv"), "x").unwrap();
        fs::create_dir(dir.path().join("folder")).unwrap();

        let actions = emit_action_map(dir.path()).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions["one"], ActionEntry::new("one"));
        assert_eq!(actions["two.cd1"], ActionEntry::new("two.cd1"));
    }

    #[test]
    fn action_file_format() {
        let json = r#"{"clip1": {"filename": "d"}, "clip3": {"filename": "final_cut"}}"#;
        let actions: ActionMap = serde_json::from_str(json).unwrap();
        assert_eq!(actions["clip1"].directive(), Directive::Delete);
        assert_eq!(actions["clip3"].directive(), Directive::Rename("final_cut"));
    }
}
