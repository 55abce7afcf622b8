//! Merge duplicate folder variants like `Name`, `Name(1)` and `Name(2)` into one folder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::mover::Mover;
use crate::{print_bold, print_error, prune, walk};

/// Sequence number used for folder names without a parenthesized suffix.
pub const NO_SEQUENCE: i64 = -1;

/// A directory name split into its family base name and duplicate sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderVariant {
    /// Full directory name.
    pub name: String,
    /// Name up to the first `(`.
    pub base_name: String,
    /// Number inside the parentheses, or [`NO_SEQUENCE`].
    pub sequence_number: i64,
}

/// Result counts for one consolidation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Families with two or more variants.
    pub families: usize,
    /// Items moved into the canonical folder or the root.
    pub moved: usize,
    /// Items that could not be moved.
    pub failed: usize,
    /// Directories removed by the final prune.
    pub pruned: usize,
}

impl FolderVariant {
    /// Parse a directory name.
    ///
    /// A name containing `(` is split at the first `(`:
    /// the prefix is the base name and the text after it, minus a trailing `)`,
    /// is the sequence number. Text that is not a number counts as zero.
    ///
    /// ```rust
    /// use media_tidy::folders::FolderVariant;
    ///
    /// let variant = FolderVariant::parse("ABC-001(2)");
    /// assert_eq!(variant.base_name, "ABC-001");
    /// assert_eq!(variant.sequence_number, 2);
    ///
    /// let variant = FolderVariant::parse("ABC-001");
    /// assert_eq!(variant.base_name, "ABC-001");
    /// assert_eq!(variant.sequence_number, -1);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let (base_name, sequence_number) = match name.split_once('(') {
            Some((prefix, rest)) => {
                let number = rest.strip_suffix(')').unwrap_or(rest).trim();
                (prefix, number.parse::<i64>().unwrap_or(0))
            }
            None => (name, NO_SEQUENCE),
        };
        Self {
            name: name.to_string(),
            base_name: base_name.to_string(),
            sequence_number,
        }
    }
}

/// Group folder names into families by base name.
///
/// Each family is sorted by descending sequence number, ties by name,
/// so the first element is the canonical merge target.
#[must_use]
pub fn group_variants<I, S>(names: I) -> BTreeMap<String, Vec<FolderVariant>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut families: BTreeMap<String, Vec<FolderVariant>> = BTreeMap::new();
    for name in names {
        let variant = FolderVariant::parse(name.as_ref());
        families.entry(variant.base_name.clone()).or_default().push(variant);
    }
    for variants in families.values_mut() {
        variants.sort_by(|a, b| {
            b.sequence_number
                .cmp(&a.sequence_number)
                .then_with(|| a.name.cmp(&b.name))
        });
    }
    families
}

/// Read the immediate subdirectories of `root` and group them into families.
pub fn read_families(root: &Path) -> Result<BTreeMap<String, Vec<FolderVariant>>> {
    let mut names = Vec::new();
    for entry in walk::subdirectories(root) {
        let path = entry.with_context(|| format!("Failed to list directory {}", root.display()))?;
        names.push(crate::get_normalized_dir_name(&path)?);
    }
    Ok(group_variants(names))
}

/// Merge every folder family in `root` into its highest-numbered variant,
/// then remove the directories left empty.
///
/// Subdirectories of the other variants are moved into the canonical folder,
/// or into `root` when the canonical folder already has a subdirectory with that name.
/// Loose files are merged into the canonical folder with conflict-safe renaming.
pub fn consolidate(root: &Path, mover: &mut Mover) -> Result<ConsolidationReport> {
    let families = read_families(root)?;
    let mut report = ConsolidationReport::default();

    for (base_name, variants) in families.iter().filter(|(_, variants)| variants.len() > 1) {
        report.families += 1;
        let canonical = root.join(&variants[0].name);
        print_bold!(
            "{}: {} variant(s) -> {}",
            base_name.cyan(),
            variants.len(),
            variants[0].name
        );

        for variant in &variants[1..] {
            let source = root.join(&variant.name);
            for (item, target) in merge_targets(&source, &canonical, root)? {
                match mover.move_path(&item, &target) {
                    Ok(_) => report.moved += 1,
                    Err(error) => {
                        print_error!("{error:#}");
                        mover.record_failure("move", &item, &error);
                        report.failed += 1;
                    }
                }
            }
        }
    }

    report.pruned = prune::prune_empty_dirs(root, mover)?;
    Ok(report)
}

/// Pair each entry of a non-canonical variant with where it should go.
fn merge_targets(source: &Path, canonical: &Path, root: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut targets = Vec::new();
    for entry in walk::subdirectories(source) {
        let path = entry.with_context(|| format!("Failed to list directory {}", source.display()))?;
        let name = crate::path_to_filename_string(&path);
        let in_canonical = canonical.join(&name);
        let target = if in_canonical.exists() {
            root.join(&name)
        } else {
            in_canonical
        };
        targets.push((path, target));
    }
    for entry in walk::files(source, false) {
        let path = entry.with_context(|| format!("Failed to list directory {}", source.display()))?;
        let target = canonical.join(crate::path_to_filename_string(&path));
        targets.push((path, target));
    }
    Ok(targets)
}
