//! Media records built from metadata lookup results.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::part;

/// Maximum display name length in characters.
pub const MAX_NAME_LENGTH: usize = 50;

/// Display name used when a title has no known actors.
pub const DEFAULT_UNKNOWN_NAME: &str = "Unknown";

/// Separator between actor names in a display name.
const NAME_SEPARATOR: &str = ",";

/// Records keyed by their final identifier.
pub type RecordMap = BTreeMap<String, MediaRecord>;

/// One search result from the metadata service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// Canonical identifier, for example `ABC-001`.
    pub number: String,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub homepage: String,
}

/// Lookup output for a single source file.
///
/// The canonical identifier is the key this record is stored under in a [`RecordMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Stem of the source file.
    pub filename: String,
    /// Display name built from the actor list.
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub homepage: String,
    /// Directory for the file relative to the library root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Builds records from lookup results.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    unknown_name: String,
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_UNKNOWN_NAME)
    }
}

impl RecordAssembler {
    #[must_use]
    pub fn new(unknown_name: &str) -> Self {
        Self {
            unknown_name: unknown_name.to_string(),
        }
    }

    /// Build the record for `stem` from ranked lookup candidates.
    ///
    /// Returns the final identifier, which carries over any part number of the stem,
    /// together with the record. Returns `None` when there are no candidates.
    #[must_use]
    pub fn assemble(&self, stem: &str, candidates: &[Candidate]) -> Option<(String, MediaRecord)> {
        let candidate = select_candidate(candidates)?;
        let (_, part_number) = part::extract_part(stem);
        let identifier = part::compose_identifier(&candidate.number, part_number);
        let display_name = self.display_name(&candidate.actors);
        let path = Path::new(&display_name).join(&candidate.number);

        let record = MediaRecord {
            filename: stem.to_string(),
            display_name,
            homepage: candidate.homepage.clone(),
            path: Some(crate::path_to_string(&path)),
        };
        Some((identifier, record))
    }

    /// Join actor names into a display name of at most [`MAX_NAME_LENGTH`] characters.
    ///
    /// When all names do not fit, only the first three are used,
    /// and the result is cut to the maximum length if still too long.
    #[must_use]
    pub fn display_name(&self, actors: &[String]) -> String {
        match actors {
            [] => self.unknown_name.clone(),
            [single] => single.clone(),
            _ => {
                let joined = actors.join(NAME_SEPARATOR);
                if joined.chars().count() <= MAX_NAME_LENGTH {
                    joined
                } else if actors.len() >= 3 {
                    truncate_chars(&actors[..3].join(NAME_SEPARATOR), MAX_NAME_LENGTH)
                } else {
                    truncate_chars(&joined, MAX_NAME_LENGTH)
                }
            }
        }
    }
}

/// Pick the first candidate with actors, falling back to the first candidate.
#[must_use]
pub fn select_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .find(|candidate| !candidate.actors.is_empty())
        .or_else(|| candidates.first())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
