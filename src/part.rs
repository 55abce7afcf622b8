//! Multi-part markers at the end of file stems.
//!
//! Files like `ABC-001-cd1.mp4` and `ABC-001-cd2.mp4` resolve to the same canonical
//! identifier. Carrying the part number over keeps their final names distinct.

use std::sync::LazyLock;

use regex::Regex;

static RE_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)cd([0-9]+)$").expect("Failed to compile part suffix regex"));

/// Split a trailing `cd<digits>` marker (any letter case) off a stem.
///
/// Returns the stem with the marker removed and the part number digits,
/// kept as a string so leading zeros survive.
///
/// ```rust
/// use media_tidy::part::extract_part;
///
/// assert_eq!(extract_part("movie_cd2"), ("movie_", Some("2")));
/// assert_eq!(extract_part("Movie.CD01"), ("Movie.", Some("01")));
/// assert_eq!(extract_part("scene"), ("scene", None));
/// ```
#[must_use]
pub fn extract_part(stem: &str) -> (&str, Option<&str>) {
    RE_PART.captures(stem).map_or((stem, None), |captures| {
        let marker = captures.get(0).map_or(stem.len(), |m| m.start());
        let digits = captures.get(1).map(|m| m.as_str());
        (&stem[..marker], digits)
    })
}

/// Append the part number to a canonical identifier, without a separator.
///
/// ```rust
/// use media_tidy::part::compose_identifier;
///
/// assert_eq!(compose_identifier("ABC-001", Some("2")), "ABC-0012");
/// assert_eq!(compose_identifier("ABC-001", None), "ABC-001");
/// ```
#[must_use]
pub fn compose_identifier(canonical_id: &str, part: Option<&str>) -> String {
    part.map_or_else(|| canonical_id.to_string(), |part| format!("{canonical_id}{part}"))
}
