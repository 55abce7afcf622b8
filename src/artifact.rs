//! Load and save the JSON files passed between pipeline stages.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Read and parse a JSON artifact.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}

/// Read a JSON artifact, or return the default value if the file does not exist.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() { load(path) } else { Ok(T::default()) }
}

/// Serialize to human-editable JSON with four space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer).context("Failed to serialize JSON")?;
    String::from_utf8(buffer).context("Serialized JSON is not valid UTF-8")
}

/// Write a JSON artifact, replacing any previous content.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = to_pretty_json(value)?;
    json.push('\n');
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    fs::write(path, json).with_context(|| format!("Failed to write JSON file: {}", path.display()))
}
