pub mod actions;
pub mod artifact;
pub mod config;
pub mod folders;
pub mod journal;
pub mod lookup;
pub mod mover;
pub mod notify;
pub mod organize;
pub mod part;
pub mod prune;
pub mod record;
pub mod walk;

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::{Color, ColoredString, Colorize};
use difference::{Changeset, Difference};
use unicode_normalization::UnicodeNormalization;

/// Default recognized media file extensions, lowercase without the dot.
pub const DEFAULT_MEDIA_EXTENSIONS: [&str; 9] = ["mp4", "avi", "mkv", "flv", "mov", "wmv", "rmvb", "ts", "3gp"];

/// Return a green "true" or a red "false".
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Append an extension to `PathBuf`, which is missing from the standard lib :(
pub fn append_extension_to_path(path: PathBuf, extension: impl AsRef<OsStr>) -> PathBuf {
    let mut os_string: OsString = path.into();
    os_string.push(".");
    os_string.push(extension);
    os_string.into()
}

/// Get file stem and extension from Path with special characters retained instead of decomposed.
///
/// Stems are used as keys in the JSON artifacts,
/// so they need to compare equal with what a human typed into the file.
pub fn get_normalized_file_name_and_extension(path: &Path) -> Result<(String, String)> {
    let file_stem = os_str_to_string(path.file_stem().context("Failed to get file stem")?);
    let file_extension = os_str_to_string(path.extension().unwrap_or_default());

    // Rust uses Unicode NFD (Normalization Form Decomposed) by default,
    // which converts special chars like "å" to "a\u{30a}".
    // Use NFC (Normalization Form Composed) to retain the correct format.
    Ok((
        file_stem.nfc().collect::<String>(),
        file_extension.nfc().collect::<String>(),
    ))
}

/// Get the normalized directory name from a Path with special characters retained.
pub fn get_normalized_dir_name(path: &Path) -> Result<String> {
    let dir_name = os_str_to_string(path.file_name().context("Failed to get directory name")?);

    Ok(dir_name.nfc().collect::<String>())
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Check if the file extension is one of the given media extensions.
///
/// Extensions are compared case-insensitively and without the leading dot.
#[must_use]
pub fn has_media_extension(path: &Path, extensions: &[String]) -> bool {
    let extension = path_to_file_extension_string(path);
    !extension.is_empty() && extensions.iter().any(|ext| ext.trim_start_matches('.') == extension)
}

/// Build a path with the same extension as `path` but the given stem, in the given directory.
///
/// ```rust
/// use std::path::Path;
/// use media_tidy::with_stem_in_dir;
///
/// let path = Path::new("/media/clip3.avi");
/// let result = with_stem_in_dir(path, Path::new("/media"), "final_cut");
/// assert_eq!(result, Path::new("/media/final_cut.avi"));
///
/// let path = Path::new("/media/README");
/// let result = with_stem_in_dir(path, Path::new("/other"), "notes");
/// assert_eq!(result, Path::new("/other/notes"));
/// ```
#[must_use]
pub fn with_stem_in_dir(path: &Path, dir: &Path, stem: &str) -> PathBuf {
    match path.extension() {
        Some(extension) if !extension.is_empty() => dir.join(format!("{stem}.{}", os_str_to_string(extension))),
        _ => dir.join(stem),
    }
}

/// Resolve the target directory to an absolute path.
///
/// A missing or empty path means the current working directory.
/// ```rust
/// use std::path::Path;
/// use media_tidy::resolve_root;
///
/// assert!(resolve_root(Some(Path::new("src"))).unwrap().is_absolute());
/// assert!(resolve_root(Some(Path::new("Cargo.toml"))).is_err());
/// ```
pub fn resolve_root(path: Option<&Path>) -> Result<PathBuf> {
    let root = match path.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("Failed to get current working directory")?,
    };
    if !root.is_dir() {
        anyhow::bail!("Target directory does not exist: {}", root.display());
    }
    dunce::canonicalize(&root).with_context(|| format!("Failed to resolve {}", root.display()))
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// If the full path is within the root directory, the function returns the relative path.
/// Otherwise, it returns just the filename. If the filename cannot be determined, the
/// full path is returned.
///
/// ```rust
/// use std::path::Path;
/// use media_tidy::get_relative_path_or_filename;
///
/// let root = Path::new("/root/dir");
/// let full_path = root.join("subdir/file.txt");
/// let relative_path = get_relative_path_or_filename(&full_path, root);
/// assert_eq!(relative_path, "subdir/file.txt");
///
/// let outside_path = Path::new("/other/another.txt");
/// let relative_or_filename = get_relative_path_or_filename(&outside_path, root);
/// assert_eq!(relative_or_filename, "another.txt");
/// ```
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return full_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path.file_name().map_or_else(
                || full_path.display().to_string(),
                |name| name.to_string_lossy().to_string(),
            )
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file extension lowercase string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    os_str_to_string(path.extension().unwrap_or_default()).to_lowercase()
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

#[inline]
pub fn print_bold(message: &str) {
    println!("{}", message.bold());
}

#[macro_export]
macro_rules! print_bold {
    ($($arg:tt)*) => {
        $crate::print_bold(&format!($($arg)*))
    };
}

/// Print the old and new name on top of each other with the changes coloured.
///
/// The shorter name is indented so the first shared part lines up:
/// ```text
///       ABC-001.mp4
/// Later/ABC-001.mp4
/// ```
pub fn show_diff(old: &str, new: &str) {
    let (old_line, new_line) = stacked_diff(old, new);
    println!("{old_line}");
    if old != new {
        println!("{new_line}");
    }
}

fn stacked_diff(old: &str, new: &str) -> (String, String) {
    let changeset = Changeset::new(old, new, "");
    let (old_pad, new_pad) = alignment(old, new, &changeset.diffs);
    let mut old_line = " ".repeat(old_pad);
    let mut new_line = " ".repeat(new_pad);
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                old_line.push_str(text);
                new_line.push_str(text);
            }
            Difference::Add(text) => new_line.push_str(&highlight(text, Color::Green)),
            Difference::Rem(text) => old_line.push_str(&highlight(text, Color::Red)),
        }
    }
    (old_line, new_line)
}

/// Leading padding for both lines so the first shared run of three or more characters lines up.
fn alignment(old: &str, new: &str, diffs: &[Difference]) -> (usize, usize) {
    diffs
        .iter()
        .find_map(|diff| match diff {
            Difference::Same(text) if text.chars().count() >= 3 && !text.trim().is_empty() => {
                Some((old.find(text.as_str())?, new.find(text.as_str())?))
            }
            _ => None,
        })
        .map_or((0, 0), |(old_index, new_index)| {
            (new_index.saturating_sub(old_index), old_index.saturating_sub(new_index))
        })
}

/// Whitespace gets a background colour so it stays visible.
fn highlight(text: &str, color: Color) -> String {
    if text.trim().is_empty() {
        text.on_color(color).to_string()
    } else {
        text.color(color).to_string()
    }
}

/// Write a completion script for `shell` into the user's completion directory.
pub fn install_shell_completion(shell: Shell, mut command: Command, command_name: &str) -> Result<()> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    let out_dir = home.join(completion_dir(shell)?);
    std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
    println!("Completion file generated to: {}", path.display());
    Ok(())
}

/// Completion directory relative to the home directory.
fn completion_dir(shell: Shell) -> Result<&'static str> {
    Ok(match shell {
        Shell::Bash => ".bash_completion.d",
        Shell::Elvish => ".elvish",
        Shell::Fish => ".config/fish/completions",
        Shell::PowerShell => ".config/powershell/completions",
        Shell::Zsh => ".zsh/completions",
        _ => anyhow::bail!("Unsupported shell: {shell}"),
    })
}
