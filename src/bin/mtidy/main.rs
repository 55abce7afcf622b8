mod config;
mod tidy;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{Config, MtidyConfig};
use crate::tidy::MediaTidy;

/// Tidy a media download folder into a library, one stage at a time.
///
/// Stages are usually run in order:
/// clean, emit, apply, lookup, file, rename, consolidate and prune.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Tidy a media library in stages"
)]
pub(crate) struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Optional target directory
    #[arg(value_hint = clap::ValueHint::DirPath, global = true)]
    path: Option<PathBuf>,

    /// Enable debug prints
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Media file extension to recognize (repeatable)
    #[arg(short = 'e', long = "extension", num_args = 1, action = clap::ArgAction::Append, name = "EXT", global = true)]
    extensions: Vec<String>,

    /// Write every change to a log file
    #[arg(short = 'L', long, global = true)]
    log: bool,

    /// Only print changes without modifying files
    #[arg(short = 'p', long, global = true)]
    print: bool,

    /// Recurse into subdirectories when applying the action file
    #[arg(short = 'r', long, global = true)]
    recurse: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Merge duplicate folders like `Name(1)` and `Name(2)` into the highest numbered one
    #[command(name = "consolidate", visible_alias = "d")]
    Consolidate,

    /// Delete junk files in subdirectories and move media files up to the target directory
    #[command(name = "clean", visible_alias = "c")]
    Clean {
        /// Minimum size in MB for media files to keep
        #[arg(short = 'm', long = "min-size", name = "MB")]
        min_size_mb: Option<u64>,
    },

    /// Write an editable action file listing every file in the target directory
    #[command(name = "emit", visible_alias = "j")]
    Emit {
        /// Action file path
        #[arg(short = 'o', long, name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete, quarantine or rename files as edited in the action file
    #[command(name = "apply", visible_alias = "r")]
    Apply {
        /// Action file path
        #[arg(short = 'a', long = "actions", name = "FILE")]
        action_file: Option<PathBuf>,
    },

    /// Look up metadata for every media file and save the records
    #[command(name = "lookup", visible_alias = "n")]
    Lookup {
        /// Record file path
        #[arg(short = 'o', long, name = "FILE")]
        output: Option<PathBuf>,

        /// Metadata server URL
        #[arg(short = 'u', long, name = "URL")]
        url: Option<String>,
    },

    /// Move looked up files into `<name>/<identifier>` folders
    #[command(name = "file", visible_alias = "f")]
    File {
        /// Record file path
        #[arg(short = 'i', long, name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Rename media files after the folder they are in
    #[command(name = "rename", visible_alias = "m")]
    Rename,

    /// Remove empty directories
    #[command(name = "prune", visible_alias = "p")]
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        return media_tidy::install_shell_completion(*shell, Args::command(), env!("CARGO_BIN_NAME"));
    }

    let Some(command) = args.command.clone() else {
        Args::command().print_help()?;
        return Ok(());
    };

    let config = Config::from_args(args, MtidyConfig::get_user_config())?;
    MediaTidy::new(config).run(&command).await
}
