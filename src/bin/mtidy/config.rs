use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;

use media_tidy::actions::DEFAULT_QUARANTINE_DIR;
use media_tidy::organize::DEFAULT_MIN_SIZE_MB;
use media_tidy::record::DEFAULT_UNKNOWN_NAME;
use media_tidy::{DEFAULT_MEDIA_EXTENSIONS, colorize_bool, print_error};

use crate::{Args, Command};

const DEFAULT_ACTION_FILE: &str = "output.json";
const DEFAULT_RECORD_FILE: &str = "data.json";
const DEFAULT_LOOKUP_DELAY_SECS: u64 = 3;

/// Config from the user config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MtidyConfig {
    root: Option<PathBuf>,
    debug: bool,
    dryrun: bool,
    log_file: bool,
    recurse: bool,
    verbose: bool,
    extensions: Vec<String>,
    min_size_mb: Option<u64>,
    quarantine_dir: Option<String>,
    action_file: Option<PathBuf>,
    record_file: Option<PathBuf>,
    unknown_name: Option<String>,
    lookup_url: Option<String>,
    lookup_token: Option<String>,
    lookup_delay_secs: Option<u64>,
    move_delay_secs: Option<u64>,
    webhook_url: Option<String>,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    mtidy: MtidyConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) root: PathBuf,
    pub(crate) debug: bool,
    pub(crate) dryrun: bool,
    pub(crate) log_file: bool,
    pub(crate) recurse: bool,
    pub(crate) verbose: bool,
    pub(crate) extensions: Vec<String>,
    pub(crate) min_size_mb: u64,
    pub(crate) quarantine_dir: String,
    pub(crate) action_file: PathBuf,
    pub(crate) record_file: PathBuf,
    pub(crate) unknown_name: String,
    pub(crate) lookup_url: Option<String>,
    pub(crate) lookup_token: Option<String>,
    pub(crate) lookup_delay: Duration,
    pub(crate) move_delay: Duration,
    pub(crate) webhook_url: Option<String>,
}

impl MtidyConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    pub fn get_user_config() -> Self {
        media_tidy::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|error| {
                        print_error!("Error reading config file {}: {error}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|error| {
                        print_error!("Error parsing config file: {error}");
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse the `[mtidy]` section from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<UserConfig>(toml_str).map(|config| config.mtidy)
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// Options given for the selected stage take priority over the config file.
    ///
    /// # Errors
    /// Returns an error if the target directory does not exist.
    pub fn from_args(args: Args, user_config: MtidyConfig) -> Result<Self> {
        let root_arg = args.path.or(user_config.root);
        let root = media_tidy::resolve_root(root_arg.as_deref())?;

        let extensions: Vec<String> = user_config
            .extensions
            .into_iter()
            .chain(args.extensions)
            .map(|extension| extension.trim().trim_start_matches('.').to_lowercase())
            .filter(|extension| !extension.is_empty())
            .unique()
            .collect();
        let extensions = if extensions.is_empty() {
            DEFAULT_MEDIA_EXTENSIONS.iter().map(ToString::to_string).collect()
        } else {
            extensions
        };

        let mut min_size_mb = user_config.min_size_mb.unwrap_or(DEFAULT_MIN_SIZE_MB);
        let mut action_file = user_config
            .action_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ACTION_FILE));
        let mut record_file = user_config
            .record_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_FILE));
        let mut lookup_url = user_config.lookup_url.filter(|url| !url.trim().is_empty());

        match args.command {
            Some(Command::Clean { min_size_mb: Some(size) }) => min_size_mb = size,
            Some(Command::Emit { output: Some(path) }) | Some(Command::Apply { action_file: Some(path) }) => {
                action_file = path;
            }
            Some(Command::Lookup { output, url }) => {
                if let Some(path) = output {
                    record_file = path;
                }
                if url.is_some() {
                    lookup_url = url;
                }
            }
            Some(Command::File { input: Some(path) }) => record_file = path,
            _ => {}
        }

        Ok(Self {
            root,
            debug: args.debug || user_config.debug,
            dryrun: args.print || user_config.dryrun,
            log_file: args.log || user_config.log_file,
            recurse: args.recurse || user_config.recurse,
            verbose: args.verbose || user_config.verbose,
            extensions,
            min_size_mb,
            quarantine_dir: user_config
                .quarantine_dir
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_QUARANTINE_DIR.to_string()),
            action_file,
            record_file,
            unknown_name: user_config
                .unknown_name
                .unwrap_or_else(|| DEFAULT_UNKNOWN_NAME.to_string()),
            lookup_url,
            lookup_token: user_config.lookup_token,
            lookup_delay: Duration::from_secs(user_config.lookup_delay_secs.unwrap_or(DEFAULT_LOOKUP_DELAY_SECS)),
            move_delay: Duration::from_secs(user_config.move_delay_secs.unwrap_or_default()),
            webhook_url: user_config.webhook_url.filter(|url| !url.trim().is_empty()),
        })
    }

    /// File stems of the JSON artifacts that are stored directly in `dir`.
    pub(crate) fn artifact_stems_in(&self, dir: &Path) -> Vec<String> {
        [&self.action_file, &self.record_file]
            .into_iter()
            .filter(|artifact| artifact_dir(artifact) == dir)
            .filter_map(|artifact| artifact.file_stem())
            .map(media_tidy::os_str_to_string)
            .collect()
    }
}

/// Directory of an artifact path, with relative paths resolved against the working directory.
fn artifact_dir(artifact: &Path) -> PathBuf {
    let parent = artifact.parent().unwrap_or_else(|| Path::new(""));
    let dir = if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent.to_path_buf()
    };
    dunce::canonicalize(&dir).unwrap_or(dir)
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "  root:           {}", self.root.display())?;
        writeln!(f, "  debug:          {}", colorize_bool(self.debug))?;
        writeln!(f, "  dryrun:         {}", colorize_bool(self.dryrun))?;
        writeln!(f, "  log file:       {}", colorize_bool(self.log_file))?;
        writeln!(f, "  recurse:        {}", colorize_bool(self.recurse))?;
        writeln!(f, "  verbose:        {}", colorize_bool(self.verbose))?;
        writeln!(f, "  extensions:     [{}]", self.extensions.iter().join(", "))?;
        writeln!(f, "  min size:       {} MB", self.min_size_mb)?;
        writeln!(f, "  quarantine dir: {}", self.quarantine_dir)?;
        writeln!(f, "  action file:    {}", self.action_file.display())?;
        writeln!(f, "  record file:    {}", self.record_file.display())?;
        writeln!(f, "  unknown name:   {}", self.unknown_name)?;
        writeln!(f, "  lookup url:     {}", self.lookup_url.as_deref().unwrap_or_default())?;
        writeln!(f, "  lookup delay:   {:?}", self.lookup_delay)?;
        writeln!(f, "  move delay:     {:?}", self.move_delay)?;
        write!(f, "  webhook:        {}", colorize_bool(self.webhook_url.is_some()))
    }
}
