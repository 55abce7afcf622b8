use anyhow::{Context, Result};
use colored::Colorize;

use media_tidy::actions::{self, ActionMap, ActionProcessor};
use media_tidy::journal::Journal;
use media_tidy::lookup::{self, MetatubeClient};
use media_tidy::mover::Mover;
use media_tidy::notify::{self, WebhookNotifier};
use media_tidy::organize::{self, MediaFilter};
use media_tidy::record::{RecordAssembler, RecordMap};
use media_tidy::{artifact, folders, print_bold, prune};

use crate::Command;
use crate::config::Config;

/// Runs one pipeline stage on the target directory.
#[derive(Debug)]
pub struct MediaTidy {
    config: Config,
}

impl MediaTidy {
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: &Command) -> Result<()> {
        if self.config.debug {
            eprintln!("{}", self.config);
        }
        let stage = stage_name(command);
        print_bold!("{stage}: {}", self.config.root.display());

        let mut mover = self.create_mover(stage)?;
        let root = self.config.root.clone();

        let summary = match command {
            Command::Consolidate => folders::consolidate(&root, &mut mover).map(|report| {
                format!(
                    "families {}, moved {}, failed {}, pruned {}",
                    report.families, report.moved, report.failed, report.pruned
                )
            })?,
            Command::Clean { .. } => {
                let filter = MediaFilter::new(&self.config.extensions, self.config.min_size_mb);
                organize::clean_and_move(&root, &filter, &mut mover)?.to_string()
            }
            Command::Emit { .. } => self.emit()?,
            Command::Apply { .. } => {
                let actions: ActionMap = artifact::load(&self.config.action_file)?;
                ActionProcessor::new(&self.config.quarantine_dir, self.config.recurse)
                    .apply(&root, &actions, &mut mover)?
                    .to_string()
            }
            Command::Lookup { .. } => self.lookup().await?,
            Command::File { .. } => {
                let records: RecordMap = artifact::load(&self.config.record_file)?;
                organize::file_by_records(&root, &records, &mut mover, self.config.move_delay)?.to_string()
            }
            Command::Rename => {
                organize::rename_to_folder(&root, &self.config.extensions, &self.config.quarantine_dir, &mut mover)?
                    .to_string()
            }
            Command::Prune => {
                let removed = prune::prune_empty_dirs(&root, &mut mover)?;
                format!("removed {removed} empty directories")
            }
        };

        if self.config.dryrun {
            println!("{}", format!("Dryrun {stage}: {summary}").cyan());
        } else {
            println!("{}", format!("{stage}: {summary}").green());
        }
        Ok(())
    }

    /// Create the mover, with a journal unless disabled or in dryrun.
    fn create_mover(&self, stage: &str) -> Result<Mover> {
        let mover = Mover::new(&self.config.root, self.config.dryrun, self.config.verbose);
        if !self.config.log_file || self.config.dryrun {
            return Ok(mover);
        }
        let journal = Journal::new(stage)?;
        if self.config.verbose {
            println!("Logging changes to: {}", journal.path().display());
        }
        Ok(mover.with_journal(journal))
    }

    /// Write the action file for the files in the target directory.
    fn emit(&self) -> Result<String> {
        let root = &self.config.root;
        let mut actions = actions::emit_action_map(root)?;
        let artifacts = self.config.artifact_stems_in(root);
        actions.retain(|stem, _| !artifacts.contains(stem));

        if self.config.dryrun {
            println!("{}", artifact::to_pretty_json(&actions)?);
            return Ok(format!("{} entries", actions.len()));
        }
        artifact::save(&self.config.action_file, &actions)?;
        Ok(format!("{} entries written to {}", actions.len(), self.config.action_file.display()))
    }

    /// Look up every media file and merge the results into the record file.
    async fn lookup(&self) -> Result<String> {
        let url = self
            .config
            .lookup_url
            .as_deref()
            .context("No metadata server configured: set `lookup_url` in the [mtidy] config section or use --url")?;
        let client = MetatubeClient::new(url, self.config.lookup_token.as_deref())?;
        let assembler = RecordAssembler::new(&self.config.unknown_name);

        let found = lookup::lookup_records(
            &self.config.root,
            &client,
            &assembler,
            &self.config.extensions,
            self.config.lookup_delay,
        )
        .await?;

        let mut records: RecordMap = artifact::load_or_default(&self.config.record_file)?;
        let count = found.len();
        records.extend(found);

        let summary = if self.config.dryrun {
            println!("{}", artifact::to_pretty_json(&records)?);
            format!("{count} records found")
        } else {
            artifact::save(&self.config.record_file, &records)?;
            format!("{count} records written to {}", self.config.record_file.display())
        };

        if let Some(webhook_url) = &self.config.webhook_url {
            let notifier = WebhookNotifier::new(webhook_url)?;
            notify::send_or_warn(&notifier, &format!("Lookup finished: {summary}")).await;
        }
        Ok(summary)
    }
}

const fn stage_name(command: &Command) -> &'static str {
    match command {
        Command::Consolidate => "consolidate",
        Command::Clean { .. } => "clean",
        Command::Emit { .. } => "emit",
        Command::Apply { .. } => "apply",
        Command::Lookup { .. } => "lookup",
        Command::File { .. } => "file",
        Command::Rename => "rename",
        Command::Prune => "prune",
    }
}
