//! `roster snapshot`: record today's directory membership.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use roster_core::config::{RosterConfig, TOKEN_ENV};
use roster_core::flatten::Record;
use roster_core::snapshot::{DirectorySource, SnapshotReport, store_records};
use tracing::info;

use crate::directory::{FileDirectory, SlackDirectory};
use crate::output::{CliError, OutputMode, pretty_kv, render, render_error};

/// Where a run's member list comes from.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Read members from a JSON file instead of calling the Slack API.
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,

    /// Also write the fetched member list to this file.
    #[arg(long, value_name = "PATH")]
    pub dump: Option<PathBuf>,

    /// Record the snapshot under this date instead of today.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub run_date: Option<NaiveDate>,
}

/// Arguments for `roster snapshot`.
#[derive(Args, Debug, Default)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Execute `roster snapshot`.
///
/// # Errors
///
/// Returns an error if fetching, flattening, or storing the snapshot fails.
pub fn run_snapshot(
    args: &SnapshotArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let report = record_snapshot(&args.source, config, output, project_root)?;
    render(output, &report, |report, w| render_snapshot_human(report, w))
}

/// Fetch, optionally dump, and store one snapshot.
pub fn record_snapshot(
    source: &SourceArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<SnapshotReport> {
    let records = fetch_records(source, config, output)?;

    if let Some(dump) = source.dump.as_ref().or(config.directory.dump_path.as_ref()) {
        let payload =
            serde_json::to_vec_pretty(&records).context("Failed to serialize member list")?;
        std::fs::write(dump, payload)
            .with_context(|| format!("Failed to write member dump {}", dump.display()))?;
        info!(path = %dump.display(), members = records.len(), "wrote member dump");
    }

    let run_date = super::date_or_today(source.run_date);
    let mut store = super::open_store(project_root, config)?;
    let report =
        store_records(&records, &mut store, run_date).map_err(|err| super::fail(output, err))?;
    store.close()?;
    Ok(report)
}

fn fetch_records(
    source: &SourceArgs,
    config: &RosterConfig,
    output: OutputMode,
) -> Result<Vec<Record>> {
    let directory: Box<dyn DirectorySource> = if let Some(path) = &source.from_file {
        let file = FileDirectory::new(path);
        info!(path = %file.path().display(), "reading members from file");
        Box::new(file)
    } else {
        let Some(token) = config.directory.token.clone() else {
            render_error(
                output,
                &CliError::with_details(
                    "no directory token configured",
                    format!("set {TOKEN_ENV} or directory.token in .roster/config.toml"),
                    "missing_token",
                ),
            )?;
            anyhow::bail!("missing directory token");
        };
        Box::new(SlackDirectory::new(
            config.directory.api_base.clone(),
            token,
            config.directory.page_limit,
            config.directory.max_retries,
            Duration::from_secs(config.directory.retry_delay_secs),
        ))
    };

    let records = directory
        .list_current_records()
        .map_err(|err| super::fail(output, err))?;
    info!(members = records.len(), "fetched directory members");
    Ok(records)
}

fn render_snapshot_human(report: &SnapshotReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "run date", report.run_date.to_string())?;
    pretty_kv(w, "fetched", report.fetched.to_string())?;
    pretty_kv(w, "stored", report.stored.to_string())?;
    if report.schema_established {
        pretty_kv(w, "schema", "column set frozen from this snapshot")?;
    }
    if report.merged_into_existing_date {
        pretty_kv(w, "note", "run date already recorded; rows merged")?;
    }
    if !report.dropped_attributes.is_empty() {
        pretty_kv(w, "dropped", report.dropped_attributes.join(", "))?;
    }
    Ok(())
}
