//! `roster changes`: new, deleted, and reactivated members since the last run.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use roster_core::RosterError;
use roster_core::config::RosterConfig;
use roster_core::diff::DiffEngine;
use roster_core::report::ChangeReport;
use roster_core::store::SnapshotStore;
use roster_core::value::Leaf;
use serde::Serialize;
use tracing::info;

use crate::output::{OutputMode, render};

/// Arguments for `roster changes`.
#[derive(Args, Debug, Default)]
pub struct ChangesArgs {
    /// Report on the run of this date instead of today's.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,

    /// Append the dated report to the configured report file.
    #[arg(long)]
    pub append_report: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangesOutput {
    #[serde(flatten)]
    pub report: ChangeReport,
    /// Changed identities whose previous status was neither flag value.
    pub unclassified: Vec<Leaf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appended_to: Option<PathBuf>,
}

/// Execute `roster changes`.
///
/// # Errors
///
/// Returns an error if there is no earlier run, the configured columns are
/// missing, or the report file cannot be written.
pub fn run_changes(
    args: &ChangesArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_store(project_root, config)?;
    let today = super::date_or_today(args.as_of);
    let mut changes =
        build_changes(&store, config, today).map_err(|err| super::fail(output, err))?;

    if args.append_report {
        changes.appended_to = Some(append_report(&changes.report, config, project_root)?);
    }

    render(output, &changes, |changes, w| {
        writeln!(w, "{}", changes.report.render_text())?;
        if !changes.unclassified.is_empty() {
            let names: Vec<String> = changes.unclassified.iter().map(ToString::to_string).collect();
            writeln!(w, "\n\nUnclassified:\n{}", names.join("\n"))?;
        }
        Ok(())
    })
}

/// Diff the configured identity/status pair and resolve report details.
pub fn build_changes(
    store: &SnapshotStore,
    config: &RosterConfig,
    today: NaiveDate,
) -> Result<ChangesOutput, RosterError> {
    let diff = DiffEngine::new(store).compare_as_of(today, &config.diff.attrs())?;
    let classification = diff.classify(&config.diff.flags())?;
    let report = ChangeReport::build(store, &diff, &classification, &config.report.detail_columns)?;
    Ok(ChangesOutput {
        report,
        unclassified: classification.unclassified.into_iter().collect(),
        appended_to: None,
    })
}

/// Append the dated report to `report.file`, creating it if needed.
pub fn append_report(
    report: &ChangeReport,
    config: &RosterConfig,
    project_root: &Path,
) -> Result<PathBuf> {
    let path = if config.report.file.is_absolute() {
        config.report.file.clone()
    } else {
        project_root.join(&config.report.file)
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open report file {}", path.display()))?;
    file.write_all(report.render_dated().as_bytes())
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    info!(path = %path.display(), "appended change report");
    Ok(path)
}
