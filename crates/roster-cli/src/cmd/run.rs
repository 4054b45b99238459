//! `roster run`: the scheduled job. Snapshot, compare with the previous run,
//! and append the change report.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use roster_core::config::RosterConfig;
use roster_core::snapshot::SnapshotReport;
use serde::Serialize;
use tracing::info;

use super::changes::{ChangesOutput, append_report, build_changes};
use super::snapshot::{SourceArgs, record_snapshot};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `roster run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the report without appending it to the report file.
    #[arg(long)]
    pub no_append: bool,
}

#[derive(Debug, Serialize)]
struct RunOutput {
    snapshot: SnapshotReport,
    /// `None` on the very first run.
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<ChangesOutput>,
    comparison_skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    appended_to: Option<PathBuf>,
}

/// Execute `roster run`.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be recorded, the comparison
/// fails for a reason other than a missing previous run, or the report
/// file cannot be written.
pub fn run_run(
    args: &RunArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let snapshot = record_snapshot(&args.source, config, output, project_root)?;
    let store = super::open_store(project_root, config)?;

    let (changes, appended_to) = match build_changes(&store, config, snapshot.run_date) {
        Ok(changes) => {
            let appended_to = if args.no_append {
                None
            } else {
                Some(append_report(&changes.report, config, project_root)?)
            };
            (Some(changes), appended_to)
        }
        Err(err) if err.is_no_history() => {
            info!(run_date = %snapshot.run_date, "no earlier run; comparison skipped");
            (None, None)
        }
        Err(err) => return Err(super::fail(output, err)),
    };
    store.close()?;

    let result = RunOutput {
        snapshot,
        comparison_skipped: changes.is_none(),
        changes,
        appended_to,
    };

    render_mode(
        output,
        &result,
        |result, w| match &result.changes {
            Some(changes) => writeln!(w, "{}", changes.report.render_text()),
            None => writeln!(w, "first snapshot recorded; nothing to compare"),
        },
        render_run_pretty,
    )
}

fn render_run_pretty(result: &RunOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Snapshot")?;
    pretty_kv(w, "run date", result.snapshot.run_date.to_string())?;
    pretty_kv(w, "stored", result.snapshot.stored.to_string())?;

    let Some(changes) = &result.changes else {
        pretty_kv(w, "changes", "first snapshot; nothing to compare")?;
        return Ok(());
    };
    let report = &changes.report;
    pretty_section(w, &format!("Changes since {}", report.previous))?;
    pretty_kv(w, "new", report.new.len().to_string())?;
    pretty_kv(w, "deleted", report.deleted.len().to_string())?;
    pretty_kv(w, "reactivated", report.reactivated.len().to_string())?;
    if !changes.unclassified.is_empty() {
        pretty_kv(w, "unclassified", changes.unclassified.len().to_string())?;
    }
    if let Some(path) = &result.appended_to {
        pretty_kv(w, "report", path.display().to_string())?;
    }
    Ok(())
}
