use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use roster_core::config::RosterConfig;
use roster_core::store::RunRecord;
use serde::Serialize;

use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `roster dates`.
#[derive(Args, Debug, Default)]
pub struct DatesArgs {}

#[derive(Debug, Serialize)]
struct RunDate {
    date: NaiveDate,
    rows: usize,
    /// Appends recorded under this date; more than one means same-day reruns.
    runs: Vec<RunEntry>,
}

#[derive(Debug, Serialize)]
struct RunEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    recorded_at: Option<DateTime<Utc>>,
    rows_stored: usize,
    attributes_dropped: usize,
}

impl From<&RunRecord> for RunEntry {
    fn from(run: &RunRecord) -> Self {
        Self {
            recorded_at: run.recorded_at(),
            rows_stored: run.rows_stored,
            attributes_dropped: run.attributes_dropped,
        }
    }
}

/// Execute `roster dates`: every recorded run date with its row count and
/// the appends logged for it.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or has no snapshot table.
pub fn run_dates(
    _args: &DatesArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_store(project_root, config)?;
    let counts = store.date_counts().map_err(|err| super::fail(output, err))?;
    let runs = store.runs().map_err(|err| super::fail(output, err))?;

    let dates: Vec<RunDate> = counts
        .into_iter()
        .map(|(date, rows)| RunDate {
            date,
            rows,
            runs: runs
                .iter()
                .filter(|run| run.run_date == date)
                .map(RunEntry::from)
                .collect(),
        })
        .collect();

    render_mode(
        output,
        &dates,
        |dates, w| {
            for run in dates {
                writeln!(w, "{}\t{}\t{}", run.date, run.rows, run.runs.len())?;
            }
            Ok(())
        },
        |dates, w| {
            pretty_section(w, &format!("Recorded runs ({})", dates.len()))?;
            for run in dates {
                let last = run
                    .runs
                    .iter()
                    .filter_map(|entry| entry.recorded_at)
                    .max()
                    .map_or_else(|| "-".to_string(), |at| at.format("%H:%M:%S UTC").to_string());
                let dropped: usize = run.runs.iter().map(|entry| entry.attributes_dropped).sum();
                writeln!(
                    w,
                    "{}  {:>8} rows  {:>2} append(s)  last {last}  dropped {dropped}",
                    run.date,
                    run.rows,
                    run.runs.len(),
                )?;
            }
            Ok(())
        },
    )
}
