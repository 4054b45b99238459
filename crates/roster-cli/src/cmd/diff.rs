//! `roster diff`: raw set differences between the latest two runs.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use roster_core::config::RosterConfig;
use roster_core::diff::{DiffEngine, SnapshotDiff};
use roster_core::value::Tuple;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `roster diff`.
#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    /// Attributes to compare (comma separated). Omit to compare every column.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub attrs: Vec<String>,

    /// Compare the run of this date instead of today's.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,
}

/// Execute `roster diff`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, no earlier run exists,
/// or none of the requested attributes are stored.
pub fn run_diff(
    args: &DiffArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_store(project_root, config)?;
    let today = super::date_or_today(args.as_of);
    // Blank names are kept: an all-blank request is invalid, not empty.
    let attrs: Vec<String> = args.attrs.iter().map(|a| a.trim().to_string()).collect();

    let diff = DiffEngine::new(&store)
        .compare_as_of(today, &attrs)
        .map_err(|err| super::fail(output, err))?;

    render_mode(output, &diff, render_diff_text, render_diff_pretty)
}

fn join_tuple(tuple: &Tuple) -> String {
    tuple
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_diff_text(diff: &SnapshotDiff, w: &mut dyn Write) -> std::io::Result<()> {
    for tuple in &diff.added {
        writeln!(w, "+\t{}", join_tuple(tuple))?;
    }
    for tuple in &diff.removed {
        writeln!(w, "-\t{}", join_tuple(tuple))?;
    }
    Ok(())
}

fn render_diff_pretty(diff: &SnapshotDiff, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "today", diff.today.to_string())?;
    pretty_kv(w, "previous", diff.previous.to_string())?;
    pretty_kv(w, "attributes", diff.attrs.join(", "))?;
    writeln!(w)?;

    pretty_section(w, &format!("Added ({})", diff.added.len()))?;
    for tuple in &diff.added {
        writeln!(w, "  {}", join_tuple(tuple))?;
    }
    writeln!(w)?;
    pretty_section(w, &format!("Removed ({})", diff.removed.len()))?;
    for tuple in &diff.removed {
        writeln!(w, "  {}", join_tuple(tuple))?;
    }
    Ok(())
}
