use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use roster_core::config::RosterConfig;
use serde::Serialize;

use crate::output::{OutputMode, render};

/// Arguments for `roster columns`.
#[derive(Args, Debug, Default)]
pub struct ColumnsArgs {}

#[derive(Debug, Serialize)]
struct ColumnsOutput {
    table: String,
    run_date_column: String,
    columns: Vec<String>,
}

/// Execute `roster columns`: list the frozen column set.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or has no snapshot table.
pub fn run_columns(
    _args: &ColumnsArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_store(project_root, config)?;
    let column_set = store.column_set().map_err(|err| super::fail(output, err))?;

    let payload = ColumnsOutput {
        table: store.table().to_string(),
        run_date_column: column_set.run_date_column().to_string(),
        columns: column_set.names().map(str::to_string).collect(),
    };

    render(output, &payload, |payload, w| {
        for name in &payload.columns {
            writeln!(w, "{name}")?;
        }
        Ok(())
    })
}
