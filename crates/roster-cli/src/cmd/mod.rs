pub mod changes;
pub mod columns;
pub mod completions;
pub mod dates;
pub mod diff;
pub mod init;
pub mod run;
pub mod snapshot;
pub mod stats;

use std::path::Path;

use anyhow::Context as _;
use chrono::{Local, NaiveDate};
use roster_core::RosterError;
use roster_core::config::RosterConfig;
use roster_core::store::SnapshotStore;

use crate::output::{CliError, OutputMode, render_error};

/// Open the configured snapshot database, creating it if needed.
pub fn open_store(project_root: &Path, config: &RosterConfig) -> anyhow::Result<SnapshotStore> {
    let path = config.store.resolved_path(project_root);
    SnapshotStore::open(&path, config.store.layout())
        .with_context(|| format!("Failed to open snapshot store {}", path.display()))
}

/// Explicit `--as-of`/`--run-date` value, or the local calendar date.
pub fn date_or_today(explicit: Option<NaiveDate>) -> NaiveDate {
    explicit.unwrap_or_else(|| Local::now().date_naive())
}

/// Report a core error in the requested format and hand it back for `?`.
pub fn fail(output: OutputMode, err: RosterError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::from(&err)) {
        tracing::warn!(%render_err, "failed to render error");
    }
    anyhow::Error::new(err)
}
