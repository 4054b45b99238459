use anyhow::{Context as _, Result};
use clap::Args;
use roster_core::config::{load_config, write_default_config};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug, Default)]
pub struct InitArgs {}

const GITIGNORE: &str = "roster.db\nroster.db-wal\nroster.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config_path: PathBuf,
    config_created: bool,
    database: PathBuf,
    schema_version: u32,
}

/// Execute `roster init`. Creates the project skeleton:
///
/// ```text
/// .roster/
///   config.toml   (default config, kept if already present)
///   .gitignore    (database files)
///   roster.db     (bookkeeping tables only; the snapshot table waits
///                  for the first snapshot)
/// ```
///
/// # Errors
///
/// Returns an error if any filesystem or database operation fails.
pub fn run_init(_args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let (config_path, config_created) = write_default_config(project_root)?;

    let gitignore = project_root.join(".roster/.gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, GITIGNORE)
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    let config = load_config(project_root)?;
    let database = config.store.resolved_path(project_root);
    let store = super::open_store(project_root, &config)?;
    let schema_version = store.schema_version()?;
    store.close()?;

    let report = InitReport {
        config_path,
        config_created,
        database,
        schema_version,
    };

    render(output, &report, |report, w| {
        if report.config_created {
            pretty_kv(w, "config", report.config_path.display().to_string())?;
        } else {
            pretty_kv(w, "config", format!("{} (kept)", report.config_path.display()))?;
        }
        pretty_kv(w, "database", report.database.display().to_string())?;
        writeln!(w, "Initialized roster. Next: `roster snapshot`.")
    })
}
