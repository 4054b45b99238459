use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::aggregate::{AggregateOptions, WeekStart};
use crate::diff::StatusFlags;
use crate::store::{DEFAULT_RUN_DATE_COLUMN, DEFAULT_TABLE, StoreLayout};
use crate::value::Leaf;

/// Project config location relative to the working directory.
pub const CONFIG_PATH: &str = ".roster/config.toml";

/// Environment variable that overrides `directory.token`.
pub const TOKEN_ENV: &str = "SLACK_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database path; relative paths resolve against the project root.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_run_date_column")]
    pub run_date_column: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            table: default_table(),
            run_date_column: default_run_date_column(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn layout(&self) -> StoreLayout {
        StoreLayout {
            table: self.table.clone(),
            run_date_column: self.run_date_column.clone(),
        }
    }

    #[must_use]
    pub fn resolved_path(&self, project_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            project_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Members requested per `users.list` page.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Retries per page after a throttled response.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wait used when a throttled response carries no `Retry-After`.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Optional file the raw member list is written to on every fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_path: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            page_limit: default_page_limit(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            dump_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default = "default_diff_identity")]
    pub identity_column: String,
    #[serde(default = "default_status_column")]
    pub status_column: String,
    #[serde(default = "default_active_value")]
    pub active_value: Leaf,
    #[serde(default = "default_inactive_value")]
    pub inactive_value: Leaf,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            identity_column: default_diff_identity(),
            status_column: default_status_column(),
            active_value: default_active_value(),
            inactive_value: default_inactive_value(),
        }
    }
}

impl DiffConfig {
    /// `(identity, status)`: the attribute pair classification reads.
    #[must_use]
    pub fn attrs(&self) -> Vec<String> {
        vec![self.identity_column.clone(), self.status_column.clone()]
    }

    #[must_use]
    pub fn flags(&self) -> StatusFlags {
        StatusFlags {
            active: self.active_value.clone(),
            inactive: self.inactive_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    #[serde(default = "default_aggregate_identity")]
    pub identity_column: String,
    #[serde(default = "default_status_column")]
    pub status_column: String,
    #[serde(default = "default_updated_column")]
    pub updated_column: String,
    #[serde(default = "default_title_column")]
    pub title_column: String,
    #[serde(default = "default_bot_column")]
    pub bot_column: String,
    #[serde(default = "default_category_delimiter")]
    pub category_delimiter: String,
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: Vec<String>,
    #[serde(default = "default_min_active")]
    pub min_active: usize,
    #[serde(default = "default_series_cutoff")]
    pub series_cutoff: NaiveDate,
    #[serde(default)]
    pub week_start: WeekStart,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            identity_column: default_aggregate_identity(),
            status_column: default_status_column(),
            updated_column: default_updated_column(),
            title_column: default_title_column(),
            bot_column: default_bot_column(),
            category_delimiter: default_category_delimiter(),
            excluded_categories: default_excluded_categories(),
            min_active: default_min_active(),
            series_cutoff: default_series_cutoff(),
            week_start: WeekStart::default(),
        }
    }
}

impl AggregateConfig {
    #[must_use]
    pub fn options(&self) -> AggregateOptions {
        AggregateOptions {
            identity_column: self.identity_column.clone(),
            status_column: self.status_column.clone(),
            updated_column: self.updated_column.clone(),
            title_column: self.title_column.clone(),
            bot_column: self.bot_column.clone(),
            category_delimiter: self.category_delimiter.clone(),
            excluded_categories: self.excluded_categories.clone(),
            min_active: self.min_active,
            series_cutoff: self.series_cutoff,
            week_start: self.week_start,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Columns printed for each changed identity, joined with ` | `.
    #[serde(default = "default_detail_columns")]
    pub detail_columns: Vec<String>,
    /// Append-only text file that `roster run` writes dated reports to.
    #[serde(default = "default_report_file")]
    pub file: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            detail_columns: default_detail_columns(),
            file: default_report_file(),
        }
    }
}

/// Load `.roster/config.toml`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(project_root: &Path) -> Result<RosterConfig> {
    let path = project_root.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(RosterConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RosterConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the default config unless one already exists.
///
/// Returns the config path and whether it was created now.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_default_config(project_root: &Path) -> Result<(PathBuf, bool)> {
    let path = project_root.join(CONFIG_PATH);
    if path.exists() {
        return Ok((path, false));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(&RosterConfig::default())
        .context("Failed to serialize default config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok((path, true))
}

/// Load the project config and apply environment overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded.
pub fn resolve_config(project_root: &Path) -> Result<RosterConfig> {
    let mut config = load_config(project_root)?;
    apply_token_override(&mut config, env::var(TOKEN_ENV).ok());
    Ok(config)
}

fn apply_token_override(config: &mut RosterConfig, env_token: Option<String>) {
    if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
        config.directory.token = Some(token);
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".roster/roster.db")
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_run_date_column() -> String {
    DEFAULT_RUN_DATE_COLUMN.to_string()
}

fn default_api_base() -> String {
    "https://slack.com/api".to_string()
}

const fn default_page_limit() -> u32 {
    200
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_retry_delay_secs() -> u64 {
    5
}

fn default_diff_identity() -> String {
    "name".to_string()
}

fn default_status_column() -> String {
    "deleted".to_string()
}

const fn default_active_value() -> Leaf {
    Leaf::Integer(0)
}

const fn default_inactive_value() -> Leaf {
    Leaf::Integer(1)
}

fn default_aggregate_identity() -> String {
    AggregateOptions::default().identity_column
}

fn default_updated_column() -> String {
    AggregateOptions::default().updated_column
}

fn default_title_column() -> String {
    AggregateOptions::default().title_column
}

fn default_bot_column() -> String {
    AggregateOptions::default().bot_column
}

fn default_category_delimiter() -> String {
    AggregateOptions::default().category_delimiter
}

fn default_excluded_categories() -> Vec<String> {
    AggregateOptions::default().excluded_categories
}

fn default_min_active() -> usize {
    AggregateOptions::default().min_active
}

fn default_series_cutoff() -> NaiveDate {
    AggregateOptions::default().series_cutoff
}

fn default_detail_columns() -> Vec<String> {
    vec!["name".into(), "real_name".into(), "title".into()]
}

fn default_report_file() -> PathBuf {
    PathBuf::from("reports.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let cfg = load_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.store.table, "Slack");
        assert_eq!(cfg.store.run_date_column, "date");
        assert_eq!(cfg.diff.attrs(), ["name", "deleted"]);
        assert_eq!(cfg.diff.flags(), StatusFlags::default());
        assert_eq!(cfg.aggregate.options(), AggregateOptions::default());
        assert_eq!(cfg.directory.max_retries, 5);
        assert!(cfg.directory.token.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: RosterConfig = toml::from_str(
            r#"
[store]
table = "Members"

[diff]
status_column = "disabled"
active_value = false
inactive_value = true

[aggregate]
week_start = "iso"
series_cutoff = "2022-06-01"
"#,
        )
        .expect("parse");

        assert_eq!(cfg.store.table, "Members");
        assert_eq!(cfg.store.run_date_column, "date");
        assert_eq!(cfg.diff.identity_column, "name");
        assert_eq!(cfg.diff.flags().active, Leaf::Bool(false));
        assert_eq!(cfg.aggregate.week_start, WeekStart::Iso);
        assert_eq!(
            cfg.aggregate.series_cutoff,
            NaiveDate::from_ymd_opt(2022, 6, 1).expect("valid date")
        );
        assert_eq!(cfg.aggregate.min_active, 2);
    }

    #[test]
    fn default_config_round_trips_through_init() {
        let root = tempfile::tempdir().expect("temp dir must be created");
        let (path, created) = write_default_config(root.path()).expect("write");
        assert!(created);
        assert!(path.ends_with(CONFIG_PATH));

        let (_, created_again) = write_default_config(root.path()).expect("write");
        assert!(!created_again);

        let cfg = load_config(root.path()).expect("load");
        assert_eq!(cfg.report.detail_columns, ["name", "real_name", "title"]);
        assert_eq!(cfg.aggregate.excluded_categories, ["null", "no", "Jesspatch"]);
    }

    #[test]
    fn token_override_ignores_blank_values() {
        let mut cfg = RosterConfig::default();
        apply_token_override(&mut cfg, Some("   ".into()));
        assert!(cfg.directory.token.is_none());
        apply_token_override(&mut cfg, Some("xoxb-1".into()));
        assert_eq!(cfg.directory.token.as_deref(), Some("xoxb-1"));
    }

    #[test]
    fn relative_store_path_resolves_against_root() {
        let cfg = StoreConfig::default();
        assert_eq!(
            cfg.resolved_path(Path::new("/srv/roster")),
            PathBuf::from("/srv/roster/.roster/roster.db")
        );
    }
}
