//! Schema-frozen `SQLite` snapshot store.
//!
//! One wide table holds every snapshot. Its column set is fixed the first
//! time [`SnapshotStore::initialize`] creates it and never changes after:
//! later snapshots insert only attributes the table already knows, missing
//! ones become `NULL`, and extra ones are dropped.
//!
//! Runtime defaults follow the other on-disk databases we ship:
//! - `journal_mode = WAL` so a reader never sees half of a run
//! - `busy_timeout = 5s` to ride out a concurrent reader's lock
//!
//! Run dates are stored as `YYYY-MM-DD` text, so comparison operators on the
//! run-date column order chronologically.

pub mod migrations;
pub mod schema;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params, params_from_iter};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RosterError};
use crate::flatten::FlatRow;
use crate::value::{Leaf, Tuple};

pub use schema::{ColumnSet, quote_ident};

/// Busy timeout used for snapshot DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default snapshot table name.
pub const DEFAULT_TABLE: &str = "Slack";

/// Default name of the synthetic run-date column.
pub const DEFAULT_RUN_DATE_COLUMN: &str = "date";

const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Which table and run-date column the store works against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub table: String,
    pub run_date_column: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            run_date_column: DEFAULT_RUN_DATE_COLUMN.to_string(),
        }
    }
}

/// Outcome of one [`SnapshotStore::append`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendSummary {
    pub run_date: NaiveDate,
    pub rows_written: usize,
    /// Distinct attribute names present in the rows but not in the column set.
    pub dropped_attributes: Vec<String>,
}

/// One row of the `roster_runs` bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub run_id: i64,
    pub run_date: NaiveDate,
    pub rows_stored: usize,
    pub attributes_dropped: usize,
    pub recorded_at_us: i64,
}

impl RunRecord {
    /// Wall-clock time the run was appended.
    #[must_use]
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.recorded_at_us)
    }
}

/// Owned handle to the snapshot database.
///
/// The handle is released on drop; [`SnapshotStore::close`] does the same
/// but reports errors from the final flush.
#[derive(Debug)]
pub struct SnapshotStore {
    conn: Connection,
    layout: StoreLayout,
}

impl SnapshotStore {
    /// Open (or create) the snapshot database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, or if
    /// opening, configuring, or migrating the database fails.
    pub fn open(path: &Path, layout: StoreLayout) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RosterError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, layout)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if configuring or migrating the database fails.
    pub fn open_in_memory(layout: StoreLayout) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, layout)
    }

    fn from_connection(mut conn: Connection, layout: StoreLayout) -> Result<Self> {
        configure_connection(&conn)?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn, layout })
    }

    /// Close the database, surfacing any error from the final flush.
    ///
    /// # Errors
    ///
    /// Returns the `SQLite` error raised while closing.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| RosterError::Sqlite(err))
    }

    /// Bookkeeping schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be read.
    pub fn schema_version(&self) -> Result<u32> {
        Ok(migrations::current_schema_version(&self.conn)?)
    }

    #[must_use]
    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.layout.table
    }

    /// Returns true once the snapshot table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if `sqlite_master` cannot be queried.
    pub fn is_initialized(&self) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![self.layout.table],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Create the snapshot table with `columns` unless it already exists.
    ///
    /// An existing table is left untouched, so a different column set passed
    /// later is never applied. Returns the column set actually in force.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails or an existing table lacks the
    /// run-date column.
    pub fn initialize(&self, columns: &ColumnSet) -> Result<ColumnSet> {
        if self.is_initialized()? {
            debug!(table = %self.layout.table, "snapshot table exists; keeping frozen column set");
            return self.column_set();
        }

        self.conn
            .execute_batch(&schema::create_table_sql(&self.layout.table, columns))?;
        debug!(
            table = %self.layout.table,
            columns = columns.len(),
            "created snapshot table"
        );
        self.column_set()
    }

    /// The frozen column set of the snapshot table.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists, or
    /// [`RosterError::MissingRunDateColumn`] for a foreign table layout.
    pub fn column_set(&self) -> Result<ColumnSet> {
        let names = self.columns(&self.layout.table)?;
        if names.is_empty() {
            return Err(RosterError::NotInitialized {
                table: self.layout.table.clone(),
            });
        }
        ColumnSet::from_table(&self.layout.run_date_column, names).ok_or_else(|| {
            RosterError::MissingRunDateColumn {
                table: self.layout.table.clone(),
                column: self.layout.run_date_column.clone(),
            }
        })
    }

    /// Append one snapshot under `run_date` in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before [`Self::initialize`],
    /// or an `SQLite` error; on error nothing from this call is visible.
    pub fn append(&mut self, run_date: NaiveDate, rows: &[FlatRow]) -> Result<AppendSummary> {
        let columns = self.column_set()?;
        let known: HashSet<&str> = columns.attributes().iter().map(String::as_str).collect();
        let date_text = format_run_date(run_date);

        let mut dropped: BTreeSet<String> = BTreeSet::new();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(&schema::insert_sql(&self.layout.table, &columns))?;
            for row in rows {
                dropped.extend(
                    row.keys()
                        .filter(|key| !known.contains(key))
                        .map(str::to_string),
                );
                let values = columns
                    .attributes()
                    .iter()
                    .map(|name| row.get(name).cloned().unwrap_or(Leaf::Null));
                let bound = std::iter::once(Leaf::Text(date_text.clone())).chain(values);
                insert.execute(params_from_iter(bound))?;
            }
        }

        tx.execute(
            "INSERT INTO roster_runs (
                run_date,
                snapshot_table,
                rows_stored,
                attributes_dropped,
                recorded_at_us
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date_text,
                self.layout.table,
                i64::try_from(rows.len()).unwrap_or(i64::MAX),
                i64::try_from(dropped.len()).unwrap_or(i64::MAX),
                Utc::now().timestamp_micros(),
            ],
        )?;
        tx.commit()?;

        debug!(
            table = %self.layout.table,
            %run_date,
            rows = rows.len(),
            dropped = dropped.len(),
            "appended snapshot"
        );

        Ok(AppendSummary {
            run_date,
            rows_written: rows.len(),
            dropped_attributes: dropped.into_iter().collect(),
        })
    }

    /// Column names of `table` in declaration order; empty if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the introspection query fails.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Every run date present in the snapshot table.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists.
    pub fn distinct_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        let columns = self.column_set()?;
        let sql = format!(
            "SELECT DISTINCT {date} FROM {table}",
            date = quote_ident(columns.run_date_column()),
            table = quote_ident(&self.layout.table),
        );
        self.collect_dates(&sql, [])
    }

    /// Run dates strictly earlier than `date`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists.
    pub fn distinct_dates_before(&self, date: NaiveDate) -> Result<BTreeSet<NaiveDate>> {
        let columns = self.column_set()?;
        let sql = format!(
            "SELECT DISTINCT {date} FROM {table} WHERE {date} < ?1",
            date = quote_ident(columns.run_date_column()),
            table = quote_ident(&self.layout.table),
        );
        self.collect_dates(&sql, [format_run_date(date)])
    }

    /// Row counts per run date, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists.
    pub fn date_counts(&self) -> Result<Vec<(NaiveDate, usize)>> {
        let columns = self.column_set()?;
        let sql = format!(
            "SELECT {date}, COUNT(*) FROM {table} GROUP BY {date} ORDER BY {date}",
            date = quote_ident(columns.run_date_column()),
            table = quote_ident(&self.layout.table),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter()
            .map(|(date, count)| {
                Ok((
                    parse_run_date(&date)?,
                    usize::try_from(count).unwrap_or(usize::MAX),
                ))
            })
            .collect()
    }

    /// Distinct projection of `attrs` over the rows of one run date.
    ///
    /// Every name in `attrs` must be a column of the snapshot table.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NoValidColumns`] when `attrs` is empty, or
    /// [`RosterError::NotInitialized`] before the table exists.
    pub fn project(&self, attrs: &[String], run_date: NaiveDate) -> Result<BTreeSet<Tuple>> {
        let columns = self.column_set()?;
        if attrs.is_empty() {
            return Err(RosterError::NoValidColumns {
                table: self.layout.table.clone(),
                requested: Vec::new(),
            });
        }

        let selection: Vec<String> = attrs.iter().map(|a| quote_ident(a)).collect();
        let sql = format!(
            "SELECT {selection} FROM {table} WHERE {date} = ?1",
            selection = selection.join(", "),
            table = quote_ident(&self.layout.table),
            date = quote_ident(columns.run_date_column()),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let width = attrs.len();
        let tuples = stmt
            .query_map([format_run_date(run_date)], |row| read_tuple(row, 0, width))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(tuples)
    }

    /// Every stored row projected onto `attrs`, oldest run first.
    ///
    /// Names the table does not know read as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists.
    pub fn history(&self, attrs: &[String]) -> Result<Vec<(NaiveDate, Tuple)>> {
        let columns = self.column_set()?;
        let known: HashSet<&str> = columns.attributes().iter().map(String::as_str).collect();
        let date = quote_ident(columns.run_date_column());
        let mut sql = format!("SELECT {date}");
        if !attrs.is_empty() {
            sql.push_str(", ");
            sql.push_str(&schema::select_list(&known, attrs.iter().map(String::as_str)));
        }
        sql.push_str(&format!(
            " FROM {table} ORDER BY {date}, rowid",
            table = quote_ident(&self.layout.table),
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let width = attrs.len();
        let raw = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, read_tuple(row, 1, width)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter()
            .map(|(date, tuple)| Ok((parse_run_date(&date)?, tuple)))
            .collect()
    }

    /// Distinct projections of `attrs` across all runs where `column = value`.
    ///
    /// An unknown `column` matches nothing; unknown `attrs` read as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotInitialized`] before the table exists.
    pub fn lookup(&self, column: &str, value: &Leaf, attrs: &[String]) -> Result<Vec<Tuple>> {
        let columns = self.column_set()?;
        if !columns.has_attribute(column) || attrs.is_empty() {
            return Ok(Vec::new());
        }
        let known: HashSet<&str> = columns.attributes().iter().map(String::as_str).collect();
        let sql = format!(
            "SELECT DISTINCT {selection} FROM {table} WHERE {column} = ?1",
            selection = schema::select_list(&known, attrs.iter().map(String::as_str)),
            table = quote_ident(&self.layout.table),
            column = quote_ident(column),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let width = attrs.len();
        let mut tuples = stmt
            .query_map([value], |row| read_tuple(row, 0, width))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        tuples.sort();
        Ok(tuples)
    }

    /// Bookkeeping rows for this store's snapshot table, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored date is malformed.
    pub fn runs(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, run_date, rows_stored, attributes_dropped, recorded_at_us
             FROM roster_runs
             WHERE snapshot_table = ?1
             ORDER BY run_id",
        )?;
        let raw = stmt
            .query_map([&self.layout.table], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(run_id, date, rows, dropped, recorded_at_us)| {
                Ok(RunRecord {
                    run_id,
                    run_date: parse_run_date(&date)?,
                    rows_stored: usize::try_from(rows).unwrap_or(0),
                    attributes_dropped: usize::try_from(dropped).unwrap_or(0),
                    recorded_at_us,
                })
            })
            .collect()
    }

    fn collect_dates<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<BTreeSet<NaiveDate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter().map(String::as_str).map(parse_run_date).collect()
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

fn read_tuple(row: &rusqlite::Row<'_>, offset: usize, width: usize) -> rusqlite::Result<Tuple> {
    (offset..offset + width).map(|idx| row.get::<_, Leaf>(idx)).collect()
}

/// Render a run date the way it is stored.
#[must_use]
pub fn format_run_date(date: NaiveDate) -> String {
    date.format(RUN_DATE_FORMAT).to_string()
}

fn parse_run_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, RUN_DATE_FORMAT)
        .map_err(|_| RosterError::InvalidRunDate { raw: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::{ColumnSet, SnapshotStore, StoreLayout};
    use crate::error::RosterError;
    use crate::flatten::FlatRow;
    use crate::value::Leaf;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
    }

    fn member(name: &str, deleted: bool) -> FlatRow {
        [
            ("id", Leaf::from(format!("U-{name}"))),
            ("name", Leaf::from(name)),
            ("deleted", Leaf::Bool(deleted)),
        ]
        .into_iter()
        .collect()
    }

    fn initialized(rows: &[FlatRow]) -> SnapshotStore {
        let store = SnapshotStore::open_in_memory(StoreLayout::default()).expect("open store");
        store
            .initialize(&ColumnSet::derive("date", rows))
            .expect("initialize");
        store
    }

    #[test]
    fn open_on_disk_sets_wal_and_busy_timeout() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested/roster.db");
        let store = SnapshotStore::open(&path, StoreLayout::default()).expect("open store");

        let journal_mode: String = store
            .conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = store
            .conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(u128::from(busy_timeout_ms), super::DEFAULT_BUSY_TIMEOUT.as_millis());

        store.close().expect("close store");
        assert!(path.exists());
    }

    #[test]
    fn append_before_initialize_is_an_error() {
        let mut store = SnapshotStore::open_in_memory(StoreLayout::default()).expect("open store");
        let err = store
            .append(day(1), &[member("a", false)])
            .expect_err("uninitialized append must fail");
        assert!(matches!(err, RosterError::NotInitialized { .. }));
        assert!(!store.is_initialized().expect("introspect"));
    }

    #[test]
    fn initialize_is_idempotent_and_freezes_first_column_set() {
        let store = initialized(&[member("a", false)]);
        let wider: FlatRow = [("id", Leaf::Null), ("tz", Leaf::Null)].into_iter().collect();
        let kept = store
            .initialize(&ColumnSet::derive("date", &[wider]))
            .expect("second initialize");
        assert_eq!(kept.attributes(), ["id", "name", "deleted"]);
        assert_eq!(
            store.columns("Slack").expect("columns"),
            ["date", "id", "name", "deleted"]
        );
    }

    #[test]
    fn extra_keys_are_dropped_and_missing_keys_stored_null() {
        let mut store = initialized(&[member("a", false)]);

        let mut extra = member("b", false);
        extra.insert("tz", "UTC");
        let sparse: FlatRow = [("name", Leaf::from("c"))].into_iter().collect();

        let summary = store.append(day(2), &[extra, sparse]).expect("append");
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.dropped_attributes, ["tz"]);
        assert_eq!(store.columns("Slack").expect("columns").len(), 4);

        let rows = store
            .project(&["name".to_string(), "id".to_string()], day(2))
            .expect("project");
        assert!(rows.contains(&vec![Leaf::from("c"), Leaf::Null]));
        assert!(rows.contains(&vec![Leaf::from("b"), Leaf::from("U-b")]));
    }

    #[test]
    fn run_date_shadows_flattened_date_key() {
        let mut store = initialized(&[member("a", false)]);
        let mut row = member("a", false);
        row.insert("date", "1999-12-31");
        store.append(day(3), &[row]).expect("append");
        assert_eq!(
            store.distinct_dates().expect("dates").into_iter().collect::<Vec<_>>(),
            [day(3)]
        );
    }

    #[test]
    fn dates_before_exclude_same_day_and_later() {
        let mut store = initialized(&[member("a", false)]);
        for d in [1, 3, 5] {
            store.append(day(d), &[member("a", false)]).expect("append");
        }
        let before = store.distinct_dates_before(day(3)).expect("dates");
        assert_eq!(before.into_iter().collect::<Vec<_>>(), [day(1)]);
        assert_eq!(store.distinct_dates().expect("dates").len(), 3);
    }

    #[test]
    fn booleans_are_stored_as_integers() {
        let mut store = initialized(&[member("a", false)]);
        store
            .append(day(1), &[member("a", false), member("b", true)])
            .expect("append");
        let rows = store
            .project(&["name".to_string(), "deleted".to_string()], day(1))
            .expect("project");
        assert!(rows.contains(&vec![Leaf::from("a"), Leaf::Integer(0)]));
        assert!(rows.contains(&vec![Leaf::from("b"), Leaf::Integer(1)]));
    }

    #[test]
    fn history_reads_unknown_columns_as_null() {
        let mut store = initialized(&[member("a", false)]);
        store.append(day(1), &[member("a", false)]).expect("append");
        store.append(day(2), &[member("b", false)]).expect("append");

        let history = store
            .history(&["name".to_string(), "title".to_string()])
            .expect("history");
        assert_eq!(
            history,
            vec![
                (day(1), vec![Leaf::from("a"), Leaf::Null]),
                (day(2), vec![Leaf::from("b"), Leaf::Null]),
            ]
        );
    }

    #[test]
    fn history_keeps_append_order_within_a_day() {
        let mut store = initialized(&[member("a", false)]);
        store.append(day(2), &[member("a", false)]).expect("append");
        store.append(day(1), &[member("b", false)]).expect("append");
        store.append(day(2), &[member("a", true)]).expect("append");

        let history = store
            .history(&["name".to_string(), "deleted".to_string()])
            .expect("history");
        assert_eq!(
            history,
            vec![
                (day(1), vec![Leaf::from("b"), Leaf::Integer(0)]),
                (day(2), vec![Leaf::from("a"), Leaf::Integer(0)]),
                (day(2), vec![Leaf::from("a"), Leaf::Integer(1)]),
            ]
        );
    }

    #[test]
    fn lookup_returns_distinct_rows_across_runs() {
        let mut store = initialized(&[member("a", false)]);
        store.append(day(1), &[member("a", false)]).expect("append");
        store.append(day(2), &[member("a", true)]).expect("append");

        let rows = store
            .lookup("name", &Leaf::from("a"), &["id".to_string()])
            .expect("lookup");
        assert_eq!(rows, vec![vec![Leaf::from("U-a")]]);
        assert!(store
            .lookup("nope", &Leaf::from("a"), &["id".to_string()])
            .expect("lookup")
            .is_empty());
    }

    #[test]
    fn append_records_run_bookkeeping() {
        let mut store = initialized(&[member("a", false)]);
        let mut extra = member("a", false);
        extra.insert("tz", "UTC");
        store.append(day(4), &[extra]).expect("append");

        let runs = store.runs().expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_date, day(4));
        assert_eq!(runs[0].rows_stored, 1);
        assert_eq!(runs[0].attributes_dropped, 1);
        assert!(runs[0].recorded_at().is_some());
        assert_eq!(store.date_counts().expect("counts"), vec![(day(4), 1)]);
    }

    #[test]
    fn foreign_table_without_run_date_is_rejected() {
        let store = SnapshotStore::open_in_memory(StoreLayout {
            table: "Slack".into(),
            run_date_column: "run_on".into(),
        })
        .expect("open store");
        store
            .conn
            .execute_batch("CREATE TABLE \"Slack\" (\"date\", \"name\")")
            .expect("create foreign table");
        assert!(matches!(
            store.column_set(),
            Err(RosterError::MissingRunDateColumn { .. })
        ));
    }
}
