//! One snapshot run: fetch, flatten, freeze the schema on first use, append.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, RosterError};
use crate::flatten::{FlatRow, Record, flatten};
use crate::store::{ColumnSet, SnapshotStore};

/// Anything that can list the directory's current members.
pub trait DirectorySource {
    /// Return every current member record.
    ///
    /// # Errors
    ///
    /// Implementations return [`RosterError::UpstreamRejected`] or
    /// [`RosterError::UpstreamTransport`] when the listing cannot be
    /// completed. A partial listing must be reported as an error.
    fn list_current_records(&self) -> Result<Vec<Record>>;
}

/// What a snapshot run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub run_date: NaiveDate,
    pub fetched: usize,
    pub stored: usize,
    pub dropped_attributes: Vec<String>,
    /// True when this run created the snapshot table and froze its columns.
    pub schema_established: bool,
    /// True when rows for `run_date` already existed before this run.
    pub merged_into_existing_date: bool,
}

/// Record the source's current members under `run_date`.
///
/// Nothing is written when the source fails.
///
/// # Errors
///
/// - the source's error, unchanged
/// - [`RosterError::EmptyFirstSnapshot`] when the table does not exist yet
///   and the source returned no records
/// - store errors from initialization or the append
pub fn take_snapshot(
    source: &dyn DirectorySource,
    store: &mut SnapshotStore,
    run_date: NaiveDate,
) -> Result<SnapshotReport> {
    let records = source.list_current_records()?;
    store_records(&records, store, run_date)
}

/// Record already-fetched member records under `run_date`.
///
/// # Errors
///
/// - [`RosterError::EmptyFirstSnapshot`] when the table does not exist yet
///   and `records` is empty
/// - store errors from initialization or the append
pub fn store_records(
    records: &[Record],
    store: &mut SnapshotStore,
    run_date: NaiveDate,
) -> Result<SnapshotReport> {
    let rows: Vec<FlatRow> = records.iter().map(flatten).collect();

    let schema_established = if store.is_initialized()? {
        false
    } else {
        if rows.is_empty() {
            return Err(RosterError::EmptyFirstSnapshot {
                table: store.table().to_string(),
            });
        }
        let columns = ColumnSet::derive(&store.layout().run_date_column, &rows);
        store.initialize(&columns)?;
        info!(
            table = store.table(),
            columns = columns.len(),
            "froze snapshot column set"
        );
        true
    };

    let merged_into_existing_date = store.distinct_dates()?.contains(&run_date);
    if merged_into_existing_date {
        warn!(%run_date, "run date already recorded; rows merge into the same day");
    }

    let summary = store.append(run_date, &rows)?;
    if !summary.dropped_attributes.is_empty() {
        info!(
            dropped = ?summary.dropped_attributes,
            "attributes outside the frozen column set were not stored"
        );
    }

    Ok(SnapshotReport {
        run_date,
        fetched: records.len(),
        stored: summary.rows_written,
        dropped_attributes: summary.dropped_attributes,
        schema_established,
        merged_into_existing_date,
    })
}
