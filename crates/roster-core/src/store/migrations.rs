//! Versioned migrations for the store's bookkeeping tables.
//!
//! The snapshot table itself is never migrated: its column set is frozen at
//! the first run. Only `roster_runs` goes through here.

use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Migration v1: per-run bookkeeping written alongside every append.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS roster_runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_date TEXT NOT NULL,
    snapshot_table TEXT NOT NULL,
    rows_stored INTEGER NOT NULL CHECK (rows_stored >= 0),
    attributes_dropped INTEGER NOT NULL DEFAULT 0,
    recorded_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_roster_runs_date
    ON roster_runs(snapshot_table, run_date);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL)];

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
///
/// # Errors
///
/// Returns an error if querying `SQLite` fails or the version value cannot be
/// represented as `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// Each migration only runs when its version is above `user_version`, and
/// the DDL uses `IF NOT EXISTS`, so repeated calls are no-ops.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use rusqlite::{Connection, params};

    fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);
        assert!(table_exists(&conn, "roster_runs")?);

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        conn.execute(
            "INSERT INTO roster_runs (run_date, snapshot_table, rows_stored, recorded_at_us)
             VALUES ('2024-01-01', 'Slack', 3, 1)",
            [],
        )?;
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let runs: i64 = conn.query_row("SELECT COUNT(*) FROM roster_runs", [], |row| row.get(0))?;
        assert_eq!(runs, 1);

        Ok(())
    }
}
