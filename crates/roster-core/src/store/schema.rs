//! Column set and DDL/DML builders for the wide snapshot table.
//!
//! The snapshot table has no declared column types: every attribute column
//! keeps whatever storage class the bound value had, so integers, reals and
//! text survive a round trip unchanged. Only the run-date column carries a
//! `NOT NULL` constraint.
//!
//! Identifiers come from arbitrary directory keys and are always quoted with
//! [`quote_ident`]; values are always bound parameters.

use std::collections::HashSet;

use serde::Serialize;

use crate::flatten::FlatRow;

/// Ordered, frozen list of columns accepted by the snapshot table.
///
/// The run-date column is kept apart from the attribute columns; the table
/// itself lists it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSet {
    run_date_column: String,
    attributes: Vec<String>,
}

impl ColumnSet {
    /// Derive a column set from the rows of a first snapshot.
    ///
    /// Attributes are the union of every row's keys in first-seen order.
    /// `SQLite` column names are case-insensitive, so a key that differs from
    /// an earlier one only by ASCII case is left out, as is any key that
    /// shadows the run-date column.
    #[must_use]
    pub fn derive(run_date_column: &str, rows: &[FlatRow]) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(run_date_column.to_ascii_lowercase());

        let mut attributes = Vec::new();
        for row in rows {
            for key in row.keys() {
                if seen.insert(key.to_ascii_lowercase()) {
                    attributes.push(key.to_string());
                }
            }
        }

        Self {
            run_date_column: run_date_column.to_string(),
            attributes,
        }
    }

    /// Rebuild a column set from introspected table columns.
    ///
    /// Returns `None` when `names` does not contain the run-date column.
    #[must_use]
    pub fn from_table(run_date_column: &str, names: Vec<String>) -> Option<Self> {
        let position = names.iter().position(|name| name == run_date_column)?;
        let mut attributes = names;
        attributes.remove(position);
        Some(Self {
            run_date_column: run_date_column.to_string(),
            attributes,
        })
    }

    #[must_use]
    pub fn run_date_column(&self) -> &str {
        &self.run_date_column
    }

    /// Attribute columns, run-date column excluded.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// All column names, run-date column first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.run_date_column.as_str())
            .chain(self.attributes.iter().map(String::as_str))
    }

    /// Column count including the run-date column.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len() + 1
    }

    /// A column set always holds the run-date column.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr == name)
    }
}

/// Quote an identifier for `SQLite`, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn create_table_sql(table: &str, columns: &ColumnSet) -> String {
    let mut defs = vec![format!("{} NOT NULL", quote_ident(columns.run_date_column()))];
    defs.extend(columns.attributes().iter().map(|name| quote_ident(name)));

    let index = quote_ident(&format!("idx_{table}_run_date"));
    format!(
        "CREATE TABLE IF NOT EXISTS {table_q} ({defs});\n\
         CREATE INDEX IF NOT EXISTS {index} ON {table_q}({date_q});",
        table_q = quote_ident(table),
        defs = defs.join(", "),
        date_q = quote_ident(columns.run_date_column()),
    )
}

pub(crate) fn insert_sql(table: &str, columns: &ColumnSet) -> String {
    let names: Vec<String> = columns.names().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Build a select list, substituting `NULL` for names the table lacks.
pub(crate) fn select_list<'a>(
    known: &HashSet<&str>,
    attrs: impl IntoIterator<Item = &'a str>,
) -> String {
    attrs
        .into_iter()
        .map(|attr| {
            if known.contains(attr) {
                quote_ident(attr)
            } else {
                "NULL".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
