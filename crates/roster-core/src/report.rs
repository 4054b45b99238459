//! Plain-text change report built from a classified diff.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::diff::{Classification, SnapshotDiff};
use crate::error::Result;
use crate::store::SnapshotStore;
use crate::value::Leaf;

/// Separator between detail columns of one row.
pub const DETAIL_SEPARATOR: &str = " | ";

/// One changed identity with its resolved detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub identity: Leaf,
    /// One line per distinct detail row stored for the identity.
    pub details: Vec<String>,
}

impl ReportEntry {
    fn lines(&self) -> Vec<String> {
        if self.details.is_empty() {
            vec![self.identity.to_string()]
        } else {
            self.details.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub today: NaiveDate,
    pub previous: NaiveDate,
    pub new: Vec<ReportEntry>,
    pub deleted: Vec<ReportEntry>,
    pub reactivated: Vec<ReportEntry>,
}

impl ChangeReport {
    /// Resolve every classified identity to its stored detail columns.
    ///
    /// Identities are matched on the diff's first attribute. With no detail
    /// columns an entry carries only its identity.
    ///
    /// # Errors
    ///
    /// Returns store errors from the detail lookups.
    pub fn build(
        store: &SnapshotStore,
        diff: &SnapshotDiff,
        classification: &Classification,
        detail_columns: &[String],
    ) -> Result<Self> {
        let identity_column = diff.attrs.first().map(String::as_str).unwrap_or_default();
        let resolve = |identities: &BTreeSet<Leaf>| -> Result<Vec<ReportEntry>> {
            identities
                .iter()
                .map(|identity| -> Result<ReportEntry> {
                    let details = store
                        .lookup(identity_column, identity, detail_columns)?
                        .into_iter()
                        .map(|row| {
                            row.iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(DETAIL_SEPARATOR)
                        })
                        .collect();
                    Ok(ReportEntry {
                        identity: identity.clone(),
                        details,
                    })
                })
                .collect()
        };

        Ok(Self {
            today: diff.today,
            previous: diff.previous,
            new: resolve(&classification.new)?,
            deleted: resolve(&classification.deleted)?,
            reactivated: resolve(&classification.reactivated)?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.deleted.is_empty() && self.reactivated.is_empty()
    }

    /// Three titled sections separated by two blank lines.
    #[must_use]
    pub fn render_text(&self) -> String {
        let section = |entries: &[ReportEntry]| {
            entries
                .iter()
                .flat_map(ReportEntry::lines)
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "New Users:\n{}\n\n\nDeleted Users:\n{}\n\n\nReactivated Users:\n{}",
            section(&self.new),
            section(&self.deleted),
            section(&self.reactivated),
        )
    }

    /// The rendered body under a dated heading, as appended to a report file.
    #[must_use]
    pub fn render_dated(&self) -> String {
        format!("{} Report:\n{}\n\n", self.today, self.render_text())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeReport, ReportEntry};
    use crate::value::Leaf;
    use chrono::NaiveDate;

    fn entry(identity: &str, details: &[&str]) -> ReportEntry {
        ReportEntry {
            identity: Leaf::from(identity),
            details: details.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    fn report() -> ChangeReport {
        ChangeReport {
            today: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
            previous: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            new: vec![entry("b", &["b | Bea | eng-core"])],
            deleted: vec![entry("a", &[])],
            reactivated: Vec::new(),
        }
    }

    #[test]
    fn text_has_three_sections_in_order() {
        assert_eq!(
            report().render_text(),
            "New Users:\nb | Bea | eng-core\n\n\nDeleted Users:\na\n\n\nReactivated Users:\n"
        );
    }

    #[test]
    fn dated_rendering_adds_heading() {
        let dated = report().render_dated();
        assert!(dated.starts_with("2024-01-02 Report:\nNew Users:\n"));
        assert!(dated.ends_with("Reactivated Users:\n\n\n"));
    }

    #[test]
    fn empty_report_still_lists_headings() {
        let mut empty = report();
        empty.new.clear();
        empty.deleted.clear();
        assert!(empty.is_empty());
        assert!(empty.render_text().contains("Deleted Users:\n\n\n\nReactivated"));
    }
}
