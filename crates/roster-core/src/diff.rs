//! Snapshot comparison: today's run against the most recent earlier run.
//!
//! A comparison projects both runs onto the same attribute tuple and takes
//! the two set differences. Tuples are [`BTreeSet`] members, so identical
//! rows collapse and every result iterates in a stable order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RosterError};
use crate::store::SnapshotStore;
use crate::value::{Leaf, Tuple};

/// Result of comparing two dated projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Attribute names each tuple is laid out by.
    pub attrs: Vec<String>,
    pub today: NaiveDate,
    pub previous: NaiveDate,
    /// Present today, absent from the previous run.
    pub added: BTreeSet<Tuple>,
    /// Present in the previous run, absent today.
    pub removed: BTreeSet<Tuple>,
}

impl SnapshotDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The same comparison seen from the other side.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            attrs: self.attrs,
            today: self.previous,
            previous: self.today,
            added: self.removed,
            removed: self.added,
        }
    }

    /// Partition the changed identities.
    ///
    /// Tuples are read as `(identity, status, ..)`. Identities only seen in
    /// `added` are new. Every identity seen in `removed` changed, and the
    /// status it had in the previous run decides its bucket: the active
    /// value means it was deleted since, the inactive value means it came
    /// back. Any other previous status lands in `unclassified`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::ClassificationArity`] when the tuples have
    /// fewer than two attributes.
    pub fn classify(&self, flags: &StatusFlags) -> Result<Classification> {
        if self.attrs.len() < 2 {
            return Err(RosterError::ClassificationArity {
                arity: self.attrs.len(),
            });
        }

        let current = status_by_identity(&self.added);
        let previous = status_by_identity(&self.removed);

        let active = flags.active.normalized();
        let inactive = flags.inactive.normalized();

        let mut classification = Classification::default();
        for identity in current.keys() {
            if !previous.contains_key(identity) {
                classification.new.insert(identity.clone());
            }
        }
        for (identity, status) in previous {
            let status = status.normalized();
            let bucket = if status == active {
                &mut classification.deleted
            } else if status == inactive {
                &mut classification.reactivated
            } else {
                &mut classification.unclassified
            };
            bucket.insert(identity);
        }

        Ok(classification)
    }
}

fn status_by_identity(tuples: &BTreeSet<Tuple>) -> BTreeMap<Leaf, Leaf> {
    tuples
        .iter()
        .filter_map(|tuple| match tuple.as_slice() {
            [identity, status, ..] => Some((identity.clone(), status.clone())),
            _ => None,
        })
        .collect()
}

/// Status values that mark an identity active or deactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFlags {
    pub active: Leaf,
    pub inactive: Leaf,
}

impl Default for StatusFlags {
    /// A `deleted` column: `0` while active, `1` once deactivated.
    fn default() -> Self {
        Self {
            active: Leaf::Integer(0),
            inactive: Leaf::Integer(1),
        }
    }
}

/// Changed identities split by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub new: BTreeSet<Leaf>,
    pub deleted: BTreeSet<Leaf>,
    pub reactivated: BTreeSet<Leaf>,
    pub unclassified: BTreeSet<Leaf>,
}

impl Classification {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
            && self.deleted.is_empty()
            && self.reactivated.is_empty()
            && self.unclassified.is_empty()
    }
}

/// `(current - previous, previous - current)`.
#[must_use]
pub fn delta(
    current: &BTreeSet<Tuple>,
    previous: &BTreeSet<Tuple>,
) -> (BTreeSet<Tuple>, BTreeSet<Tuple>) {
    (
        current.difference(previous).cloned().collect(),
        previous.difference(current).cloned().collect(),
    )
}

/// Compares dated snapshots held by a [`SnapshotStore`].
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine<'a> {
    store: &'a SnapshotStore,
}

impl<'a> DiffEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }

    /// Compare the run dated with the local calendar date.
    ///
    /// # Errors
    ///
    /// See [`Self::compare_as_of`].
    pub fn compare(&self, attrs: &[String]) -> Result<SnapshotDiff> {
        self.compare_as_of(Local::now().date_naive(), attrs)
    }

    /// Compare the run dated `today` with the latest run strictly before it.
    ///
    /// # Errors
    ///
    /// - [`RosterError::NoValidColumns`] if none of a non-empty `attrs` exist
    /// - [`RosterError::NoHistory`] if no earlier run exists
    /// - [`RosterError::NotInitialized`] before the first snapshot
    pub fn compare_as_of(&self, today: NaiveDate, attrs: &[String]) -> Result<SnapshotDiff> {
        let attrs = self.resolve_attrs(attrs)?;

        let previous = self
            .store
            .distinct_dates_before(today)?
            .last()
            .copied()
            .ok_or(RosterError::NoHistory { today })?;
        debug!(%today, %previous, attrs = attrs.len(), "comparing snapshots");

        let current = self.store.project(&attrs, today)?;
        let earlier = self.store.project(&attrs, previous)?;
        let (added, removed) = delta(&current, &earlier);

        Ok(SnapshotDiff {
            attrs,
            today,
            previous,
            added,
            removed,
        })
    }

    /// Keep the requested names the snapshot table knows, in request order.
    ///
    /// An empty request selects every column, run date included.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NoValidColumns`] when a non-empty request
    /// keeps nothing.
    pub fn resolve_attrs(&self, attrs: &[String]) -> Result<Vec<String>> {
        let columns = self.store.column_set()?;
        if attrs.is_empty() {
            return Ok(columns.names().map(str::to_string).collect());
        }

        let (valid, unknown): (Vec<String>, Vec<String>) = attrs
            .iter()
            .cloned()
            .partition(|attr| columns.names().any(|name| name == attr));
        if !unknown.is_empty() {
            debug!(?unknown, "ignoring attributes the snapshot table lacks");
        }
        if valid.is_empty() {
            return Err(RosterError::NoValidColumns {
                table: self.store.table().to_string(),
                requested: attrs.to_vec(),
            });
        }
        Ok(valid)
    }
}
