//! Nested record → single-level row.
//!
//! Traversal is depth-first with keys visited in insertion order at every
//! level. A nested mapping is absorbed in place: its leaf keys land in the
//! same namespace as the parent's. When a key name repeats at different
//! depths the later write in traversal order wins, and the key keeps the
//! position of its first appearance.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::value::Leaf;

/// Raw directory record: an insertion-ordered JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Single-level mapping of attribute name to leaf value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlatRow(IndexMap<String, Leaf>);

impl FlatRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value; overwrites keep the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Leaf>) -> Option<Leaf> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Leaf> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Leaf)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Leaf>> FromIterator<(K, V)> for FlatRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

/// Flatten one record into a [`FlatRow`].
#[must_use]
pub fn flatten(record: &Record) -> FlatRow {
    let mut row = FlatRow::new();
    absorb(&mut row, record);
    row
}

fn absorb(row: &mut FlatRow, record: &Record) {
    for (key, value) in record {
        if let Value::Object(nested) = value {
            absorb(row, nested);
        } else if let Some(leaf) = Leaf::from_json(value) {
            row.insert(key.as_str(), leaf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FlatRow, Record, flatten};
    use crate::value::Leaf;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_keys_are_lifted_to_top_level() {
        let flat = flatten(&record(json!({
            "one": 1,
            "two": 2.0,
            "three": "three",
            "four": {
                "four": 4,
                "five": [1, 2, 3, 4, 5]
            }
        })));

        let expected: FlatRow = [
            ("one", Leaf::Integer(1)),
            ("two", Leaf::Real(2.0)),
            ("three", Leaf::from("three")),
            ("four", Leaf::Integer(4)),
            ("five", Leaf::from("[1,2,3,4,5]")),
        ]
        .into_iter()
        .collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn empty_record_flattens_to_empty_row() {
        assert!(flatten(&Record::new()).is_empty());
    }

    #[test]
    fn empty_nested_record_contributes_nothing() {
        let flat = flatten(&record(json!({"id": "U1", "profile": {}})));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn later_depth_wins_but_keeps_first_position() {
        let flat = flatten(&record(json!({
            "name": "outer",
            "id": "U1",
            "profile": {"name": "inner", "title": "eng-platform"}
        })));

        assert_eq!(flat.get("name"), Some(&Leaf::from("inner")));
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["name", "id", "title"]
        );
    }

    #[test]
    fn earlier_nested_value_is_overwritten_by_later_sibling() {
        let flat = flatten(&record(json!({
            "profile": {"team": "T1"},
            "team": "T2"
        })));
        assert_eq!(flat.get("team"), Some(&Leaf::from("T2")));
    }

    #[test]
    fn deep_nesting_reaches_every_leaf() {
        let flat = flatten(&record(json!({
            "a": {"b": {"c": {"d": true}}},
            "e": null
        })));
        assert_eq!(flat.get("d"), Some(&Leaf::Bool(true)));
        assert_eq!(flat.get("e"), Some(&Leaf::Null));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn flat_input_is_a_fixed_point() {
        let input = record(json!({"id": "U1", "deleted": false, "updated": 1_700_000_000}));
        let once = flatten(&input);
        assert_eq!(once.len(), input.len());
        for (key, value) in &input {
            assert_eq!(once.get(key), Leaf::from_json(value).as_ref());
        }
    }
}
