//! End-to-end comparisons through a real store: snapshot, then diff.
//!
//! Each scenario seeds dated runs from JSON member lists the way the
//! directory client would hand them over, then compares as of a fixed date.

use chrono::{Days, Local, NaiveDate};
use roster_core::aggregate::{AggregateOptions, Aggregator};
use roster_core::diff::{DiffEngine, StatusFlags};
use roster_core::flatten::Record;
use roster_core::report::ChangeReport;
use roster_core::snapshot::store_records;
use roster_core::store::{SnapshotStore, StoreLayout};
use roster_core::value::Leaf;
use roster_core::{ErrorKind, RosterError};
use serde_json::json;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date")
}

fn members(value: serde_json::Value) -> Vec<Record> {
    serde_json::from_value(value).expect("member list")
}

fn store() -> SnapshotStore {
    SnapshotStore::open_in_memory(StoreLayout::default()).expect("open in-memory store")
}

fn record_run(store: &mut SnapshotStore, date: NaiveDate, value: serde_json::Value) {
    store_records(&members(value), store, date).expect("store snapshot");
}

fn attrs(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

fn pair(name: &str, flag: i64) -> Vec<Leaf> {
    vec![Leaf::from(name), Leaf::Integer(flag)]
}

fn tuples(items: &[Vec<Leaf>]) -> BTreeSet<Vec<Leaf>> {
    items.iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn identical_runs_have_no_difference() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": false}]));

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["name", "deleted"]))
        .expect("compare");
    assert_eq!(diff.previous, day(1));
    assert!(diff.is_empty());
}

#[test]
fn added_member_is_new() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(
        &mut store,
        day(2),
        json!([{"name": "a", "deleted": false}, {"name": "b", "deleted": false}]),
    );

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["name", "deleted"]))
        .expect("compare");
    assert_eq!(diff.added, tuples(&[pair("b", 0)]));
    assert!(diff.removed.is_empty());

    let classification = diff.classify(&StatusFlags::default()).expect("classify");
    assert_eq!(classification.new, [Leaf::from("b")].into_iter().collect());
}

#[test]
fn deactivation_is_reported_as_deleted() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": true}]));

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["name", "deleted"]))
        .expect("compare");
    assert_eq!(diff.added, tuples(&[pair("a", 1)]));
    assert_eq!(diff.removed, tuples(&[pair("a", 0)]));

    let classification = diff.classify(&StatusFlags::default()).expect("classify");
    assert_eq!(classification.deleted, [Leaf::from("a")].into_iter().collect());
    assert!(classification.new.is_empty());
    assert!(classification.reactivated.is_empty());
}

#[test]
fn first_run_has_no_history() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));

    let err = DiffEngine::new(&store)
        .compare_as_of(day(1), &attrs(&["name", "deleted"]))
        .expect_err("nothing before the first run");
    assert!(err.is_no_history());
    assert_eq!(err.kind(), ErrorKind::NoHistory);
}

#[test]
fn unknown_attribute_is_a_configuration_error() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": false}]));

    let err = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["bogus_column"]))
        .expect_err("no valid columns");
    assert!(matches!(err, RosterError::NoValidColumns { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn gaps_between_runs_are_bridged_and_future_runs_ignored() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(5), json!([{"name": "b", "deleted": false}]));
    record_run(&mut store, day(9), json!([{"name": "c", "deleted": false}]));

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(5), &attrs(&["name"]))
        .expect("compare");
    assert_eq!(diff.previous, day(1));
    assert_eq!(diff.added, tuples(&[vec![Leaf::from("b")]]));
    assert_eq!(diff.removed, tuples(&[vec![Leaf::from("a")]]));
}

#[test]
fn unknown_names_are_dropped_from_a_mixed_request() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "b", "deleted": false}]));

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["bogus", "name"]))
        .expect("compare");
    assert_eq!(diff.attrs, ["name"]);
}

#[test]
fn empty_request_projects_every_column() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": false}]));

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &[])
        .expect("compare");
    assert_eq!(diff.attrs, ["date", "name", "deleted"]);
    // The run date differs between the two sides, so every row does too.
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.removed.len(), 1);
}

#[test]
fn blank_names_are_not_an_empty_request() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": false}]));

    let err = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["", ""]))
        .expect_err("blank names select nothing");
    assert!(matches!(err, RosterError::NoValidColumns { .. }));
}

#[test]
fn compare_uses_the_local_calendar_date() {
    let today = Local::now().date_naive();
    let earlier = today - Days::new(3);
    let mut store = store();
    record_run(&mut store, earlier, json!([{"name": "a", "deleted": false}]));
    record_run(&mut store, today, json!([{"name": "a", "deleted": true}]));

    let diff = DiffEngine::new(&store)
        .compare(&attrs(&["name", "deleted"]))
        .expect("compare");
    assert_eq!(diff.today, today);
    assert_eq!(diff.previous, earlier);
    assert_eq!(diff.removed, tuples(&[vec![Leaf::from("a"), Leaf::Integer(0)]]));
}

#[test]
fn later_snapshot_shapes_never_change_the_column_set() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": false}]));
    record_run(
        &mut store,
        day(2),
        json!([{"name": "a", "deleted": false, "profile": {"title": "eng"}}, {"name": "b"}]),
    );

    assert_eq!(
        store.columns("Slack").expect("columns"),
        ["date", "name", "deleted"]
    );
    let rows = store
        .project(&attrs(&["name", "deleted"]), day(2))
        .expect("project");
    assert!(rows.contains(&vec![Leaf::from("b"), Leaf::Null]));
}

#[test]
fn reactivation_round_trip() {
    let mut store = store();
    record_run(&mut store, day(1), json!([{"name": "a", "deleted": true}]));
    record_run(&mut store, day(2), json!([{"name": "a", "deleted": false}]));

    let classification = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["name", "deleted"]))
        .and_then(|diff| diff.classify(&StatusFlags::default()))
        .expect("classify");
    assert_eq!(
        classification.reactivated,
        [Leaf::from("a")].into_iter().collect()
    );
}

#[test]
fn report_resolves_details_from_history() {
    let mut store = store();
    record_run(
        &mut store,
        day(1),
        json!([{"name": "a", "real_name": "Ada", "deleted": false, "profile": {"title": "eng-core"}}]),
    );
    record_run(
        &mut store,
        day(2),
        json!([
            {"name": "a", "real_name": "Ada", "deleted": true, "profile": {"title": "eng-core"}},
            {"name": "b", "real_name": "Bo", "deleted": false}
        ]),
    );

    let diff = DiffEngine::new(&store)
        .compare_as_of(day(2), &attrs(&["name", "deleted"]))
        .expect("compare");
    let classification = diff.classify(&StatusFlags::default()).expect("classify");
    let report = ChangeReport::build(
        &store,
        &diff,
        &classification,
        &attrs(&["name", "real_name", "title"]),
    )
    .expect("build report");

    assert_eq!(
        report.render_text(),
        "New Users:\nb | Bo | \n\n\nDeleted Users:\na | Ada | eng-core\n\n\nReactivated Users:\n"
    );
}

#[test]
fn aggregator_counts_latest_row_per_member() {
    let mut store = store();
    record_run(
        &mut store,
        day(1),
        json!([
            {"id": "U1", "deleted": false, "updated": 1_704_067_200, "is_bot": false, "profile": {"title": "eng-core"}},
            {"id": "U2", "deleted": false, "updated": 1_704_067_200, "is_bot": false, "profile": {"title": "eng-web"}},
            {"id": "U3", "deleted": false, "updated": 1_704_067_200, "is_bot": false, "profile": {"title": "eng-web"}},
            {"id": "B1", "deleted": false, "updated": 1_704_067_200, "is_bot": true, "profile": {"title": "eng"}}
        ]),
    );
    // U3 disappears from the listing on day 2; U2 is deactivated.
    record_run(
        &mut store,
        day(2),
        json!([
            {"id": "U1", "deleted": false, "updated": 1_704_067_200, "is_bot": false, "profile": {"title": "eng-core"}},
            {"id": "U2", "deleted": true, "updated": 1_704_153_600, "is_bot": false, "profile": {"title": "eng-web"}}
        ]),
    );

    let agg = Aggregator::load(&store, AggregateOptions::default()).expect("load");
    assert_eq!(agg.members().len(), 4);

    let counts = agg.category_counts();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].category, "eng");
    assert_eq!(counts[0].active, 2);
    assert_eq!(counts[0].deactivated, 1);

    let weekly = agg.weekly_deactivations();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].week, day(1));
    assert_eq!(weekly[0].count, 1);

    let again = Aggregator::load(&store, AggregateOptions::default()).expect("load");
    assert_eq!(again.weekly_by_category(), agg.weekly_by_category());
}
