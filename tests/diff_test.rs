use calltrack_rs::diff::{describe, diff};
use calltrack_rs::model::Snapshot;
use serde_json::json;

fn snap(pairs: &[(&str, serde_json::Value)]) -> Snapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn equal_snapshots_produce_no_changes() {
    let a = snap(&[("car_make", json!("Ford")), ("lead_score", json!(3.0))]);
    assert!(diff(&a, &a.clone()).is_empty());
}

#[test]
fn changed_values_are_reported_in_key_order() {
    let before = snap(&[
        ("car_make", json!("Ford")),
        ("comments", json!(null)),
        ("zip_code", json!("10001")),
    ]);
    let after = snap(&[
        ("car_make", json!("Mazda")),
        ("comments", json!("call after 5")),
        ("zip_code", json!("10001")),
    ]);

    let changes = diff(&before, &after);
    assert_eq!(changes.len(), 2);
    // BTreeMap iteration order: car_make before comments.
    assert_eq!(changes[0].field, "car_make");
    assert_eq!(changes[0].old, json!("Ford"));
    assert_eq!(changes[0].new, json!("Mazda"));
    assert_eq!(changes[1].field, "comments");
}

#[test]
fn keys_missing_on_either_side_are_ignored() {
    let before = snap(&[("car_make", json!("Ford")), ("only_before", json!(1))]);
    let after = snap(&[("car_make", json!("Ford")), ("only_after", json!(2))]);
    assert!(diff(&before, &after).is_empty());
}

#[test]
fn change_display_renders_strings_and_nulls_plainly() {
    let before = snap(&[("comments", json!(null)), ("lead_score", json!(3.5))]);
    let after = snap(&[("comments", json!("ready to buy")), ("lead_score", json!(8.0))]);

    let changes = diff(&before, &after);
    assert_eq!(changes[0].to_string(), "comments: null → ready to buy");
    assert_eq!(changes[1].to_string(), "lead_score: 3.5 → 8.0");
}

#[test]
fn describe_spells_out_up_to_three_changes() {
    let before = snap(&[("a", json!(1)), ("b", json!(1))]);
    let after = snap(&[("a", json!(2)), ("b", json!(3))]);
    let changes = diff(&before, &after);
    assert_eq!(describe(&changes), "Updated 2 fields: a: 1 → 2, b: 1 → 3");
}

#[test]
fn describe_truncates_past_three_changes() {
    let before = snap(&[
        ("a", json!(1)),
        ("b", json!(1)),
        ("c", json!(1)),
        ("d", json!(1)),
        ("e", json!(1)),
    ]);
    let after = snap(&[
        ("a", json!(2)),
        ("b", json!(2)),
        ("c", json!(2)),
        ("d", json!(2)),
        ("e", json!(2)),
    ]);
    let changes = diff(&before, &after);
    let text = describe(&changes);
    assert!(text.starts_with("Updated 5 fields: a: 1 → 2, b: 1 → 2, c: 1 → 2"));
    assert!(text.ends_with("... and 2 more"));
}
