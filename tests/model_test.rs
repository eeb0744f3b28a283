use calltrack_rs::model::{
    ActivityType, Callback, CallbackId, CallbackUpdate, ClaimDecision, ClaimState, Page,
    ReleaseDecision, Status, decode_snapshot, encode_snapshot,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;

fn sample_callback() -> Callback {
    let now = Utc::now();
    Callback {
        id: CallbackId(1),
        product: Some("gap insurance".to_string()),
        vehicle_year: Some(2021),
        car_make: Some("Subaru".to_string()),
        car_model: Some("Outback".to_string()),
        zip_code: None,
        customer_name: "Morgan Reyes".to_string(),
        callback_number: "555-0199".to_string(),
        follow_up_date: NaiveDate::from_ymd_opt(2026, 9, 1),
        status: Status::Pending,
        agent_name: None,
        lead_score: Some(6.0),
        comments: None,
        claimed_by: None,
        claimed_at: None,
        created_at: now,
        last_modified: now,
        last_modified_by: None,
    }
}

#[test]
fn claim_decisions_cover_the_state_machine() {
    let unclaimed = ClaimState::Unclaimed;
    assert_eq!(unclaimed.decide_claim("alice"), ClaimDecision::Grant);
    assert_eq!(unclaimed.decide_release("alice"), ReleaseDecision::NotHolder);

    let held = ClaimState::ClaimedBy("alice".to_string());
    assert_eq!(held.decide_claim("alice"), ClaimDecision::AlreadyOwn);
    assert_eq!(
        held.decide_claim("bob"),
        ClaimDecision::HeldByOther("alice".to_string())
    );
    assert_eq!(held.decide_release("alice"), ReleaseDecision::Release);
    assert_eq!(held.decide_release("bob"), ReleaseDecision::NotHolder);
}

#[test]
fn status_parses_its_display_form() {
    for status in [
        Status::Pending,
        Status::Sale,
        Status::NoAnswer,
        Status::FollowUpLater,
    ] {
        assert_eq!(status.to_string().parse::<Status>().unwrap(), status);
    }
    assert_eq!(Status::NoAnswer.to_string(), "No Answer");
    assert_eq!(Status::FollowUpLater.to_string(), "Follow-up Later");
    assert!("closed".parse::<Status>().is_err());
}

#[test]
fn activity_type_parses_its_display_form() {
    for kind in [
        ActivityType::View,
        ActivityType::Edit,
        ActivityType::StatusChange,
        ActivityType::Claim,
        ActivityType::Unclaim,
        ActivityType::Comment,
    ] {
        assert_eq!(kind.to_string().parse::<ActivityType>().unwrap(), kind);
    }
    assert_eq!(ActivityType::StatusChange.to_string(), "status_change");
    assert!("deleted".parse::<ActivityType>().is_err());
}

#[test]
fn snapshots_roundtrip_through_text() {
    let callback = sample_callback();
    let snap = callback.editable_snapshot();

    let text = encode_snapshot(&snap).unwrap();
    let back = decode_snapshot(&text).unwrap();
    assert_eq!(back, snap);

    // Encoding is deterministic for a given snapshot.
    assert_eq!(encode_snapshot(&back).unwrap(), text);
}

#[test]
fn editable_snapshot_tracks_typed_fields_only() {
    let callback = sample_callback();
    let snap = callback.editable_snapshot();

    assert_eq!(snap.len(), 11);
    assert!(!snap.contains_key("status"));
    assert!(!snap.contains_key("claimed_by"));
    assert!(!snap.contains_key("last_modified"));
    assert_eq!(snap["customer_name"], json!("Morgan Reyes"));
    assert_eq!(snap["follow_up_date"], json!("2026-09-01"));
    assert_eq!(snap["zip_code"], serde_json::Value::Null);
}

#[test]
fn update_applies_only_provided_fields() {
    let base = sample_callback();
    let update = CallbackUpdate {
        car_model: Some("Forester".to_string()),
        status: Some(Status::Sale),
        ..Default::default()
    };

    let next = update.apply_to(&base);
    assert_eq!(next.car_model.as_deref(), Some("Forester"));
    assert_eq!(next.status, Status::Sale);
    // Untouched fields carry over.
    assert_eq!(next.customer_name, base.customer_name);
    assert_eq!(next.lead_score, base.lead_score);
    assert_eq!(next.last_modified, base.last_modified);

    let noop = CallbackUpdate::default().apply_to(&base);
    assert_eq!(noop.editable_snapshot(), base.editable_snapshot());
    assert_eq!(noop.status, base.status);
}

#[test]
fn claim_state_reflects_the_record() {
    let mut callback = sample_callback();
    assert_eq!(callback.claim_state(), ClaimState::Unclaimed);

    callback.claimed_by = Some("agent-3".to_string());
    callback.claimed_at = Some(Utc::now());
    assert_eq!(
        callback.claim_state(),
        ClaimState::ClaimedBy("agent-3".to_string())
    );
}

#[test]
fn page_defaults_to_first_hundred() {
    let page = Page::default();
    assert_eq!(page.skip, 0);
    assert_eq!(page.limit, 100);
}
