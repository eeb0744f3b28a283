//! Core data model.
//!
//! A callback is a sales lead waiting to be worked: customer and vehicle
//! details, a follow-up status, and an optional exclusive claim by one
//! agent. Every mutation produces an immutable activity entry.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// A callback record. Customer/vehicle fields are free-form and carry no
/// invariants; the claim pair does: `claimed_at` is set iff `claimed_by` is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callback {
    pub id: CallbackId,
    pub product: Option<String>,
    pub vehicle_year: Option<i32>,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub zip_code: Option<String>,
    pub customer_name: String,
    pub callback_number: String,
    pub follow_up_date: Option<NaiveDate>,
    pub status: Status,
    pub agent_name: Option<String>,
    pub lead_score: Option<f64>,
    pub comments: Option<String>,

    /// Actor holding the claim, if any.
    pub claimed_by: Option<String>,
    /// When the claim was taken. Set iff `claimed_by` is set.
    pub claimed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_modified_by: Option<String>,
}

impl Callback {
    /// Current position in the claim state machine.
    pub fn claim_state(&self) -> ClaimState {
        match self.claimed_by {
            Some(ref actor) => ClaimState::ClaimedBy(actor.clone()),
            None => ClaimState::Unclaimed,
        }
    }

    /// Snapshot of the user-editable fields, keyed by field name.
    ///
    /// Excludes `status` (which has its own activity kind) and the
    /// bookkeeping timestamps, so an edit diff only reports fields a
    /// person actually typed into.
    pub fn editable_snapshot(&self) -> Snapshot {
        let mut snap = Snapshot::new();
        snap.insert("product".into(), json!(self.product));
        snap.insert("vehicle_year".into(), json!(self.vehicle_year));
        snap.insert("car_make".into(), json!(self.car_make));
        snap.insert("car_model".into(), json!(self.car_model));
        snap.insert("zip_code".into(), json!(self.zip_code));
        snap.insert("customer_name".into(), json!(self.customer_name));
        snap.insert("callback_number".into(), json!(self.callback_number));
        snap.insert(
            "follow_up_date".into(),
            match self.follow_up_date {
                Some(d) => json!(d.to_string()),
                None => Value::Null,
            },
        );
        snap.insert("agent_name".into(), json!(self.agent_name));
        snap.insert("lead_score".into(), json!(self.lead_score));
        snap.insert("comments".into(), json!(self.comments));
        snap
    }
}

/// Newtype for callback IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub i64);

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Follow-up status of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Sale,
    NoAnswer,
    FollowUpLater,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Sale => "Sale",
            Status::NoAnswer => "No Answer",
            Status::FollowUpLater => "Follow-up Later",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Status::Pending),
            "Sale" => Ok(Status::Sale),
            "No Answer" => Ok(Status::NoAnswer),
            "Follow-up Later" => Ok(Status::FollowUpLater),
            other => Err(Error::Validation(format!("unknown status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Claim state machine
// ---------------------------------------------------------------------------

/// Claim position of a callback: unclaimed, or exclusively held by one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    ClaimedBy(String),
}

/// What a claim request should do, given the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    /// Unclaimed: grant the claim and log it.
    Grant,
    /// Already held by the requesting actor: no-op success, no new log entry.
    AlreadyOwn,
    /// Held by someone else: refuse. Carries the current holder.
    HeldByOther(String),
}

/// What a release request should do, given the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseDecision {
    /// Held by the requesting actor: clear the claim and log it.
    Release,
    /// Unclaimed, or held by someone else: refuse.
    NotHolder,
}

impl ClaimState {
    pub fn decide_claim(&self, actor: &str) -> ClaimDecision {
        match self {
            ClaimState::Unclaimed => ClaimDecision::Grant,
            ClaimState::ClaimedBy(holder) if holder == actor => ClaimDecision::AlreadyOwn,
            ClaimState::ClaimedBy(holder) => ClaimDecision::HeldByOther(holder.clone()),
        }
    }

    pub fn decide_release(&self, actor: &str) -> ReleaseDecision {
        match self {
            ClaimState::ClaimedBy(holder) if holder == actor => ReleaseDecision::Release,
            _ => ReleaseDecision::NotHolder,
        }
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// An immutable audit entry. Created exactly once per recorded action,
/// never mutated; removed only when the parent callback is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub callback_id: CallbackId,
    /// Attributed actor, when the user still exists in the directory.
    pub actor: Option<ActorInfo>,
    pub activity_type: ActivityType,
    pub description: String,
    pub previous_value: Option<Snapshot>,
    pub new_value: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
}

/// Newtype for activity IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub i64);

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal actor identity attached to activity reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub id: String,
    pub username: String,
}

/// Kind of action an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    View,
    Edit,
    StatusChange,
    Claim,
    Unclaim,
    Comment,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::View => "view",
            ActivityType::Edit => "edit",
            ActivityType::StatusChange => "status_change",
            ActivityType::Claim => "claim",
            ActivityType::Unclaim => "unclaim",
            ActivityType::Comment => "comment",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "view" => Ok(ActivityType::View),
            "edit" => Ok(ActivityType::Edit),
            "status_change" => Ok(ActivityType::StatusChange),
            "claim" => Ok(ActivityType::Claim),
            "unclaim" => Ok(ActivityType::Unclaim),
            "comment" => Ok(ActivityType::Comment),
            other => Err(Error::InvalidActivityType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A field-name → value snapshot of a callback, as stored on activities.
///
/// BTreeMap keeps key order stable, so the serialized text form is
/// deterministic and round-trips without loss.
pub type Snapshot = BTreeMap<String, Value>;

/// Serialize a snapshot to its stable text form.
pub fn encode_snapshot(snap: &Snapshot) -> Result<String> {
    serde_json::to_string(snap).map_err(|e| Error::Other(format!("snapshot encode: {e}")))
}

/// Deserialize a snapshot from its stored text form.
pub fn decode_snapshot(text: &str) -> Result<Snapshot> {
    serde_json::from_str(text).map_err(|e| Error::Other(format!("snapshot decode: {e}")))
}

// ---------------------------------------------------------------------------
// Create / update payloads
// ---------------------------------------------------------------------------

/// Builder for creating callbacks. `customer_name` and `callback_number`
/// are required; everything else is optional and defaults empty, with
/// status defaulting to Pending.
#[derive(Debug, Clone)]
pub struct NewCallback {
    pub(crate) customer_name: String,
    pub(crate) callback_number: String,
    pub(crate) product: Option<String>,
    pub(crate) vehicle_year: Option<i32>,
    pub(crate) car_make: Option<String>,
    pub(crate) car_model: Option<String>,
    pub(crate) zip_code: Option<String>,
    pub(crate) follow_up_date: Option<NaiveDate>,
    pub(crate) status: Status,
    pub(crate) agent_name: Option<String>,
    pub(crate) lead_score: Option<f64>,
    pub(crate) comments: Option<String>,
    pub(crate) created_by: Option<String>,
}

impl NewCallback {
    pub fn new(customer_name: impl Into<String>, callback_number: impl Into<String>) -> Self {
        Self {
            customer_name: customer_name.into(),
            callback_number: callback_number.into(),
            product: None,
            vehicle_year: None,
            car_make: None,
            car_model: None,
            zip_code: None,
            follow_up_date: None,
            status: Status::Pending,
            agent_name: None,
            lead_score: None,
            comments: None,
            created_by: None,
        }
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn vehicle_year(mut self, year: i32) -> Self {
        self.vehicle_year = Some(year);
        self
    }

    pub fn car_make(mut self, make: impl Into<String>) -> Self {
        self.car_make = Some(make.into());
        self
    }

    pub fn car_model(mut self, model: impl Into<String>) -> Self {
        self.car_model = Some(model.into());
        self
    }

    pub fn zip_code(mut self, zip: impl Into<String>) -> Self {
        self.zip_code = Some(zip.into());
        self
    }

    pub fn follow_up_date(mut self, date: NaiveDate) -> Self {
        self.follow_up_date = Some(date);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn agent_name(mut self, agent: impl Into<String>) -> Self {
        self.agent_name = Some(agent.into());
        self
    }

    pub fn lead_score(mut self, score: f64) -> Self {
        self.lead_score = Some(score);
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn created_by(mut self, actor: impl Into<String>) -> Self {
        self.created_by = Some(actor.into());
        self
    }
}

/// Partial update. `None` means "leave the field unchanged".
#[derive(Debug, Clone, Default)]
pub struct CallbackUpdate {
    pub product: Option<String>,
    pub vehicle_year: Option<i32>,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub zip_code: Option<String>,
    pub customer_name: Option<String>,
    pub callback_number: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub status: Option<Status>,
    pub agent_name: Option<String>,
    pub lead_score: Option<f64>,
    pub comments: Option<String>,
}

impl CallbackUpdate {
    /// Merge this partial update over a base record, leaving unset fields
    /// at their prior values. Does not touch bookkeeping timestamps.
    pub fn apply_to(&self, base: &Callback) -> Callback {
        let mut next = base.clone();
        if let Some(ref v) = self.product {
            next.product = Some(v.clone());
        }
        if let Some(v) = self.vehicle_year {
            next.vehicle_year = Some(v);
        }
        if let Some(ref v) = self.car_make {
            next.car_make = Some(v.clone());
        }
        if let Some(ref v) = self.car_model {
            next.car_model = Some(v.clone());
        }
        if let Some(ref v) = self.zip_code {
            next.zip_code = Some(v.clone());
        }
        if let Some(ref v) = self.customer_name {
            next.customer_name = v.clone();
        }
        if let Some(ref v) = self.callback_number {
            next.callback_number = v.clone();
        }
        if let Some(v) = self.follow_up_date {
            next.follow_up_date = Some(v);
        }
        if let Some(v) = self.status {
            next.status = v;
        }
        if let Some(ref v) = self.agent_name {
            next.agent_name = Some(v.clone());
        }
        if let Some(v) = self.lead_score {
            next.lead_score = Some(v);
        }
        if let Some(ref v) = self.comments {
            next.comments = Some(v.clone());
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Filters for listing callbacks. All optional; unset filters match everything.
#[derive(Debug, Clone, Default)]
pub struct CallbackFilter {
    /// Inclusive lower bound on follow-up date.
    pub follow_up_from: Option<NaiveDate>,
    /// Inclusive upper bound on follow-up date.
    pub follow_up_to: Option<NaiveDate>,
    pub status: Option<Status>,
    pub agent_name: Option<String>,
    /// `Some(true)` = only claimed, `Some(false)` = only unclaimed.
    pub claimed: Option<bool>,
    pub claimed_by: Option<String>,
}

/// Skip/limit pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}
