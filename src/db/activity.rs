//! Append-only activity log for callbacks.
//!
//! Entries are inserted once and never updated; snapshots are stored in a
//! stable serialized text form. The typed `log_*` helpers run on a
//! caller-supplied connection so mutations can keep their audit entry in
//! the same transaction.

use chrono::Utc;
use opentelemetry::KeyValue;
use serde_json::json;
use sqlx::PgConnection;

use crate::diff::{self, FieldChange};
use crate::error::{Error, Result};
use crate::model::{
    Activity, ActivityId, ActivityType, ActorInfo, CallbackId, Page, Snapshot, Status,
    decode_snapshot, encode_snapshot,
};
use crate::telemetry::metrics;

const ACTIVITY_SELECT: &str = "SELECT a.id, a.callback_id, a.user_id, u.username, \
     a.activity_type, a.description, a.previous_value, a.new_value, a.created_at \
     FROM callback_activities a LEFT JOIN users u ON u.id = a.user_id";

impl super::Db {
    /// Record an arbitrary activity against a callback.
    ///
    /// The type string is validated against the fixed enumeration and the
    /// parent callback must exist.
    pub async fn record_activity(
        &self,
        callback_id: CallbackId,
        actor: Option<&str>,
        activity_type: &str,
        description: &str,
        previous: Option<&Snapshot>,
        new: Option<&Snapshot>,
    ) -> Result<Activity> {
        let kind: ActivityType = activity_type.parse()?;
        self.require_callback(callback_id).await?;

        let mut conn = self.pool.acquire().await?;
        let id = insert_activity(
            &mut conn,
            callback_id,
            actor,
            kind,
            description,
            previous,
            new,
        )
        .await?;
        drop(conn);
        self.fetch_activity(id).await
    }

    /// Activities for a callback, newest first, each carrying minimal
    /// actor identity when the user still exists.
    pub async fn list_activities(
        &self,
        callback_id: CallbackId,
        page: Page,
    ) -> Result<Vec<Activity>> {
        self.require_callback(callback_id).await?;
        let sql = format!(
            "{ACTIVITY_SELECT} WHERE a.callback_id = $1 \
             ORDER BY a.created_at DESC, a.id DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<ActivityRow> = sqlx::query_as(&sql)
            .bind(callback_id.0)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(ActivityRow::try_into_activity)
            .collect()
    }

    /// Record a `view` activity. Callers treat this as best-effort.
    pub async fn log_view(&self, callback_id: CallbackId, actor: &str) -> Result<Activity> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_activity(
            &mut conn,
            callback_id,
            Some(actor),
            ActivityType::View,
            "Viewed callback details",
            None,
            None,
        )
        .await?;
        drop(conn);
        self.fetch_activity(id).await
    }

    async fn fetch_activity(&self, id: ActivityId) -> Result<Activity> {
        let sql = format!("{ACTIVITY_SELECT} WHERE a.id = $1");
        let row: Option<ActivityRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| Error::NotFound(format!("activity {id}")))?
            .try_into_activity()
    }
}

/// Insert one activity row. The single write path for the log.
///
/// FK violations surface as domain errors: a vanished parent callback is
/// `NotFound`, an actor missing from the directory is `Validation`.
pub(crate) async fn insert_activity(
    conn: &mut PgConnection,
    callback_id: CallbackId,
    user_id: Option<&str>,
    kind: ActivityType,
    description: &str,
    previous: Option<&Snapshot>,
    new: Option<&Snapshot>,
) -> Result<ActivityId> {
    let previous_text = previous.map(encode_snapshot).transpose()?;
    let new_text = new.map(encode_snapshot).transpose()?;

    let row: (i64,) = sqlx::query_as(
        "INSERT INTO callback_activities \
         (callback_id, user_id, activity_type, description, previous_value, new_value, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(callback_id.0)
    .bind(user_id)
    .bind(kind.as_str())
    .bind(description)
    .bind(previous_text)
    .bind(new_text)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            match db.constraint() {
                Some(c) if c.contains("user_id") => Error::Validation(format!(
                    "activity actor is not a known user: {}",
                    user_id.unwrap_or("")
                )),
                _ => Error::NotFound(format!("callback {callback_id}")),
            }
        }
        other => Error::Database(other),
    })?;

    metrics::activities_recorded().add(1, &[KeyValue::new("type", kind.as_str())]);
    Ok(ActivityId(row.0))
}

/// Log a granted claim.
pub(crate) async fn log_claim(
    conn: &mut PgConnection,
    callback_id: CallbackId,
    actor: &str,
) -> Result<ActivityId> {
    insert_activity(
        conn,
        callback_id,
        Some(actor),
        ActivityType::Claim,
        "Claimed this callback",
        None,
        None,
    )
    .await
}

/// Log a released claim.
pub(crate) async fn log_unclaim(
    conn: &mut PgConnection,
    callback_id: CallbackId,
    actor: &str,
) -> Result<ActivityId> {
    insert_activity(
        conn,
        callback_id,
        Some(actor),
        ActivityType::Unclaim,
        "Released this callback",
        None,
        None,
    )
    .await
}

/// Log a status transition with single-field before/after snapshots.
pub(crate) async fn log_status_change(
    conn: &mut PgConnection,
    callback_id: CallbackId,
    actor: Option<&str>,
    previous: Status,
    new: Status,
) -> Result<ActivityId> {
    let previous_snap = Snapshot::from([("status".to_string(), json!(previous.as_str()))]);
    let new_snap = Snapshot::from([("status".to_string(), json!(new.as_str()))]);
    insert_activity(
        conn,
        callback_id,
        actor,
        ActivityType::StatusChange,
        &format!("Changed status from \"{previous}\" to \"{new}\""),
        Some(&previous_snap),
        Some(&new_snap),
    )
    .await
}

/// Log an edit with full before/after snapshots and a diff summary.
pub(crate) async fn log_edit(
    conn: &mut PgConnection,
    callback_id: CallbackId,
    actor: Option<&str>,
    before: &Snapshot,
    after: &Snapshot,
    changes: &[FieldChange],
) -> Result<ActivityId> {
    insert_activity(
        conn,
        callback_id,
        actor,
        ActivityType::Edit,
        &diff::describe(changes),
        Some(before),
        Some(after),
    )
    .await
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    callback_id: i64,
    user_id: Option<String>,
    username: Option<String>,
    activity_type: String,
    description: String,
    previous_value: Option<String>,
    new_value: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ActivityRow {
    fn try_into_activity(self) -> Result<Activity> {
        let actor = match (self.user_id, self.username) {
            (Some(id), Some(username)) => Some(ActorInfo { id, username }),
            _ => None,
        };
        Ok(Activity {
            id: ActivityId(self.id),
            callback_id: CallbackId(self.callback_id),
            actor,
            activity_type: self.activity_type.parse()?,
            description: self.description,
            previous_value: self.previous_value.as_deref().map(decode_snapshot).transpose()?,
            new_value: self.new_value.as_deref().map(decode_snapshot).transpose()?,
            created_at: self.created_at,
        })
    }
}
