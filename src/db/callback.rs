//! Callback record store and claim state machine.
//!
//! Every mutation commits its audit entry in the same transaction as the
//! record change, so the two can never diverge. The claim check-and-set
//! runs under a row lock (`SELECT ... FOR UPDATE`): of two simultaneous
//! claims on one unclaimed callback, exactly one wins.

use chrono::Utc;
use opentelemetry::KeyValue;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info, warn};

use crate::diff;
use crate::error::{Error, Result};
use crate::model::{
    Callback, CallbackFilter, CallbackId, CallbackUpdate, ClaimDecision, NewCallback, Page,
    ReleaseDecision,
};
use crate::telemetry::metrics;

use super::activity;

const CALLBACK_COLS: &str = "id, product, vehicle_year, car_make, car_model, zip_code, \
     customer_name, callback_number, follow_up_date, status, agent_name, lead_score, comments, \
     claimed_by, claimed_at, created_at, last_modified, last_modified_by";

impl super::Db {
    /// Create a callback. Status defaults to Pending unless the builder
    /// set one; timestamps are set to now.
    pub async fn create_callback(&self, new: NewCallback) -> Result<Callback> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO callbacks (product, vehicle_year, car_make, car_model, zip_code, \
             customer_name, callback_number, follow_up_date, status, agent_name, lead_score, \
             comments, created_at, last_modified, last_modified_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, $14) \
             RETURNING {CALLBACK_COLS}"
        );
        let row: CallbackRow = sqlx::query_as(&sql)
            .bind(&new.product)
            .bind(new.vehicle_year)
            .bind(&new.car_make)
            .bind(&new.car_model)
            .bind(&new.zip_code)
            .bind(&new.customer_name)
            .bind(&new.callback_number)
            .bind(new.follow_up_date)
            .bind(new.status.as_str())
            .bind(&new.agent_name)
            .bind(new.lead_score)
            .bind(&new.comments)
            .bind(now)
            .bind(&new.created_by)
            .fetch_one(&self.pool)
            .await?;

        let callback = row.try_into_callback()?;
        info!(id = %callback.id, customer = %callback.customer_name, "callback created");
        metrics::callback_mutations().add(1, &[KeyValue::new("operation", "create")]);
        Ok(callback)
    }

    /// Get a callback by ID.
    pub async fn get_callback(&self, id: CallbackId) -> Result<Callback> {
        let sql = format!("SELECT {CALLBACK_COLS} FROM callbacks WHERE id = $1");
        let row: Option<CallbackRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| Error::NotFound(format!("callback {id}")))?
            .try_into_callback()
    }

    /// Get a callback on behalf of an actor, recording a `view` activity.
    ///
    /// View logging is best-effort: a failure is logged and swallowed so
    /// the read itself still succeeds.
    pub async fn get_callback_as(&self, id: CallbackId, actor: &str) -> Result<Callback> {
        let callback = self.get_callback(id).await?;
        if let Err(e) = self.log_view(id, actor).await {
            warn!(id = %id, actor, "view logging failed: {e}");
        }
        Ok(callback)
    }

    /// List callbacks with optional filters, ordered by follow-up date
    /// descending then last-modified descending.
    pub async fn list_callbacks(
        &self,
        filter: &CallbackFilter,
        page: Page,
    ) -> Result<Vec<Callback>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CALLBACK_COLS} FROM callbacks WHERE TRUE"));

        if let Some(from) = filter.follow_up_from {
            qb.push(" AND follow_up_date >= ").push_bind(from);
        }
        if let Some(to) = filter.follow_up_to {
            qb.push(" AND follow_up_date <= ").push_bind(to);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ref agent) = filter.agent_name {
            qb.push(" AND agent_name = ").push_bind(agent.as_str());
        }
        match filter.claimed {
            Some(true) => {
                qb.push(" AND claimed_by IS NOT NULL");
            }
            Some(false) => {
                qb.push(" AND claimed_by IS NULL");
            }
            None => {}
        }
        if let Some(ref claimant) = filter.claimed_by {
            qb.push(" AND claimed_by = ").push_bind(claimant.as_str());
        }

        qb.push(" ORDER BY follow_up_date DESC, last_modified DESC");
        qb.push(" LIMIT ").push_bind(page.limit);
        qb.push(" OFFSET ").push_bind(page.skip);

        let rows: Vec<CallbackRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(CallbackRow::try_into_callback)
            .collect()
    }

    /// Case-insensitive substring search across customer name, car make,
    /// car model, callback number, and comments.
    ///
    /// Terms shorter than 3 characters are rejected at this boundary.
    pub async fn search_callbacks(&self, term: &str, page: Page) -> Result<Vec<Callback>> {
        if term.chars().count() < 3 {
            return Err(Error::Validation(
                "search term must be at least 3 characters".to_string(),
            ));
        }
        let pattern = format!("%{term}%");
        let sql = format!(
            "SELECT {CALLBACK_COLS} FROM callbacks \
             WHERE customer_name ILIKE $1 OR car_make ILIKE $1 OR car_model ILIKE $1 \
                OR callback_number ILIKE $1 OR comments ILIKE $1 \
             ORDER BY follow_up_date DESC LIMIT $2 OFFSET $3"
        );
        let rows: Vec<CallbackRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(CallbackRow::try_into_callback)
            .collect()
    }

    /// Apply a partial update. Only provided fields change; `last_modified`
    /// is refreshed on every successful update.
    ///
    /// Audit entries are committed with the record change: one
    /// `status_change` when status moved, one `edit` when other fields
    /// changed. A no-op update produces no activity at all.
    pub async fn update_callback(
        &self,
        id: CallbackId,
        update: CallbackUpdate,
        actor: Option<&str>,
    ) -> Result<Callback> {
        let started = std::time::Instant::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {CALLBACK_COLS} FROM callbacks WHERE id = $1 FOR UPDATE");
        let row: Option<CallbackRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let before = row
            .ok_or_else(|| Error::NotFound(format!("callback {id}")))?
            .try_into_callback()?;

        let mut after = update.apply_to(&before);
        after.last_modified = Utc::now();
        if let Some(actor) = actor {
            after.last_modified_by = Some(actor.to_string());
        }

        sqlx::query(
            "UPDATE callbacks SET product = $1, vehicle_year = $2, car_make = $3, \
             car_model = $4, zip_code = $5, customer_name = $6, callback_number = $7, \
             follow_up_date = $8, status = $9, agent_name = $10, lead_score = $11, \
             comments = $12, last_modified = $13, last_modified_by = $14 WHERE id = $15",
        )
        .bind(&after.product)
        .bind(after.vehicle_year)
        .bind(&after.car_make)
        .bind(&after.car_model)
        .bind(&after.zip_code)
        .bind(&after.customer_name)
        .bind(&after.callback_number)
        .bind(after.follow_up_date)
        .bind(after.status.as_str())
        .bind(&after.agent_name)
        .bind(after.lead_score)
        .bind(&after.comments)
        .bind(after.last_modified)
        .bind(&after.last_modified_by)
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        if before.status != after.status {
            activity::log_status_change(&mut *tx, id, actor, before.status, after.status).await?;
        }

        let before_snap = before.editable_snapshot();
        let after_snap = after.editable_snapshot();
        let changes = diff::diff(&before_snap, &after_snap);
        if !changes.is_empty() {
            activity::log_edit(&mut *tx, id, actor, &before_snap, &after_snap, &changes).await?;
        }

        tx.commit().await?;

        debug!(id = %id, changed = changes.len(), "callback updated");
        metrics::callback_mutations().add(1, &[KeyValue::new("operation", "update")]);
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "callback.update")],
        );
        Ok(after)
    }

    /// Delete a callback. Its activity entries go with it (FK cascade).
    pub async fn delete_callback(&self, id: CallbackId) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM callbacks WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            return Err(Error::NotFound(format!("callback {id}")));
        }
        info!(id = %id, "callback deleted");
        metrics::callback_mutations().add(1, &[KeyValue::new("operation", "delete")]);
        Ok(())
    }

    /// Claim a callback for an actor.
    ///
    /// Grants when unclaimed, succeeds as a no-op when the actor already
    /// holds it (no duplicate `claim` activity), and fails with
    /// [`Error::ClaimHeld`] when another actor does. The check and the
    /// write share one transaction and one row lock.
    pub async fn claim_callback(&self, id: CallbackId, actor: &str) -> Result<Callback> {
        let started = std::time::Instant::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {CALLBACK_COLS} FROM callbacks WHERE id = $1 FOR UPDATE");
        let row: Option<CallbackRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let current = row
            .ok_or_else(|| Error::NotFound(format!("callback {id}")))?
            .try_into_callback()?;

        match current.claim_state().decide_claim(actor) {
            ClaimDecision::AlreadyOwn => {
                tx.commit().await?;
                debug!(id = %id, actor, "re-claim by current holder, no-op");
                record_claim_outcome("claim", "idempotent");
                Ok(current)
            }
            ClaimDecision::HeldByOther(holder) => {
                record_claim_outcome("claim", "conflict");
                Err(Error::ClaimHeld { id, holder })
            }
            ClaimDecision::Grant => {
                // RETURNING keeps the result inside the transaction; a
                // re-read on the pool could miss a row deleted right after
                // commit and misreport a claim that durably succeeded.
                let sql = format!(
                    "UPDATE callbacks SET claimed_by = $1, claimed_at = $2, \
                     last_modified = $2, last_modified_by = $1 WHERE id = $3 \
                     RETURNING {CALLBACK_COLS}"
                );
                let row: CallbackRow = sqlx::query_as(&sql)
                    .bind(actor)
                    .bind(Utc::now())
                    .bind(id.0)
                    .fetch_one(&mut *tx)
                    .await?;
                activity::log_claim(&mut *tx, id, actor).await?;
                tx.commit().await?;
                let claimed = row.try_into_callback()?;

                info!(id = %id, actor, "callback claimed");
                record_claim_outcome("claim", "granted");
                metrics::operation_duration_ms().record(
                    started.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("operation", "callback.claim")],
                );
                Ok(claimed)
            }
        }
    }

    /// Release a claim. Only the current claimant may release; anything
    /// else fails with [`Error::NotClaimant`].
    pub async fn unclaim_callback(&self, id: CallbackId, actor: &str) -> Result<Callback> {
        let started = std::time::Instant::now();
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {CALLBACK_COLS} FROM callbacks WHERE id = $1 FOR UPDATE");
        let row: Option<CallbackRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        let current = row
            .ok_or_else(|| Error::NotFound(format!("callback {id}")))?
            .try_into_callback()?;

        match current.claim_state().decide_release(actor) {
            ReleaseDecision::NotHolder => {
                record_claim_outcome("unclaim", "forbidden");
                Err(Error::NotClaimant { id })
            }
            ReleaseDecision::Release => {
                let sql = format!(
                    "UPDATE callbacks SET claimed_by = NULL, claimed_at = NULL, \
                     last_modified = $1, last_modified_by = $2 WHERE id = $3 \
                     RETURNING {CALLBACK_COLS}"
                );
                let row: CallbackRow = sqlx::query_as(&sql)
                    .bind(Utc::now())
                    .bind(actor)
                    .bind(id.0)
                    .fetch_one(&mut *tx)
                    .await?;
                activity::log_unclaim(&mut *tx, id, actor).await?;
                tx.commit().await?;
                let released = row.try_into_callback()?;

                info!(id = %id, actor, "callback released");
                record_claim_outcome("unclaim", "released");
                metrics::operation_duration_ms().record(
                    started.elapsed().as_secs_f64() * 1000.0,
                    &[KeyValue::new("operation", "callback.unclaim")],
                );
                Ok(released)
            }
        }
    }

    /// NotFound unless the callback row exists.
    pub(crate) async fn require_callback(&self, id: CallbackId) -> Result<()> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM callbacks WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("callback {id}")))
    }
}

fn record_claim_outcome(operation: &'static str, outcome: &'static str) {
    metrics::claim_attempts().add(
        1,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("outcome", outcome),
        ],
    );
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct CallbackRow {
    id: i64,
    product: Option<String>,
    vehicle_year: Option<i32>,
    car_make: Option<String>,
    car_model: Option<String>,
    zip_code: Option<String>,
    customer_name: String,
    callback_number: String,
    follow_up_date: Option<chrono::NaiveDate>,
    status: String,
    agent_name: Option<String>,
    lead_score: Option<f64>,
    comments: Option<String>,
    claimed_by: Option<String>,
    claimed_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
    last_modified_by: Option<String>,
}

impl CallbackRow {
    fn try_into_callback(self) -> Result<Callback> {
        Ok(Callback {
            id: CallbackId(self.id),
            product: self.product,
            vehicle_year: self.vehicle_year,
            car_make: self.car_make,
            car_model: self.car_model,
            zip_code: self.zip_code,
            customer_name: self.customer_name,
            callback_number: self.callback_number,
            follow_up_date: self.follow_up_date,
            status: self.status.parse()?,
            agent_name: self.agent_name,
            lead_score: self.lead_score,
            comments: self.comments,
            claimed_by: self.claimed_by,
            claimed_at: self.claimed_at,
            created_at: self.created_at,
            last_modified: self.last_modified,
            last_modified_by: self.last_modified_by,
        })
    }
}
