//! Actor directory interface.
//!
//! Authentication lives outside this crate; these operations exist so the
//! activity log can attach display names and so actor deletion exercises
//! the nullify-on-delete relationship (history outlives its authors).

use crate::error::Result;
use crate::model::ActorInfo;

impl super::Db {
    /// Create or rename an actor.
    pub async fn upsert_actor(&self, id: &str, username: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username",
        )
        .bind(id)
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove an actor. Activities that reference them keep their rows;
    /// the FK nulls the reference. Returns whether a row was removed.
    pub async fn delete_actor(&self, id: &str) -> Result<bool> {
        let rows_affected = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    /// Resolve an actor id to identity, if they still exist.
    pub async fn resolve_actor(&self, id: &str) -> Result<Option<ActorInfo>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, username)| ActorInfo { id, username }))
    }
}
