// src/database/refresh_status.rs
//! Lifecycle of a profile's refresh session.
//!
//! `PENDING -> IN_PROGRESS -> COMPLETED | FAILED`. Once a session is terminal
//! neither end transition touches it again.

use crate::models::{RefreshState, RefreshStatus, RefreshStep, RefreshUpdate};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

const REFRESH_COLUMNS: &str = "id, profile_id, status, step, description, created_at, updated_at";

pub struct RefreshStatusRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RefreshStatusRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn new_profile_refresh_status(&self, profile_id: i64) -> Result<RefreshStatus> {
        let now = Utc::now();

        let status = sqlx::query_as::<_, RefreshStatus>(&format!(
            r#"
            INSERT INTO refresh_status (profile_id, status, step, description, created_at, updated_at)
            VALUES (?, ?, ?, '', ?, ?)
            RETURNING {}
            "#,
            REFRESH_COLUMNS
        ))
        .bind(profile_id)
        .bind(RefreshState::Pending)
        .bind(RefreshStep::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .with_context(|| format!("Failed to create refresh session for profile {}", profile_id))?;

        info!(refresh_id = status.id, profile_id, "Created refresh session");
        Ok(status)
    }

    pub async fn get_refresh_status(&self, id: i64) -> Result<Option<RefreshStatus>> {
        let status = sqlx::query_as::<_, RefreshStatus>(&format!(
            "SELECT {} FROM refresh_status WHERE id = ?",
            REFRESH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(status)
    }

    /// Apply the fields set in `update`. Returns false for an empty update
    /// or an unknown session.
    pub async fn update_refresh_status(&self, id: i64, update: &RefreshUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE refresh_status SET ");
        let mut fields = query.separated(", ");
        if let Some(status) = update.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(step) = update.step {
            fields.push("step = ").push_bind_unseparated(step);
        }
        if let Some(description) = &update.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        fields.push("updated_at = ").push_bind_unseparated(Utc::now());
        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the session COMPLETED. False when it was already terminal.
    pub async fn end_success(&self, id: i64, summary: &str) -> Result<bool> {
        self.end(id, RefreshState::Completed, summary).await
    }

    /// Mark the session FAILED. False when it was already terminal.
    pub async fn end_failure(&self, id: i64, error: &str) -> Result<bool> {
        self.end(id, RefreshState::Failed, error).await
    }

    async fn end(&self, id: i64, state: RefreshState, description: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_status
            SET status = ?, description = ?, updated_at = ?
            WHERE id = ? AND status NOT IN (?, ?)
            "#,
        )
        .bind(state)
        .bind(description)
        .bind(Utc::now())
        .bind(id)
        .bind(RefreshState::Completed)
        .bind(RefreshState::Failed)
        .execute(self.pool)
        .await?;

        let ended = result.rows_affected() > 0;
        if ended {
            info!(refresh_id = id, status = ?state, "Refresh session ended: {}", description);
        } else {
            warn!(refresh_id = id, status = ?state, "Refresh session already ended, ignoring");
        }
        Ok(ended)
    }
}
