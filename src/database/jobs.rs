// src/database/jobs.rs
use crate::models::{Job, JobRecord, SourceId};
use crate::utils::hash_job;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

const JOB_COLUMNS: &str = "id, source_id, source_job_id, link, company, position, location, \
                           date_posted, description, hash, created_at, updated_at";

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh scraped jobs in one transaction.
    ///
    /// Jobs are keyed on `(source_id, source_job_id)`; a listing seen again
    /// keeps its id and gets its fields, hash and `updated_at` replaced.
    pub async fn bulk_insert_jobs(&self, records: &[JobRecord]) -> Result<Vec<Job>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(records.len());

        for record in records {
            let hash = hash_job(&record.company, &record.title, &record.description);
            let job = sqlx::query_as::<_, Job>(&format!(
                r#"
                INSERT INTO jobs (source_id, source_job_id, link, company, position, location,
                                  date_posted, description, hash, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (source_id, source_job_id) DO UPDATE SET
                    link = excluded.link,
                    company = excluded.company,
                    position = excluded.position,
                    location = excluded.location,
                    date_posted = excluded.date_posted,
                    description = excluded.description,
                    hash = excluded.hash,
                    updated_at = excluded.updated_at
                RETURNING {}
                "#,
                JOB_COLUMNS
            ))
            .bind(record.source_id)
            .bind(&record.source_job_id)
            .bind(&record.link)
            .bind(&record.company)
            .bind(&record.title)
            .bind(&record.location)
            .bind(&record.date_posted)
            .bind(&record.description)
            .bind(&hash)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Failed to save job {}", record.source_job_id))?;

            saved.push(job);
        }

        tx.commit().await?;
        debug!("Saved {} jobs", saved.len());
        Ok(saved)
    }

    pub async fn get_all_jobs(&self, source: Option<SourceId>) -> Result<Vec<Job>> {
        let jobs = match source {
            Some(source) => {
                sqlx::query_as::<_, Job>(&format!(
                    "SELECT {} FROM jobs WHERE source_id = ? ORDER BY created_at DESC, id DESC",
                    JOB_COLUMNS
                ))
                .bind(source)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Job>(&format!(
                    "SELECT {} FROM jobs ORDER BY created_at DESC, id DESC",
                    JOB_COLUMNS
                ))
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(jobs)
    }

    pub async fn get_job_by_id(&self, id: i64) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(job)
    }

    pub async fn get_job_by_source_id(
        &self,
        source: SourceId,
        source_job_id: &str,
    ) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE source_id = ? AND source_job_id = ?",
            JOB_COLUMNS
        ))
        .bind(source)
        .bind(source_job_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(job)
    }
}
