// src/database/profile_jobs.rs
use crate::models::{NewProfileJob, ProfileJob};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

const PROFILE_JOB_COLUMNS: &str = "id, profile_id, job_id, job_hash, score, explanation, \
                                   first_skill_match, second_skill_match, third_skill_match, \
                                   summary, created_at, updated_at";

pub struct ProfileJobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProfileJobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_profile_jobs(&self, profile_id: i64) -> Result<Vec<ProfileJob>> {
        let jobs = sqlx::query_as::<_, ProfileJob>(&format!(
            "SELECT {} FROM profile_jobs WHERE profile_id = ? ORDER BY created_at DESC, id DESC",
            PROFILE_JOB_COLUMNS
        ))
        .bind(profile_id)
        .fetch_all(self.pool)
        .await?;
        Ok(jobs)
    }

    pub async fn get_profile_job_by_id(&self, id: i64) -> Result<Option<ProfileJob>> {
        let job = sqlx::query_as::<_, ProfileJob>(&format!(
            "SELECT {} FROM profile_jobs WHERE id = ?",
            PROFILE_JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(job)
    }

    /// Link evaluated jobs to a profile, replacing the evaluation of a job
    /// that was already linked
    pub async fn bulk_insert_profile_jobs(&self, jobs: &[NewProfileJob]) -> Result<Vec<ProfileJob>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(jobs.len());

        for job in jobs {
            let row = sqlx::query_as::<_, ProfileJob>(&format!(
                r#"
                INSERT INTO profile_jobs (profile_id, job_id, job_hash, score, explanation,
                                          first_skill_match, second_skill_match,
                                          third_skill_match, summary, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (profile_id, job_id) DO UPDATE SET
                    job_hash = excluded.job_hash,
                    score = excluded.score,
                    explanation = excluded.explanation,
                    first_skill_match = excluded.first_skill_match,
                    second_skill_match = excluded.second_skill_match,
                    third_skill_match = excluded.third_skill_match,
                    summary = excluded.summary,
                    updated_at = excluded.updated_at
                RETURNING {}
                "#,
                PROFILE_JOB_COLUMNS
            ))
            .bind(job.profile_id)
            .bind(job.job_id)
            .bind(&job.job_hash)
            .bind(job.score)
            .bind(&job.explanation)
            .bind(&job.first_skill_match)
            .bind(&job.second_skill_match)
            .bind(&job.third_skill_match)
            .bind(&job.summary)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to link job {} to profile {}", job.job_id, job.profile_id)
            })?;

            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }
}
