// src/job_match.rs
//! Scoring of a scraped job against a profile.
//!
//! The evaluator is injected into the refresh flow, so tests and other
//! deployments can swap the HTTP service for anything implementing
//! [`JobMatchEvaluator`].

use crate::models::{Job, MatchScore, Profile};
use crate::utils::truncate_for_log;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const JOBS_MATCH_ENDPOINT: &str = "/jobs-match";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchEvaluation {
    pub score: MatchScore,
    pub explanation: String,
    pub first_skill_match: Option<String>,
    pub second_skill_match: Option<String>,
    pub third_skill_match: Option<String>,
    pub summary: Option<String>,
}

#[async_trait]
pub trait JobMatchEvaluator: Send + Sync {
    async fn evaluate(&self, profile: &Profile, job: &Job) -> Result<JobMatchEvaluation>;
}

#[derive(Debug, Serialize)]
struct JobMatchRequest<'a> {
    profile: ProfileContext<'a>,
    job: JobContext<'a>,
}

#[derive(Debug, Serialize)]
struct ProfileContext<'a> {
    name: &'a str,
    keywords: &'a [String],
    location: Option<&'a str>,
    additional_context: Option<&'a str>,
    resume: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JobContext<'a> {
    company: &'a str,
    position: &'a str,
    location: &'a str,
    link: &'a str,
    description: &'a str,
}

impl<'a> JobMatchRequest<'a> {
    fn new(profile: &'a Profile, job: &'a Job) -> Self {
        Self {
            profile: ProfileContext {
                name: &profile.name,
                keywords: &profile.keywords,
                location: profile.location.as_deref(),
                additional_context: profile.additional_context.as_deref(),
                resume: profile.resume.as_deref(),
            },
            job: JobContext {
                company: &job.company,
                position: &job.position,
                location: &job.location,
                link: &job.link,
                description: &job.description,
            },
        }
    }
}

/// Client for the external job-matching service
pub struct HttpJobMatchEvaluator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobMatchEvaluator {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, JOBS_MATCH_ENDPOINT)
    }
}

#[async_trait]
impl JobMatchEvaluator for HttpJobMatchEvaluator {
    async fn evaluate(&self, profile: &Profile, job: &Job) -> Result<JobMatchEvaluation> {
        let url = self.endpoint();
        debug!(job_id = job.id, profile_id = profile.id, "Calling job matching service: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&JobMatchRequest::new(profile, job))
            .send()
            .await
            .context("Failed to call job matching service")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                "Job matching service error {}: {}",
                status,
                truncate_for_log(&error_text, 200)
            );
            anyhow::bail!("Job matching service returned {}", status);
        }

        response
            .json::<JobMatchEvaluation>()
            .await
            .context("Failed to parse job matching response")
    }
}
