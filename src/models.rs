// src/models.rs
//! Records produced by the job fetchers and rows owned by the datastore

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== Job sources =====

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceId {
    Linkedin,
    Indeed,
    Glassdoor,
    CompanyWebsite,
    Other,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Linkedin => "LINKEDIN",
            SourceId::Indeed => "INDEED",
            SourceId::Glassdoor => "GLASSDOOR",
            SourceId::CompanyWebsite => "COMPANY_WEBSITE",
            SourceId::Other => "OTHER",
        }
    }

    /// Human readable board name used in status messages
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Linkedin => "LinkedIn",
            SourceId::Indeed => "Indeed",
            SourceId::Glassdoor => "Glassdoor",
            SourceId::CompanyWebsite => "company website",
            SourceId::Other => "other sources",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" | "li" => Ok(SourceId::Linkedin),
            "indeed" => Ok(SourceId::Indeed),
            "glassdoor" => Ok(SourceId::Glassdoor),
            "company_website" | "company-website" => Ok(SourceId::CompanyWebsite),
            "other" => Ok(SourceId::Other),
            other => anyhow::bail!("Unsupported job source: {}", other),
        }
    }
}

// ===== Fetch pipeline records =====

/// Identifying part of a listing, produced by the search-results phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStub {
    pub source_job_id: String,
    pub link: String,
}

/// Fully expanded listing, produced by the detail phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub source_id: SourceId,
    pub source_job_id: String,
    pub link: String,
    pub company: String,
    pub title: String,
    pub location: String,
    pub date_posted: String,
    pub description: String,
}

// ===== Persisted rows =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub additional_context: Option<String>,
    pub resume: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub additional_context: Option<String>,
    pub resume: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub source_id: SourceId,
    pub source_job_id: String,
    pub link: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub date_posted: String,
    pub description: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchScore {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "top")]
    Top,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileJob {
    pub id: i64,
    pub profile_id: i64,
    pub job_id: i64,
    pub job_hash: String,
    pub score: Option<MatchScore>,
    pub explanation: Option<String>,
    pub first_skill_match: Option<String>,
    pub second_skill_match: Option<String>,
    pub third_skill_match: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfileJob {
    pub profile_id: i64,
    pub job_id: i64,
    pub job_hash: String,
    pub score: Option<MatchScore>,
    pub explanation: Option<String>,
    pub first_skill_match: Option<String>,
    pub second_skill_match: Option<String>,
    pub third_skill_match: Option<String>,
    pub summary: Option<String>,
}

// ===== Refresh sessions =====

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RefreshState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefreshState::Completed | RefreshState::Failed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshStep {
    Pending,
    FetchingJobs,
    FilteringJobs,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshStatus {
    pub id: i64,
    pub profile_id: i64,
    pub status: RefreshState,
    pub step: RefreshStep,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a refresh session; unset fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct RefreshUpdate {
    pub status: Option<RefreshState>,
    pub step: Option<RefreshStep>,
    pub description: Option<String>,
}

impl RefreshUpdate {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.step.is_none() && self.description.is_none()
    }
}
