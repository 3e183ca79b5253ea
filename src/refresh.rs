// src/refresh.rs
//! Refreshing a profile's job list.
//!
//! A refresh creates a session row, starts a fetch run in the background and
//! consumes its events: batches are saved and scored as they arrive, status
//! messages land in the session description and the terminal event closes
//! the session.

use crate::database::Database;
use crate::events::{FetchEvent, FAILURE_MESSAGE};
use crate::fetchers::linkedin::url::DEFAULT_GEO_ID;
use crate::job_match::JobMatchEvaluator;
use crate::models::{
    Job, JobRecord, NewProfileJob, Profile, RefreshState, RefreshStatus, RefreshStep, RefreshUpdate,
    SourceId,
};
use crate::orchestrator::FetchOrchestrator;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

pub const SAVE_FAILURE_MESSAGE: &str = "Error saving fetched jobs.";
pub const UNEXPECTED_END_MESSAGE: &str = "Job fetch ended unexpectedly.";

#[derive(Clone)]
pub struct RefreshService {
    db: Database,
    orchestrator: Arc<FetchOrchestrator>,
    evaluator: Arc<dyn JobMatchEvaluator>,
    default_location: String,
}

/// A started refresh: its session as returned to the caller and the task
/// following the run
pub struct RefreshHandle {
    pub status: RefreshStatus,
    pub task: JoinHandle<()>,
}

impl RefreshService {
    pub fn new(
        db: Database,
        orchestrator: Arc<FetchOrchestrator>,
        evaluator: Arc<dyn JobMatchEvaluator>,
    ) -> Self {
        Self {
            db,
            orchestrator,
            evaluator,
            default_location: DEFAULT_GEO_ID.to_string(),
        }
    }

    /// Location used for profiles that have none
    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// Start a refresh and return its session right away. `None` when the
    /// profile does not exist.
    pub async fn start_refresh(&self, profile_id: i64) -> Result<Option<RefreshStatus>> {
        Ok(self.spawn_refresh(profile_id).await?.map(|handle| handle.status))
    }

    pub async fn spawn_refresh(&self, profile_id: i64) -> Result<Option<RefreshHandle>> {
        let Some(profile) = self.db.profiles().get_profile_by_id(profile_id).await? else {
            warn!(profile_id, "Refresh requested for unknown profile");
            return Ok(None);
        };

        let refresh = self.db.refresh_status();
        let session = refresh.new_profile_refresh_status(profile.id).await?;
        let status = match self.mark_started(session.id).await {
            Ok(status) => status,
            Err(e) => {
                error!(refresh_id = session.id, "Failed to start refresh: {:#}", e);
                if let Err(end_err) = refresh.end_failure(session.id, FAILURE_MESSAGE).await {
                    error!("Failed to fail refresh session: {:#}", end_err);
                }
                return Err(e);
            }
        };

        let location = profile
            .location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .unwrap_or(self.default_location.as_str())
            .to_string();

        info!(
            refresh_id = session.id,
            profile = %profile.name,
            keywords = ?profile.keywords,
            %location,
            "Starting job refresh"
        );

        let events = self
            .orchestrator
            .spawn(profile.keywords.clone(), location);

        let span = info_span!("refresh", refresh_id = session.id, profile_id = profile.id);
        let consumer = RefreshConsumer {
            db: self.db.clone(),
            evaluator: Arc::clone(&self.evaluator),
            profile,
            refresh_id: session.id,
        };
        let task = tokio::spawn(consumer.run(events).instrument(span));

        Ok(Some(RefreshHandle { status, task }))
    }

    async fn mark_started(&self, refresh_id: i64) -> Result<RefreshStatus> {
        let refresh = self.db.refresh_status();
        refresh
            .update_refresh_status(
                refresh_id,
                &RefreshUpdate {
                    status: Some(RefreshState::InProgress),
                    step: Some(RefreshStep::FetchingJobs),
                    description: Some("Started job fetch.".to_string()),
                },
            )
            .await?;
        refresh
            .get_refresh_status(refresh_id)
            .await?
            .with_context(|| format!("Refresh session {} vanished", refresh_id))
    }
}

struct RefreshConsumer {
    db: Database,
    evaluator: Arc<dyn JobMatchEvaluator>,
    profile: Profile,
    refresh_id: i64,
}

impl RefreshConsumer {
    async fn run(self, mut events: mpsc::Receiver<FetchEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                FetchEvent::BatchReady { source, jobs } => {
                    let count = jobs.len();
                    if let Err(e) = self.save_batch(source, jobs).await {
                        error!(count, "Error saving fetched jobs: {:#}", e);
                        self.end_failure(SAVE_FAILURE_MESSAGE).await;
                        return;
                    }
                }
                FetchEvent::StatusUpdate(message) => {
                    self.update(RefreshUpdate::description(message)).await;
                }
                FetchEvent::Completed { summary, .. } => {
                    if let Err(e) = self
                        .db
                        .refresh_status()
                        .end_success(self.refresh_id, &summary)
                        .await
                    {
                        error!("Failed to complete refresh session: {:#}", e);
                    }
                    return;
                }
                FetchEvent::Failed(message) => {
                    self.end_failure(&message).await;
                    return;
                }
            }
        }

        warn!("Fetch events ended without a terminal event");
        self.end_failure(UNEXPECTED_END_MESSAGE).await;
    }

    async fn save_batch(&self, source: SourceId, records: Vec<JobRecord>) -> Result<()> {
        let saved = self.db.jobs().bulk_insert_jobs(&records).await?;

        let linked: HashMap<i64, String> = self
            .db
            .profile_jobs()
            .get_profile_jobs(self.profile.id)
            .await?
            .into_iter()
            .map(|link| (link.job_id, link.job_hash))
            .collect();

        let to_evaluate: Vec<&Job> = saved
            .iter()
            .filter(|job| linked.get(&job.id) != Some(&job.hash))
            .collect();

        if !to_evaluate.is_empty() {
            self.update(RefreshUpdate {
                step: Some(RefreshStep::FilteringJobs),
                ..Default::default()
            })
            .await;

            let mut evaluated = Vec::with_capacity(to_evaluate.len());
            for job in to_evaluate {
                if let Some(link) = self.evaluate(job).await {
                    evaluated.push(link);
                }
            }
            self.db
                .profile_jobs()
                .bulk_insert_profile_jobs(&evaluated)
                .await?;
        }

        info!(
            source = %source,
            saved = saved.len(),
            "Fetched and saved {} jobs for profile {}",
            saved.len(),
            self.profile.name
        );
        self.update(RefreshUpdate {
            step: Some(RefreshStep::FetchingJobs),
            description: Some(format!(
                "Fetched and saved {} jobs for profile {}.",
                saved.len(),
                self.profile.name
            )),
            ..Default::default()
        })
        .await;

        Ok(())
    }

    async fn evaluate(&self, job: &Job) -> Option<NewProfileJob> {
        match self.evaluator.evaluate(&self.profile, job).await {
            Ok(evaluation) => Some(NewProfileJob {
                profile_id: self.profile.id,
                job_id: job.id,
                job_hash: job.hash.clone(),
                score: Some(evaluation.score),
                explanation: Some(evaluation.explanation),
                first_skill_match: evaluation.first_skill_match,
                second_skill_match: evaluation.second_skill_match,
                third_skill_match: evaluation.third_skill_match,
                summary: evaluation.summary,
            }),
            Err(e) => {
                warn!(job_id = job.id, "Skipping job, evaluation failed: {:#}", e);
                None
            }
        }
    }

    async fn update(&self, update: RefreshUpdate) {
        if let Err(e) = self
            .db
            .refresh_status()
            .update_refresh_status(self.refresh_id, &update)
            .await
        {
            error!("Failed to update refresh session: {:#}", e);
        }
    }

    async fn end_failure(&self, message: &str) {
        if let Err(e) = self
            .db
            .refresh_status()
            .end_failure(self.refresh_id, message)
            .await
        {
            error!("Failed to fail refresh session: {:#}", e);
        }
    }
}
