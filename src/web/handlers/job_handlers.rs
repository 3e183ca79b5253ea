// src/web/handlers/job_handlers.rs
use crate::database::Database;
use crate::models::{Job, ProfileJob, RefreshStatus};
use crate::refresh::RefreshService;
use crate::utils::source_from_param;
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn list_jobs_handler(source: Option<String>, db: &State<Database>) -> ApiResult<Vec<Job>> {
    let source = match source.as_deref() {
        Some(raw) => Some(source_from_param(raw).ok_or_else(|| invalid_source(raw))?),
        None => None,
    };

    let jobs = db.jobs().get_all_jobs(source).await.map_err(database_error)?;
    Ok(Json(DataResponse::success(
        format!("Found {} jobs", jobs.len()),
        jobs,
    )))
}

pub async fn get_job_handler(
    source: String,
    source_job_id: String,
    db: &State<Database>,
) -> ApiResult<Job> {
    let source_id = source_from_param(&source).ok_or_else(|| invalid_source(&source))?;

    let job = db
        .jobs()
        .get_job_by_source_id(source_id, &source_job_id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found("Job"))?;
    Ok(Json(DataResponse::success("Job found", job)))
}

pub async fn refresh_profile_jobs_handler(
    profile_id: i64,
    refresh: &State<RefreshService>,
) -> ApiResult<RefreshStarted> {
    let status = refresh
        .start_refresh(profile_id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found("Profile"))?;

    info!(profile_id, refresh_id = status.id, "Job refresh started");
    Ok(Json(DataResponse::success(
        "Job refresh started",
        RefreshStarted {
            refresh_status_id: status.id,
        },
    )))
}

pub async fn get_refresh_status_handler(
    profile_id: i64,
    refresh_id: i64,
    db: &State<Database>,
) -> ApiResult<RefreshStatus> {
    let status = db
        .refresh_status()
        .get_refresh_status(refresh_id)
        .await
        .map_err(database_error)?
        .filter(|status| status.profile_id == profile_id)
        .ok_or_else(|| not_found("Refresh status"))?;
    Ok(Json(DataResponse::success("Refresh status found", status)))
}

pub async fn list_profile_jobs_handler(
    profile_id: i64,
    db: &State<Database>,
) -> ApiResult<Vec<ProfileJob>> {
    db.profiles()
        .get_profile_by_id(profile_id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| not_found("Profile"))?;

    let jobs = db
        .profile_jobs()
        .get_profile_jobs(profile_id)
        .await
        .map_err(database_error)?;
    Ok(Json(DataResponse::success(
        format!("Found {} jobs for profile", jobs.len()),
        jobs,
    )))
}
