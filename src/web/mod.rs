// src/web/mod.rs
//! REST API mounted under `/api`

pub mod handlers;
pub mod types;

pub use types::*;

use crate::config::AppConfig;
use crate::database::Database;
use crate::job_match::HttpJobMatchEvaluator;
use crate::models::{Job, Profile, ProfileJob, RefreshStatus, User};
use crate::orchestrator::FetchOrchestrator;
use crate::refresh::RefreshService;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/health")]
pub async fn health(db: &State<Database>) -> Result<Json<TextResponse>, ApiError> {
    handlers::health_handler(db).await
}

#[get("/users")]
pub async fn list_users(db: &State<Database>) -> ApiResult<Vec<User>> {
    handlers::list_users_handler(db).await
}

#[get("/users/<id>")]
pub async fn get_user(id: i64, db: &State<Database>) -> ApiResult<User> {
    handlers::get_user_handler(id, db).await
}

#[get("/profiles")]
pub async fn list_profiles(db: &State<Database>) -> ApiResult<Vec<Profile>> {
    handlers::list_profiles_handler(db).await
}

#[get("/profiles/<id>")]
pub async fn get_profile(id: i64, db: &State<Database>) -> ApiResult<Profile> {
    handlers::get_profile_handler(id, db).await
}

#[get("/jobs?<source>")]
pub async fn list_jobs(source: Option<String>, db: &State<Database>) -> ApiResult<Vec<Job>> {
    handlers::list_jobs_handler(source, db).await
}

#[get("/jobs/<source>/<source_job_id>")]
pub async fn get_job(source: String, source_job_id: String, db: &State<Database>) -> ApiResult<Job> {
    handlers::get_job_handler(source, source_job_id, db).await
}

#[post("/profiles/<id>/jobs/refresh")]
pub async fn refresh_profile_jobs(
    id: i64,
    refresh: &State<RefreshService>,
) -> ApiResult<RefreshStarted> {
    handlers::refresh_profile_jobs_handler(id, refresh).await
}

#[get("/profiles/<id>/jobs/refresh/<refresh_id>")]
pub async fn get_refresh_status(
    id: i64,
    refresh_id: i64,
    db: &State<Database>,
) -> ApiResult<RefreshStatus> {
    handlers::get_refresh_status_handler(id, refresh_id, db).await
}

#[get("/profiles/<id>/jobs")]
pub async fn list_profile_jobs(id: i64, db: &State<Database>) -> ApiResult<Vec<ProfileJob>> {
    handlers::list_profile_jobs_handler(id, db).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format",
        "BAD_REQUEST",
        vec!["Check the request path and query parameters".to_string()],
    ))
}

#[rocket::catch(404)]
pub fn not_found_catcher() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found",
        "NOT_FOUND",
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid path parameter",
        "BAD_REQUEST",
        vec!["Identifiers are integers".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error",
        "INTERNAL_ERROR",
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

pub fn build_rocket(figment: Figment, db: Database, refresh: RefreshService) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Cors)
        .manage(db)
        .manage(refresh)
        .register(
            "/api",
            catchers![bad_request, not_found_catcher, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                health,
                list_users,
                get_user,
                list_profiles,
                get_profile,
                list_jobs,
                get_job,
                refresh_profile_jobs,
                get_refresh_status,
                list_profile_jobs,
                options,
            ],
        )
}

pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let db = Database::new(&config.environment.database_path).await?;

    let evaluator = HttpJobMatchEvaluator::with_timeout(
        config.service.job_matching_url.clone(),
        Duration::from_secs(config.service.timeout_seconds),
    )?;
    let refresh = RefreshService::new(
        db.clone(),
        Arc::new(FetchOrchestrator::from_config(&config.fetch)),
        Arc::new(evaluator),
    )
    .with_default_location(config.fetch.default_location.clone());

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    info!("Starting job refresh API server");
    info!("Environment: {}", config.environment.name);
    info!("Database: {}", config.environment.database_path.display());
    info!(
        "Server: http://{}:{}",
        config.server.address, config.server.port
    );
    info!("Job matching service: {}", config.service.job_matching_url);

    build_rocket(figment, db, refresh)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server failed: {}", e))?;

    Ok(())
}
