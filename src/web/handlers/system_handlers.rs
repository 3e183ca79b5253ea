// src/web/handlers/system_handlers.rs
use crate::database::Database;
use crate::web::types::*;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{debug, error};

pub async fn health_handler(db: &State<Database>) -> Result<Json<TextResponse>, ApiError> {
    match db.health_check().await {
        Ok(()) => {
            debug!("Health check passed");
            Ok(Json(TextResponse::success("OK")))
        }
        Err(e) => {
            error!("Health check failed: {:#}", e);
            Err((
                Status::ServiceUnavailable,
                Json(StandardErrorResponse::new(
                    "Database unavailable",
                    "UNHEALTHY",
                    vec!["Check the database file and its permissions".to_string()],
                )),
            ))
        }
    }
}
