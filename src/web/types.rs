// src/web/types.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct RefreshStarted {
    pub refresh_status_id: i64,
}

impl TextResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message: message.into(),
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message: message.into(),
            data,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: impl Into<String>, error_code: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error: error.into(),
            error_code: error_code.into(),
            suggestions,
        }
    }
}

/// Error half of every handler result: the status sent with the envelope
pub type ApiError = (Status, Json<StandardErrorResponse>);
pub type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

pub fn not_found(what: &str) -> ApiError {
    (
        Status::NotFound,
        Json(StandardErrorResponse::new(
            format!("{} not found", what),
            "NOT_FOUND",
            vec!["Check the identifier in the request path".to_string()],
        )),
    )
}

pub fn invalid_source(raw: &str) -> ApiError {
    (
        Status::BadRequest,
        Json(StandardErrorResponse::new(
            format!("Unsupported job source: {}", raw),
            "INVALID_SOURCE",
            vec!["Use 'linkedin' (or 'li')".to_string()],
        )),
    )
}

pub fn database_error(e: anyhow::Error) -> ApiError {
    error!("Database operation failed: {:#}", e);
    (
        Status::InternalServerError,
        Json(StandardErrorResponse::new(
            "Database operation failed",
            "DATABASE_ERROR",
            vec!["Try again in a few moments".to_string()],
        )),
    )
}
