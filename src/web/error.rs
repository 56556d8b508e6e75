use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::db::services::{BookmarkError, TagError};
use crate::places::PlacesError;
use crate::services::auth_service::AuthError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16, message: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::MissingConfiguration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::UpstreamStatus { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "Database error while handling request.");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::InternalServerError(msg) => {
                error!(error = %msg, "Internal error while handling request.");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}

impl From<BookmarkError> for AppError {
    fn from(err: BookmarkError) -> Self {
        match err {
            BookmarkError::DbErr(e) => e.into(),
            BookmarkError::NotFound(_) => AppError::NotFound("Bookmark not found".to_string()),
            BookmarkError::TagNotFound(_) => AppError::NotFound("Tag not found".to_string()),
            BookmarkError::AlreadyBookmarked => AppError::Conflict("Already bookmarked".to_string()),
            BookmarkError::Unauthenticated => AppError::Unauthorized("Not authenticated".to_string()),
            BookmarkError::InvalidInput(msg) => AppError::InvalidInput(msg),
        }
    }
}

impl From<TagError> for AppError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::DbErr(e) => e.into(),
            TagError::NotFound(_) => AppError::NotFound("Tag not found".to_string()),
            TagError::DuplicateName => {
                AppError::Conflict("A tag with this name already exists.".to_string())
            }
            TagError::InvalidColor(color) => AppError::InvalidInput(format!("Invalid tag color: {color}")),
            TagError::InvalidInput(msg) => AppError::InvalidInput(msg),
        }
    }
}

impl From<PlacesError> for AppError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::MissingApiKey => {
                AppError::MissingConfiguration("Google Maps API key not configured".to_string())
            }
            PlacesError::InvalidRequest(msg) => AppError::InvalidInput(msg),
            PlacesError::NotFound => AppError::NotFound("Place not found".to_string()),
            PlacesError::Upstream(msg) => AppError::Upstream(msg),
            PlacesError::UpstreamStatus(status) => AppError::UpstreamStatus {
                status,
                message: "Failed to fetch photo".to_string(),
            },
            PlacesError::Http(e) => AppError::InternalServerError(format!("Places request failed: {e}")),
            PlacesError::InvalidPayload(msg) => {
                AppError::InternalServerError(format!("Invalid places payload: {msg}"))
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) => {
                AppError::Unauthorized("Not authenticated".to_string())
            }
            AuthError::Exchange(msg) => AppError::Unauthorized(msg),
            AuthError::Http(e) => AppError::InternalServerError(format!("Auth request failed: {e}")),
        }
    }
}
