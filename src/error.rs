//! JSON error responses for the HTTP API.

use axum::{
    Json,
    body::{self, Body},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::content::shadowing::ListingError;
use crate::db::{DbLockError, SeedError};
use crate::exam::FlowError;
use crate::services::pdf_report::PdfError;
use crate::services::scraper::ScrapeError;

/// Largest error body that [`strip_detail`] will rewrite
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal { message: String, detail: Option<String> },
}

impl ApiError {
    /// Internal error with the underlying cause kept as detail.
    pub fn internal(message: &str, cause: impl std::fmt::Display) -> Self {
        let detail = cause.to_string();
        tracing::error!("{}: {}", message, detail);
        ApiError::Internal {
            message: message.to_string(),
            detail: Some(detail),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::Internal { message, .. } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Internal { message, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                message,
                detail,
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            detail,
        };

        (status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::internal("Database error", err)
    }
}

impl From<DbLockError> for ApiError {
    fn from(err: DbLockError) -> Self {
        ApiError::internal("Database unavailable", err)
    }
}

impl From<SeedError> for ApiError {
    fn from(err: SeedError) -> Self {
        ApiError::internal("Failed to load questions", err)
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::InvalidPersonalInfo(msg) => ApiError::BadRequest(msg),
            other => ApiError::Conflict(other.to_string()),
        }
    }
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ListingError::InvalidSetName(_) => ApiError::BadRequest(err.to_string()),
            ListingError::IoError(e) => ApiError::internal("Failed to list audio", e),
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::InvalidUrl(_) => ApiError::BadRequest(err.to_string()),
            ScrapeError::NothingFound(_) | ScrapeError::UpstreamStatus(404) => {
                ApiError::NotFound(err.to_string())
            }
            other => ApiError::internal("Scrape failed", other),
        }
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        ApiError::internal("PDF generation failed", err)
    }
}

/// Error boundary for handler panics: 500 with a reload hint.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);

    let body = serde_json::json!({
        "error": "internal",
        "message": "Something went wrong. Reload the page to try again.",
        "detail": detail,
        "reload": true,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Response layer for production: removes `detail` from JSON error bodies.
pub async fn strip_detail(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !response.status().is_server_error() || !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body::to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Could not read error body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let stripped = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) => {
            if let Some(obj) = value.as_object_mut() {
                obj.remove("detail");
            }
            serde_json::to_vec(&value).unwrap_or_default()
        }
        Err(_) => bytes.to_vec(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(stripped))
}
