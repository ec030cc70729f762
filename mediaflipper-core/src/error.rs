//! Error types for the job orchestration core.
//!
//! Mirrors the taxonomy in the orchestration spec: the first three variants
//! are user-visible (mapped to HTTP responses the worker/web boundary can
//! act on); the rest are logged and surfaced to operators only.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    DbError(String),

    #[error("cluster submission failed: {0}")]
    ClusterError(String),

    #[error("advisory lock busy: {0}")]
    LockBusy(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Log at the level appropriate to the error's visibility, per the
    /// taxonomy: client errors are debug-level noise, operator-facing
    /// failures are logged loudly.
    pub fn log(&self) {
        match self {
            AppError::BadRequest(_) | AppError::NotFound(_) => {
                tracing::debug!(error = %self, "client error");
            }
            AppError::LockBusy(_) => {
                tracing::warn!(error = %self, "advisory lock contention");
            }
            AppError::DbError(_) | AppError::ClusterError(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "operator-facing failure");
            }
        }
    }
}

/// Wire shape pinned by the result-intake and bulk-list HTTP contracts:
/// `{status, detail}`. Worker callbacks and bulk-upload clients parse this
/// shape, so it is not a generic envelope — it is load-bearing test surface.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub detail: String,
}

impl AppError {
    fn wire_status(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::DbError(_) => "db_error",
            AppError::ClusterError(_) => "cluster_error",
            AppError::LockBusy(_) => "lock_busy",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.wire_status(),
            detail: self.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Result intake deliberately overrides this to 200 for its own
            // persistence-failure path (§4.5 step 9); everywhere else a
            // store failure is a genuine 500.
            AppError::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ClusterError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LockBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        HttpResponse::build(self.status_code()).json(self.to_body())
    }
}
