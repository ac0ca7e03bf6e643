//! Error handling for the VMI proposal server
//!
//! Every failure leaves a handler as one JSON body of the form
//! `{"error": {"code", "message", "field"?, "retryable"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// SQLSTATEs that mean "try the whole operation again"
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
    "57014", // query_canceled (statement timeout)
];
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Business rule errors
    #[error("Validation error: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Storage errors
    #[error("Temporary storage failure: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownBusinessUnit(value) => {
                AppError::validation("business_unit", format!("Unknown business unit: {}", value))
            }
            DomainError::Validation { field, message } => AppError::Validation {
                field: Some(field),
                message,
            },
            DomainError::NotFound(resource) => AppError::NotFound(resource),
            DomainError::Conflict(message) => AppError::Conflict(message),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return AppError::Transient(err.to_string());
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return AppError::NotFound("Record".to_string());
        }

        let (code, constraint) = match &err {
            sqlx::Error::Database(db) => (
                db.code().map(|c| c.into_owned()),
                db.constraint().map(str::to_string),
            ),
            _ => (None, None),
        };

        match code.as_deref() {
            Some(code) if TRANSIENT_SQLSTATES.contains(&code) => AppError::Transient(err.to_string()),
            Some(UNIQUE_VIOLATION) => AppError::Conflict(conflict_message(constraint.as_deref())),
            Some(FOREIGN_KEY_VIOLATION) => AppError::NotFound(
                constraint
                    .map(|c| format!("Referenced record ({})", c))
                    .unwrap_or_else(|| "Referenced record".to_string()),
            ),
            _ => AppError::Database(err),
        }
    }
}

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("vmi_proposals_one_active_per_dispensary") => {
            "Dispensary already has an active proposal. Reload and retry.".to_string()
        }
        Some("vmi_proposal_versions_proposal_id_version_number_key") => {
            "Proposal was changed by someone else. Reload and retry.".to_string()
        }
        Some(name) => format!("Duplicate entry violates {}", name),
        None => "Duplicate entry".to_string(),
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let first = field_errors.iter().next();
        match first {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(field.to_string(), message)
            }
            None => AppError::Validation {
                field: None,
                message: errors.to_string(),
            },
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            retryable: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = match &self {
            AppError::Unauthorized(msg) => ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            AppError::InsufficientPermissions => ErrorDetail::new(
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
            ),
            AppError::Validation { field, message } => ErrorDetail {
                field: field.clone(),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
            },
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::Conflict(msg) => ErrorDetail::new("CONFLICT", msg.clone()),
            AppError::Transient(_) => ErrorDetail {
                retryable: true,
                ..ErrorDetail::new(
                    "TEMPORARILY_UNAVAILABLE",
                    "The service is temporarily unavailable. Please retry.",
                )
            },
            AppError::Database(_) => ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            AppError::Configuration(_) => {
                ErrorDetail::new("CONFIGURATION_ERROR", "The server is misconfigured")
            }
            AppError::Internal(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
