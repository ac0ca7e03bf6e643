//! Domain errors raised by the pure rules in this crate

use thiserror::Error;

/// Errors produced by domain rules before anything is persisted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown business unit: {0}")]
    UnknownBusinessUnit(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
