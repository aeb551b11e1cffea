use std::collections::BTreeMap;

use sea_orm::DbErr;
use thiserror::Error;

/// Failure taxonomy shared by all services. Mutating operations run inside a
/// transaction; returning any of these before commit rolls the whole call
/// back, audit row included.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, String>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("audit snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    pub fn field_validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.clone());
        ApiError::Validation { message, errors }
    }

    /// Stable machine-readable code, mirrored into HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "RESOURCE_NOT_FOUND",
            ApiError::AccessDenied(_) => "ACCESS_DENIED",
            ApiError::Duplicate(_) => "DUPLICATE_RESOURCE",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "BUSINESS_LOGIC_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Db(_) | ApiError::Snapshot(_) | ApiError::Internal(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }
}
