use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the query pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Malformed operator configuration. Fatal at startup; never produced
    /// while serving traffic.
    #[error("{0}")]
    Grammar(String),

    /// Unknown mount, entity, or an operation the entity does not permit.
    /// The cause is intentionally not distinguished.
    #[error("Not Found")]
    NotFound,

    /// Missing credentials on a protected entity.
    #[error("not authenticated")]
    Unauthorized,

    /// Bad filter syntax, unsupported operator, exceeded clause count, or a
    /// failed structural validator. Carries the first failure encountered.
    #[error("{0}")]
    Validation(String),

    /// Database execution failure, with the driver error text.
    #[error("query error: {0}")]
    Upstream(String),
}

impl ApiError {
    /// HTTP status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Grammar(_) => 500,
            ApiError::NotFound => 404,
            ApiError::Unauthorized => 401,
            ApiError::Validation(_) => 400,
            ApiError::Upstream(_) => 400,
        }
    }
}

/// Result type alias for pipeline operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Uniform error envelope returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status_code(),
            timestamp: Utc::now(),
        }
    }
}
