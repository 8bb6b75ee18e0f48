use thiserror::Error;

use teahouse_types::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse error taxonomy used to pick the user-facing alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Permission,
    Network,
    Backend,
    Validation,
    Cancelled,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Unauthorized(_) | ApiError::Forbidden(_) => ErrorCategory::Permission,
            ApiError::Network(_) => ErrorCategory::Network,
            ApiError::BadRequest(_) | ApiError::InvalidRecord(_) | ApiError::Io(_) => {
                ErrorCategory::Validation
            }
            ApiError::Cancelled => ErrorCategory::Cancelled,
            ApiError::Api(_) | ApiError::Serialization(_) | ApiError::NotFound(_) => {
                ErrorCategory::Backend
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidRecord(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
