use actix_web::{HttpResponse, error::ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::error::Error as SqlxError;
use std::error::Error as StdError;
use std::fmt;

/// Stable error taxonomy surfaced to callers (spec.md S7).
#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    Unauthorized(String),
    Forbidden(String),
    TrialExhausted(String),
    DurationExceeded(String),
    InsufficientBalance(String),
    Conflict(String),
    NotFound(String),
    EngineError(String),
    Internal(String),
    Database(String),
    Configuration(String),
    Serialization(String),
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    error_type: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::TrialExhausted(e) => write!(f, "Trial exhausted: {}", e),
            AppError::DurationExceeded(e) => write!(f, "Duration exceeded: {}", e),
            AppError::InsufficientBalance(e) => write!(f, "Insufficient balance: {}", e),
            AppError::Conflict(e) => write!(f, "Conflict: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::EngineError(e) => write!(f, "Engine error: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    /// Error code from the spec.md S7 taxonomy table.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::TrialExhausted(_) => "TRIAL_EXHAUSTED",
            AppError::DurationExceeded(_) => "DURATION_EXCEEDED",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::EngineError(_) => "ENGINE_ERROR",
            AppError::Database(_) | AppError::Internal(_) | AppError::Configuration(_)
            | AppError::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the dispatcher should not retry this failure.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_)
                | AppError::Unauthorized(_)
                | AppError::Forbidden(_)
                | AppError::TrialExhausted(_)
                | AppError::DurationExceeded(_)
                | AppError::InsufficientBalance(_)
                | AppError::Conflict(_)
                | AppError::NotFound(_)
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            code: self.status_code().as_u16(),
            message: self.to_string(),
            error_type: self.code().to_string(),
        };
        HttpResponse::build(self.status_code()).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::TrialExhausted(_) => StatusCode::FORBIDDEN,
            AppError::DurationExceeded(_) => StatusCode::FORBIDDEN,
            AppError::InsufficientBalance(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EngineError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Serialization(error.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::EngineError(error.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
