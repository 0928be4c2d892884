use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::api::models::{ApiResponse, ErrorDetail};

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(self.envelope())
    }
}

impl AppError {
    /// Client-facing body; server-side failures are logged and answered generically.
    fn envelope(&self) -> ApiResponse {
        let message = if self.status_code().is_server_error() {
            tracing::error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let mut body = ApiResponse::error(message.clone());
        body.details = Some(vec![ErrorDetail {
            code: self.code().to_string(),
            message,
            field: match self {
                AppError::Validation { field, .. } => Some(field.clone()),
                _ => None,
            },
        }]);
        body
    }
}
