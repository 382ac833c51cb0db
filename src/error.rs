//! Application error type and its HTTP mapping.
//!
//! Every failure a handler can surface is an [`AppError`]. The variant picks
//! the status code; the message and `details` end up in the JSON body:
//!
//! ```json
//! { "error": { "code": "conflict", "message": "...", "details": { ... } } }
//! ```

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// Application-wide error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// The resource existed but is no longer served (expired short link).
    #[error("{message}")]
    Gone { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Destination is not an absolute http(s) URL.
    pub fn invalid_destination(reason: impl Into<String>) -> Self {
        Self::bad_request(
            "Invalid destination URL",
            json!({ "reason": reason.into() }),
        )
    }

    /// Expiration is not strictly in the future.
    pub fn invalid_expiration(expires_at: impl Serialize) -> Self {
        Self::bad_request(
            "Expiration must be in the future",
            json!({ "expires_at": expires_at }),
        )
    }

    /// Requested custom slug is already used as a slug or a generated code.
    pub fn slug_taken(slug: &str) -> Self {
        Self::conflict("Custom slug is already taken", json!({ "slug": slug }))
    }

    pub fn generation_exhausted(attempts: usize) -> Self {
        Self::internal(
            "Unable to generate a unique short code",
            json!({ "attempts": attempts }),
        )
    }

    pub fn link_not_found(details: Value) -> Self {
        Self::not_found("Short link not found", details)
    }

    pub fn expired(code: &str) -> Self {
        Self::gone("This short link has expired", json!({ "code": code }))
    }

    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Gone { .. } => "gone",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Gone { .. } => StatusCode::GONE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        let (message, details) = match self {
            Self::Validation { message, details }
            | Self::NotFound { message, details }
            | Self::Conflict { message, details }
            | Self::Gone { message, details }
            | Self::Internal { message, details } => (message.clone(), details.clone()),
        };

        ErrorInfo {
            code: self.code(),
            message,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!("Database error: {}", e);
        AppError::internal("Database error", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
        AppError::bad_request(
            "Request validation failed",
            json!({ "fields": fields, "reason": e.to_string() }),
        )
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::bad_request("Invalid JSON body", json!({ "reason": e.body_text() }))
    }
}
