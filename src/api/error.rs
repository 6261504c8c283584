use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::db::DbError;
use crate::rules::RuleViolation;
use crate::storage::StorageError;

/// API error codes for client handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    ValidationError,
    Misconfigured,
    DatabaseError,
    StorageError,
    InternalError,
}

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
        }
    }
}

/// Wrapper for API results
pub type ApiResult<T> = Result<T, AppError>;

/// Application error that converts to HTTP responses
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: ApiError,
}

impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiError::new(code, message),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, ErrorCode::Conflict, message)
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Misconfigured,
            message,
        )
    }

    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::DatabaseError,
            err.to_string(),
        )
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::StorageError,
            err.to_string(),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            message,
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => Self::not_found(&msg),
            DbError::Validation(msg) => Self::validation(msg),
            DbError::Conflict(msg) => Self::conflict(msg),
            DbError::Forbidden(msg) => Self::forbidden(msg),
            DbError::Misconfigured(msg) => {
                tracing::error!("Misconfiguration: {}", msg);
                Self::misconfigured(msg)
            }
            other => {
                tracing::error!("Database error: {}", other);
                Self::database(other)
            }
        }
    }
}

impl From<RuleViolation> for AppError {
    fn from(violation: RuleViolation) -> Self {
        DbError::from(violation).into()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Storage error: {}", err);
        Self::storage(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) => Self::unauthorized("Invalid or expired token"),
            AuthError::Hash(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                Self::internal("Failed to process credentials")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_statuses() {
        let cases = [
            (DbError::NotFound("Feature 1".into()), StatusCode::NOT_FOUND, ErrorCode::NotFound),
            (DbError::Validation("bad".into()), StatusCode::BAD_REQUEST, ErrorCode::ValidationError),
            (DbError::Conflict("dup".into()), StatusCode::CONFLICT, ErrorCode::Conflict),
            (DbError::Forbidden("no".into()), StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            (
                DbError::Misconfigured("no list".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::Misconfigured,
            ),
            (
                DbError::Lock("poisoned".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status, status);
            assert_eq!(app.body.code, code);
        }
    }

    #[test]
    fn not_found_message_names_resource() {
        let app: AppError = DbError::NotFound("Feature 7".into()).into();
        assert_eq!(app.body.error, "Feature 7 not found");
    }

    #[test]
    fn error_code_serializes_screaming() {
        let body = serde_json::to_value(ApiError::new(ErrorCode::ValidationError, "x")).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "x");
    }
}
