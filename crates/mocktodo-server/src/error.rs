//! Error types of the server crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mocktodo_auth::middleware::error_response;
use mocktodo_auth::{AuthError, ConfigError, JwtError};
use mocktodo_storage::StorageError;

/// Errors returned by the task and introspection handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(e) => mocktodo_auth::middleware::status_code(e),
            Self::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Storage(e) if e.is_already_exists() => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.oauth_error_code(),
            Self::Storage(e) if e.is_not_found() => "not_found",
            Self::Storage(e) if e.is_already_exists() => "conflict",
            Self::Storage(_) => "server_error",
            Self::BadRequest(_) => "invalid_request",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Auth(e) = self {
            return e.into_response();
        }
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        error_response(status, self.error_code(), &self.to_string())
    }
}

/// Errors raised while assembling a server from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("key setup failed: {0}")]
    Key(#[from] JwtError),
    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::bad_request("Invalid task ID").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::forbidden("Access denied").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(StorageError::not_found("Task", "7")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::io("data.json", "disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::unauthorized("Authentication required")).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_auth_errors_keep_challenge_header() {
        let response = ApiError::from(AuthError::unauthorized("x")).into_response();
        assert!(
            response
                .headers()
                .contains_key(axum::http::header::WWW_AUTHENTICATE)
        );
    }
}
