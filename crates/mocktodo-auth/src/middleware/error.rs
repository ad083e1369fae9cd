//! Error response handling for authentication middleware.
//!
//! Every error body has the OAuth 2.0 shape
//! `{"error": <code>, "error_description": <message>}`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// JSON error body shared by every route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: impl Into<String>, error_description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: error_description.into(),
        }
    }
}

/// Builds an error response. 401 responses get a `WWW-Authenticate` header.
#[must_use]
pub fn error_response(status: StatusCode, error: &str, description: &str) -> Response {
    let mut response = (status, Json(ErrorBody::new(error, description))).into_response();

    if status == StatusCode::UNAUTHORIZED {
        let www_auth = build_www_authenticate_header(error, description);
        if let Ok(value) = HeaderValue::from_str(&www_auth) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
    }

    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if self.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "Request failed");
        }
        error_response(status, self.oauth_error_code(), &self.to_string())
    }
}

/// Maps an error to its HTTP status.
#[must_use]
pub fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidCredentials
        | AuthError::Unauthorized { .. }
        | AuthError::InvalidClient { .. }
        | AuthError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::UsernameTaken { .. } => StatusCode::CONFLICT,
        AuthError::InvalidRequest { .. }
        | AuthError::UnsupportedMode { .. }
        | AuthError::InvalidGrant { .. }
        | AuthError::InvalidScope { .. }
        | AuthError::UnsupportedResponseType { .. }
        | AuthError::UnsupportedGrantType { .. } => StatusCode::BAD_REQUEST,
        AuthError::Storage { .. } | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="mocktodo", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!("Bearer realm=\"mocktodo\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}
