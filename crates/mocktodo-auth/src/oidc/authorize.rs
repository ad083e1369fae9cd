//! Authorization endpoint types.
//!
//! The endpoint is the first step of the authorization code flow:
//!
//! 1. Client sends the user to `/auth/authorize` with its client id,
//!    redirect URI, scope and state
//! 2. User submits username and password on the login prompt
//! 3. Server redirects back to the client with an authorization code
//! 4. Client exchanges the code at `/auth/token`
//!
//! Errors after the redirect URI has been validated travel back to the
//! client as query parameters on that URI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authorization request parameters.
///
/// Every field is optional at the parsing layer so that a missing value is
/// reported as `invalid_request` by the provider rather than as a generic
/// extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

impl AuthorizationRequest {
    /// Fills fields absent here from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            client_id: self.client_id.or(fallback.client_id),
            redirect_uri: self.redirect_uri.or(fallback.redirect_uri),
            response_type: self.response_type.or(fallback.response_type),
            scope: self.scope.or(fallback.scope),
            state: self.state.or(fallback.state),
        }
    }

    /// The state to echo back, empty if none was sent.
    #[must_use]
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }
}

/// Body of the login prompt submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeForm {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Username and password from the login prompt.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AuthorizeForm {
    /// Splits the form into the request and the credentials. Credentials
    /// are `None` unless both fields are non-empty.
    #[must_use]
    pub fn into_parts(self) -> (AuthorizationRequest, Option<LoginCredentials>) {
        let request = AuthorizationRequest {
            client_id: self.client_id,
            redirect_uri: self.redirect_uri,
            response_type: self.response_type,
            scope: self.scope,
            state: self.state,
        };

        let credentials = match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(LoginCredentials { username, password })
            }
            _ => None,
        };

        (request, credentials)
    }
}

/// Successful authorization, sent as a redirect.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed state; omitted from the URL when empty.
    pub state: String,
}

impl AuthorizationResponse {
    #[must_use]
    pub fn new(code: String, state: String) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if !self.state.is_empty() {
                pairs.append_pair("state", &self.state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error, sent as a redirect to a validated redirect URI.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    pub error: AuthorizationErrorCode,
    pub error_description: String,
    pub state: String,
}

impl AuthorizationError {
    #[must_use]
    pub fn new(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            error,
            error_description: description.into(),
            state: state.into(),
        }
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not an absolute URL.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            pairs.append_pair("error_description", &self.error_description);
            if !self.state.is_empty() {
                pairs.append_pair("state", &self.state);
            }
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 Section 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    InvalidRequest,
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
}

impl AuthorizationErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
