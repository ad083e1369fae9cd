//! Request authentication by configured mode.
//!
//! [`require_auth`] resolves each request to a [`Principal`] and stores it
//! in the request extensions; handlers read it back with [`CurrentUser`] or
//! [`MaybePrincipal`].
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use mocktodo_auth::middleware::{CurrentUser, require_auth};
//!
//! async fn whoami(CurrentUser(principal): CurrentUser) -> String {
//!     principal.user_id.to_string()
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(auth_state.clone(), require_auth))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{AuthConfig, AuthMode};
use crate::error::AuthError;
use crate::oidc::provider::OidcProvider;
use crate::service::AuthService;
use crate::session::{Session, SessionRegistry};

use super::types::Principal;

// =============================================================================
// Auth State
// =============================================================================

/// Everything the auth routes and middleware need. Cheap to clone.
#[derive(Clone)]
pub struct AuthState {
    pub mode: AuthMode,
    pub service: Arc<AuthService>,
    pub sessions: Arc<SessionRegistry>,
    /// Present only in oidc mode.
    pub oidc: Option<Arc<OidcProvider>>,
    /// Public base URL, used for the discovery document outside oidc mode.
    pub base_url: String,
    session_cookie: String,
    session_ttl: Duration,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        service: Arc<AuthService>,
        sessions: Arc<SessionRegistry>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            mode: config.mode,
            service,
            sessions,
            oidc: None,
            base_url: base_url.into(),
            session_cookie: config.session_cookie.clone(),
            session_ttl: config.session_ttl,
        }
    }

    #[must_use]
    pub fn with_oidc(mut self, provider: Arc<OidcProvider>) -> Self {
        self.oidc = Some(provider);
        self
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Resolves the principal of a request under the configured mode.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` when no credential yields a
    /// principal.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        match self.mode {
            AuthMode::Jwt | AuthMode::Oidc => self.authenticate_bearer(headers),
            AuthMode::Session => self.authenticate_session(headers),
            AuthMode::Both => {
                // Each credential is tried on its own; a bad bearer token
                // does not prevent the session check.
                if bearer_token(headers).is_some()
                    && let Ok(principal) = self.authenticate_bearer(headers)
                {
                    return Ok(principal);
                }
                if self.session_id(headers).is_some()
                    && let Ok(principal) = self.authenticate_session(headers)
                {
                    return Ok(principal);
                }
                Err(AuthError::unauthorized("Authentication required"))
            }
        }
    }

    fn authenticate_bearer(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Authorization header required"))?;
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AuthError::unauthorized("Invalid authorization format"))?;
        if token.is_empty() {
            return Err(AuthError::unauthorized("Token required"));
        }

        self.service
            .validate_token(token)
            .map_err(|e| AuthError::unauthorized(e.to_string()))
    }

    fn authenticate_session(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let id = self
            .session_id(headers)
            .ok_or_else(|| AuthError::unauthorized("Session required"))?;
        let session = self
            .sessions
            .get(&id)
            .ok_or_else(|| AuthError::unauthorized("Invalid session"))?;
        Ok(Principal::from_session(session.user_id))
    }

    /// Reads the session id cookie, if any.
    #[must_use]
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(&self.session_cookie)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Builds the `Set-Cookie` for a new session.
    #[must_use]
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        Cookie::build((self.session_cookie.clone(), session.id.clone()))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(session.expires_at - session.created_at)
            .build()
    }

    /// Builds the cookie that clears the session cookie.
    #[must_use]
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.session_cookie.clone(), ""))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .build()
    }
}

/// Extracts a non-empty bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

// =============================================================================
// Middleware
// =============================================================================

/// Rejects unauthenticated requests with 401 and stores the [`Principal`]
/// of authenticated ones in the request extensions.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match state.authenticate(req.headers()) {
        Ok(principal) => {
            tracing::debug!(
                user_id = principal.user_id,
                method = ?principal.method,
                "Request authenticated"
            );
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Authentication failed");
            e.into_response()
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The principal stored by [`require_auth`]. Rejects with 401 if the route
/// is not behind the middleware.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))
    }
}

/// The principal if the route is behind [`require_auth`], `None` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(parts.extensions.get::<Principal>().copied()))
    }
}

// =============================================================================
// Tests
// =============================================================================
