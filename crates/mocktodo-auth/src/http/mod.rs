//! Axum handlers for the `/auth/*` and `/.well-known/*` routes.
//!
//! All handlers take [`AuthState`] as router state.
//!
//! # Available Handlers
//!
//! - [`account`] - login, register, logout and `/auth/me`
//! - [`jwks`] - JSON Web Key Set
//! - [`discovery`] - OpenID Connect discovery document
//! - [`authorize`], [`token`], [`userinfo`] - the embedded OIDC provider

pub mod account;
pub mod authorize;
pub mod discovery;
pub mod jwks;
mod login_page;
pub mod token;
pub mod userinfo;

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::oidc::provider::OidcProvider;

pub use account::{login_handler, logout_handler, me_handler, register_handler};
pub use authorize::{authorize_get, authorize_post};
pub use discovery::discovery_handler;
pub use jwks::jwks_handler;
pub use token::token_handler;
pub use userinfo::userinfo_handler;

fn oidc_provider(state: &AuthState) -> Result<&Arc<OidcProvider>, AuthError> {
    state
        .oidc
        .as_ref()
        .ok_or_else(|| AuthError::unsupported_mode("OIDC endpoints require auth mode \"oidc\""))
}

/// Unwraps a JSON body, turning extractor rejections into `invalid_request`.
///
/// # Errors
///
/// Returns `AuthError::InvalidRequest` describing the rejection.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AuthError::invalid_request(rejection.body_text()))
}
