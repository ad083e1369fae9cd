//! HTTP middleware for authentication.
//!
//! This module provides:
//!
//! - [`require_auth`], which resolves bearer tokens and session cookies
//!   according to the configured [`AuthMode`](crate::config::AuthMode)
//! - extractors for the resolved [`Principal`]
//! - the JSON error responses of [`AuthError`](crate::AuthError)

pub mod auth;
pub mod error;
pub mod types;

pub use auth::{AuthState, CurrentUser, MaybePrincipal, bearer_token, require_auth};
pub use error::{ErrorBody, error_response, status_code};
pub use types::{AuthMethod, Principal};
