//! Identity attached to authenticated requests.

use serde::Serialize;

/// How a principal was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Bearer,
    Session,
}

/// The resolved identity of a request, inserted into request extensions by
/// [`require_auth`](super::auth::require_auth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub method: AuthMethod,
}

impl Principal {
    /// A principal authenticated by bearer token.
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            method: AuthMethod::Bearer,
        }
    }

    /// A principal authenticated by session cookie.
    #[must_use]
    pub fn from_session(user_id: i64) -> Self {
        Self {
            user_id,
            method: AuthMethod::Session,
        }
    }
}
