//! UserInfo endpoint handler.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use crate::error::AuthError;
use crate::middleware::{AuthState, bearer_token};
use crate::oidc::provider::UserInfo;

use super::oidc_provider;

/// Handler for `GET /auth/userinfo`.
///
/// Returns `sub`, plus `name` and `preferred_username` when the access
/// token carries the `profile` scope.
pub async fn userinfo_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>, AuthError> {
    let provider = oidc_provider(&state)?;
    let token =
        bearer_token(&headers).ok_or_else(|| AuthError::invalid_token("Bearer token required"))?;

    Ok(Json(provider.user_info(token).await?))
}
