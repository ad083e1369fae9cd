//! Token endpoint handler.

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::oidc::token::TokenRequest;

use super::oidc_provider;

/// Handler for `POST /auth/token`.
///
/// Accepts client credentials in the body (`client_secret_post`) or in an
/// HTTP Basic header (`client_secret_basic`). Responses are never cached.
pub async fn token_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    request: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let provider = oidc_provider(&state)?;
    let Form(request) = request.map_err(|e| AuthError::invalid_request(e.body_text()))?;
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let response = provider.exchange_token(&request, authorization).await?;
    Ok((
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    ))
}
