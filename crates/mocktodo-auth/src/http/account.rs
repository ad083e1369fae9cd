//! Login, registration, logout and profile handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use mocktodo_storage::UserProfile;

use crate::error::AuthError;
use crate::middleware::{AuthState, CurrentUser};

use super::json_body;

/// Body of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Response of login and registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Absent from session-only logins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Handler for `POST /auth/login`.
///
/// Returns a token in jwt and both modes and sets the session cookie in
/// session and both modes.
pub async fn login_handler(
    State(state): State<AuthState>,
    jar: CookieJar,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let request = json_body(body)?;
    let user = state
        .service
        .authenticate(&request.username, &request.password)
        .await?;

    let token = if state.mode.issues_tokens() {
        Some(state.service.issue_token(&user)?)
    } else {
        None
    };

    let jar = if state.mode.uses_sessions() {
        let session = state.sessions.create(&user, state.session_ttl());
        jar.add(state.session_cookie(&session))
    } else {
        jar
    };

    tracing::info!(user_id = user.id, mode = %state.mode, "User logged in");
    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: user.profile(),
        }),
    ))
}

/// Handler for `POST /auth/register`. Always returns a token; never
/// creates a session.
pub async fn register_handler(
    State(state): State<AuthState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let request = json_body(body)?;
    let (user, token) = state
        .service
        .register(&request.username, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: Some(token),
            user: user.profile(),
        }),
    ))
}

/// Handler for `POST /auth/logout`. Deletes the session named by the cookie,
/// if any, and clears the cookie.
pub async fn logout_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(session_id) = state.session_id(&headers)
        && state.sessions.delete(&session_id)
    {
        tracing::info!("Session ended");
    }

    (
        jar.add(state.removal_cookie()),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Handler for `GET /auth/me`.
pub async fn me_handler(
    State(state): State<AuthState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<UserProfile>, AuthError> {
    let user = state
        .service
        .users()
        .get(principal.user_id)
        .await?
        .ok_or_else(|| AuthError::not_found("User not found"))?;
    Ok(Json(user.profile()))
}
