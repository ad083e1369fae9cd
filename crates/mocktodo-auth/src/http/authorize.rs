//! Authorization endpoint handlers.
//!
//! - `GET /auth/authorize` validates the request and shows the login prompt
//! - `POST /auth/authorize` takes the prompt submission and redirects back
//!   to the client with a code

use axum::Form;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::oidc::authorize::{AuthorizationRequest, AuthorizeForm};
use crate::oidc::provider::AuthorizeOutcome;

use super::login_page::render_login_form;
use super::oidc_provider;

/// Handler for `GET /auth/authorize`.
pub async fn authorize_get(
    State(state): State<AuthState>,
    Query(request): Query<AuthorizationRequest>,
) -> Result<Response, AuthError> {
    let provider = oidc_provider(&state)?;
    let outcome = provider.authorize(request, None).await?;
    Ok(respond(outcome))
}

/// Handler for `POST /auth/authorize`.
///
/// Parameters missing from the form body are taken from the query string.
pub async fn authorize_post(
    State(state): State<AuthState>,
    Query(query): Query<AuthorizationRequest>,
    Form(form): Form<AuthorizeForm>,
) -> Result<Response, AuthError> {
    let provider = oidc_provider(&state)?;
    let (request, credentials) = form.into_parts();
    let outcome = provider.authorize(request.or(query), credentials).await?;
    Ok(respond(outcome))
}

fn respond(outcome: AuthorizeOutcome) -> Response {
    match outcome {
        AuthorizeOutcome::Redirect(url) => Redirect::to(&url).into_response(),
        AuthorizeOutcome::LoginPrompt(prompt) => Html(render_login_form(&prompt)).into_response(),
    }
}
