//! OpenID Connect discovery handler.

use axum::Json;
use axum::extract::State;

use crate::middleware::AuthState;
use crate::oidc::discovery::DiscoveryDocument;

/// Handler for `GET /.well-known/openid_configuration`.
///
/// In oidc mode this is the provider's document; otherwise a document built
/// from the server's base URL that points user info at `/auth/me`.
pub async fn discovery_handler(State(state): State<AuthState>) -> Json<DiscoveryDocument> {
    let doc = match &state.oidc {
        Some(provider) => provider.discovery_document(),
        None => DiscoveryDocument::for_base_url(&state.base_url, state.service.jwt().algorithm()),
    };
    Json(doc)
}
