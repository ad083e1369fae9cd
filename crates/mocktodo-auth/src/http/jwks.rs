//! JWKS endpoint handler.
//!
//! Served at both `/auth/jwks` and `/.well-known/jwks.json`.
//!
//! # References
//!
//! - [RFC 7517 - JSON Web Key](https://tools.ietf.org/html/rfc7517)

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::AuthError;
use crate::middleware::AuthState;

/// Handler for the JWKS routes.
///
/// Returns the RSA public key with a one hour `Cache-Control`. In HMAC mode
/// there is no public key and the response is 400 `unsupported_mode`.
///
/// # Example Response
///
/// ```json
/// {
///   "keys": [
///     {
///       "kty": "RSA",
///       "kid": "0b6c6f8e-...",
///       "use": "sig",
///       "alg": "RS256",
///       "n": "base64url-encoded-modulus",
///       "e": "AQAB"
///     }
///   ]
/// }
/// ```
pub async fn jwks_handler(State(state): State<AuthState>) -> Result<impl IntoResponse, AuthError> {
    let jwks = state
        .service
        .jwt()
        .jwks()
        .map_err(|e| AuthError::unsupported_mode(e.to_string()))?;

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(jwks),
    ))
}
