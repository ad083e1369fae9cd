//! Embedded authorization-code provider.
//!
//! The provider serves a single client described by [`OidcConfig`]. It
//! authenticates users through [`AuthService`], keeps outstanding codes in an
//! [`AuthorizationCodeStore`] and signs tokens with the same engine as the
//! rest of the server, so its access tokens are accepted by protected routes.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::oidc::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    LoginCredentials,
};
use crate::oidc::code::{AuthorizationCode, AuthorizationCodeStore};
use crate::oidc::config::OidcConfig;
use crate::oidc::discovery::DiscoveryDocument;
use crate::oidc::token::{ClientCredentials, TokenRequest, TokenResponse};
use crate::service::AuthService;
use crate::token::jwt::{AccessTokenClaims, IdTokenClaims, SubjectClaims};

/// What the authorize endpoint should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// 302 to this URL (code or error parameters).
    Redirect(String),
    /// Render the login form.
    LoginPrompt(LoginPrompt),
}

/// Values carried through the login form as hidden fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPrompt {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub state: String,
    /// Shown above the form after a failed login.
    pub error: Option<String>,
}

/// Response of `/auth/userinfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
}

pub struct OidcProvider {
    config: OidcConfig,
    auth: Arc<AuthService>,
    codes: Arc<AuthorizationCodeStore>,
    access_token_lifetime: Duration,
}

impl OidcProvider {
    #[must_use]
    pub fn new(
        config: OidcConfig,
        auth: Arc<AuthService>,
        codes: Arc<AuthorizationCodeStore>,
        access_token_lifetime: Duration,
    ) -> Self {
        Self {
            config,
            auth,
            codes,
            access_token_lifetime,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Runs the authorize step.
    ///
    /// Validation order: required parameters, redirect URI, client id,
    /// response type, scopes. Only the first two fail directly; every later
    /// failure is redirected to the now-trusted redirect URI.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` when a required parameter is
    /// missing or the redirect URI is not registered.
    pub async fn authorize(
        &self,
        request: AuthorizationRequest,
        credentials: Option<LoginCredentials>,
    ) -> Result<AuthorizeOutcome, AuthError> {
        let state = request.state().to_string();
        let (Some(client_id), Some(redirect_uri), Some(response_type)) = (
            request.client_id.filter(|v| !v.is_empty()),
            request.redirect_uri.filter(|v| !v.is_empty()),
            request.response_type.filter(|v| !v.is_empty()),
        ) else {
            return Err(AuthError::invalid_request(
                "client_id, redirect_uri and response_type are required",
            ));
        };

        if !self.config.allows_redirect(&redirect_uri) {
            return Err(AuthError::invalid_request("Invalid redirect_uri"));
        }

        let fail = |code, description: String| {
            AuthorizationError::new(code, description, state.as_str())
                .to_redirect_url(&redirect_uri)
                .map(AuthorizeOutcome::Redirect)
                .map_err(|e| AuthError::internal(format!("invalid redirect_uri: {e}")))
        };

        if client_id != self.config.client_id {
            return fail(
                AuthorizationErrorCode::UnauthorizedClient,
                "Invalid client_id".to_string(),
            );
        }

        if response_type != "code" {
            return fail(
                AuthorizationErrorCode::UnsupportedResponseType,
                "Only authorization code flow is supported".to_string(),
            );
        }

        let scopes = parse_scopes(request.scope.as_deref());
        if let Some(unsupported) = scopes.iter().find(|s| !self.config.supports_scope(s)) {
            return fail(
                AuthorizationErrorCode::InvalidScope,
                format!("unsupported scope: {unsupported}"),
            );
        }

        let prompt = |error: Option<String>| {
            AuthorizeOutcome::LoginPrompt(LoginPrompt {
                client_id: client_id.clone(),
                redirect_uri: redirect_uri.clone(),
                response_type: response_type.clone(),
                scope: scopes.join(" "),
                state: state.clone(),
                error,
            })
        };

        let Some(credentials) = credentials else {
            return Ok(prompt(None));
        };

        let user = match self
            .auth
            .authenticate(&credentials.username, &credentials.password)
            .await
        {
            Ok(user) => user,
            Err(AuthError::InvalidCredentials) => {
                return Ok(prompt(Some("Invalid username or password".to_string())));
            }
            Err(e) => return Err(e),
        };

        let code = self
            .codes
            .issue(&client_id, user.id, &redirect_uri, scopes.clone());
        tracing::info!(user_id = user.id, client_id = %client_id, "Authorization code issued");

        AuthorizationResponse::new(code.code, state.clone())
            .to_redirect_url(&redirect_uri)
            .map(AuthorizeOutcome::Redirect)
            .map_err(|e| AuthError::internal(format!("invalid redirect_uri: {e}")))
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// `authorization` is the raw `Authorization` header, consulted for
    /// `client_secret_basic`.
    ///
    /// # Errors
    ///
    /// - `AuthError::UnsupportedGrantType` unless `grant_type=authorization_code`
    /// - `AuthError::InvalidClient` if the client credentials do not match
    /// - `AuthError::InvalidRequest` if `code` is missing
    /// - `AuthError::InvalidGrant` if the code cannot be redeemed
    pub async fn exchange_token(
        &self,
        request: &TokenRequest,
        authorization: Option<&str>,
    ) -> Result<TokenResponse, AuthError> {
        let grant_type = request.grant_type.as_deref().unwrap_or_default();
        if grant_type != "authorization_code" {
            return Err(AuthError::unsupported_grant_type(grant_type));
        }

        let client = ClientCredentials::resolve(request, authorization)
            .filter(|c| {
                c.client_id == self.config.client_id && c.client_secret == self.config.client_secret
            })
            .ok_or_else(|| AuthError::invalid_client("Invalid client credentials"))?;

        let code = request
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::invalid_request("code is required"))?;

        let grant = self.codes.redeem(
            code,
            &client.client_id,
            request.redirect_uri.as_deref().unwrap_or_default(),
        )?;

        let response = self.mint_tokens(&grant).await?;
        tracing::info!(
            user_id = grant.user_id,
            client_id = %client.client_id,
            method = client.method.as_str(),
            "Authorization code exchanged"
        );
        Ok(response)
    }

    async fn mint_tokens(&self, grant: &AuthorizationCode) -> Result<TokenResponse, AuthError> {
        let user = self
            .auth
            .users()
            .get(grant.user_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("user no longer exists"))?;

        let lifetime = i64::try_from(self.access_token_lifetime.as_secs()).unwrap_or(i64::MAX);
        let scope = grant.scopes.join(" ");
        let subject = user.id.to_string();

        let access_claims =
            AccessTokenClaims::builder(&self.config.issuer, &subject, &self.config.client_id)
                .scope(&scope)
                .expires_in_seconds(lifetime)
                .build();
        let access_token = self
            .auth
            .jwt()
            .encode(&access_claims)
            .map_err(|e| AuthError::internal(e.to_string()))?;

        let id_token = if grant.has_scope("openid") {
            let profile = grant
                .has_scope("profile")
                .then(|| user.username.clone());
            let claims = IdTokenClaims {
                iss: access_claims.iss.clone(),
                sub: subject,
                aud: access_claims.aud.clone(),
                exp: access_claims.exp,
                iat: access_claims.iat,
                name: profile.clone(),
                preferred_username: profile,
            };
            Some(
                self.auth
                    .jwt()
                    .encode(&claims)
                    .map_err(|e| AuthError::internal(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_lifetime.as_secs(),
            scope,
            id_token,
        })
    }

    /// Resolves the claims released for an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token does not validate or
    /// its user no longer exists.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let claims = self
            .auth
            .jwt()
            .decode::<SubjectClaims>(access_token)
            .map_err(|e| AuthError::invalid_token(e.to_string()))?
            .claims;
        let user_id = claims
            .user_id()
            .map_err(|e| AuthError::invalid_token(e.to_string()))?;

        let user = self
            .auth
            .users()
            .get(user_id)
            .await?
            .ok_or_else(|| AuthError::invalid_token("user not found"))?;

        let profile = parse_scopes(claims.scope.as_deref())
            .iter()
            .any(|s| s == "profile")
            .then(|| user.username.clone());

        Ok(UserInfo {
            sub: user.id.to_string(),
            name: profile.clone(),
            preferred_username: profile,
        })
    }

    #[must_use]
    pub fn discovery_document(&self) -> DiscoveryDocument {
        DiscoveryDocument::for_provider(&self.config, self.auth.jwt().algorithm())
    }

    /// Drops expired codes left behind by abandoned flows.
    pub fn sweep_expired_codes(&self) -> usize {
        self.codes.sweep_expired()
    }
}

/// Splits a scope parameter on whitespace. A missing or blank parameter is
/// an empty scope set.
fn parse_scopes(scope: Option<&str>) -> Vec<String> {
    scope
        .unwrap_or_default()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}
