//! OpenID Connect discovery metadata.

use serde::{Deserialize, Serialize};

use crate::oidc::config::OidcConfig;
use crate::oidc::token::TokenEndpointAuthMethod;
use crate::token::jwt::SigningAlgorithm;

/// Document served at `/.well-known/openid_configuration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub claims_supported: Vec<String>,
}

impl DiscoveryDocument {
    /// Metadata of the embedded provider. Depends only on the configuration
    /// and the running key mode.
    #[must_use]
    pub fn for_provider(config: &OidcConfig, algorithm: SigningAlgorithm) -> Self {
        let mut doc = Self::with_base(config.endpoint(""), algorithm);
        doc.userinfo_endpoint = config.endpoint("/auth/userinfo");
        doc.scopes_supported = Some(config.scopes.clone());
        doc
    }

    /// Metadata for the non-OIDC modes, where user info is served by
    /// `/auth/me`.
    #[must_use]
    pub fn for_base_url(base_url: &str, algorithm: SigningAlgorithm) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        let mut doc = Self::with_base(base.clone(), algorithm);
        doc.userinfo_endpoint = format!("{base}/auth/me");
        doc
    }

    fn with_base(issuer: String, algorithm: SigningAlgorithm) -> Self {
        Self {
            authorization_endpoint: format!("{issuer}/auth/authorize"),
            token_endpoint: format!("{issuer}/auth/token"),
            userinfo_endpoint: String::new(),
            jwks_uri: format!("{issuer}/.well-known/jwks.json"),
            issuer,
            scopes_supported: None,
            response_types_supported: vec!["code".to_string()],
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec![algorithm.as_str().to_string()],
            token_endpoint_auth_methods_supported: TokenEndpointAuthMethod::ALL
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
            claims_supported: ["sub", "name", "preferred_username"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}
