//! Token endpoint types.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Form body of `POST /auth/token`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    /// Present for `client_secret_post`.
    pub client_id: Option<String>,
    /// Present for `client_secret_post`.
    pub client_secret: Option<String>,
}

/// Successful token response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Space-separated granted scopes.
    pub scope: String,

    /// Present only when `openid` was granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    pub const ALL: [Self; 2] = [Self::ClientSecretPost, Self::ClientSecretBasic];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

/// Client id and secret as presented to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub method: TokenEndpointAuthMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    /// Picks the client credentials, preferring the Basic header over the
    /// body. Returns `None` if neither carries an id.
    #[must_use]
    pub fn resolve(request: &TokenRequest, authorization: Option<&str>) -> Option<Self> {
        if let Some((client_id, client_secret)) = authorization.and_then(parse_basic_auth) {
            return Some(Self {
                client_id,
                client_secret,
                method: TokenEndpointAuthMethod::ClientSecretBasic,
            });
        }

        let client_id = request.client_id.clone().filter(|id| !id.is_empty())?;
        Some(Self {
            client_id,
            client_secret: request.client_secret.clone().unwrap_or_default(),
            method: TokenEndpointAuthMethod::ClientSecretPost,
        })
    }
}

/// Parses an HTTP Basic `Authorization` header value.
///
/// Both halves are form-urlencoded before base64 encoding (RFC 6749
/// section 2.3.1) and are decoded here.
///
/// Returns `Some((client_id, client_secret))` if valid, `None` otherwise.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;
    Some((form_decode(client_id)?, form_decode(client_secret)?))
}

fn form_decode(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|v| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_auth() {
        // base64("demo-client:se:cret")
        let header = format!("Basic {}", STANDARD.encode("demo-client:se:cret"));
        let (id, secret) = parse_basic_auth(&header).unwrap();
        assert_eq!(id, "demo-client");
        assert_eq!(secret, "se:cret");

        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic !!!").is_none());
        assert!(parse_basic_auth(&format!("Basic {}", STANDARD.encode("nocolon"))).is_none());
    }

    #[test]
    fn test_parse_basic_auth_form_decodes_both_parts() {
        let header = format!(
            "Basic {}",
            STANDARD.encode("my%20client:p%40ss%3Aword+x")
        );
        let (id, secret) = parse_basic_auth(&header).unwrap();
        assert_eq!(id, "my client");
        assert_eq!(secret, "p@ss:word x");

        // Invalid UTF-8 after percent decoding
        let header = format!("Basic {}", STANDARD.encode("client:%FF"));
        assert!(parse_basic_auth(&header).is_none());
    }

    #[test]
    fn test_resolve_prefers_basic() {
        let request = TokenRequest {
            client_id: Some("body-client".to_string()),
            client_secret: Some("body-secret".to_string()),
            ..Default::default()
        };
        let header = format!("Basic {}", STANDARD.encode("basic-client:basic-secret"));

        let creds = ClientCredentials::resolve(&request, Some(&header)).unwrap();
        assert_eq!(creds.client_id, "basic-client");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretBasic);

        let creds = ClientCredentials::resolve(&request, None).unwrap();
        assert_eq!(creds.client_id, "body-client");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretPost);

        assert!(ClientCredentials::resolve(&TokenRequest::default(), None).is_none());
    }

    #[test]
    fn test_token_response_omits_missing_id_token() {
        let response = TokenResponse {
            access_token: "a".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            scope: "profile".to_string(),
            id_token: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("id_token").is_none());
        assert_eq!(json["expires_in"], 3600);
    }
}
