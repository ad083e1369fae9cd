//! OIDC client registration, loaded once at startup.
//!
//! # Example (JSON)
//!
//! ```json
//! {
//!   "client_id": "demo-client",
//!   "client_secret": "demo-secret",
//!   "redirect_uris": ["http://localhost:3000/callback"],
//!   "issuer": "http://localhost:8080",
//!   "scopes": ["openid", "profile"]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string()]
}

/// The single client the embedded provider serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OidcConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Exact-match allow-list of redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    #[serde(default)]
    pub issuer: String,

    /// Scopes a client may request. Defaults to `openid profile`.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl OidcConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if the file cannot be read or parsed, and
    /// `ConfigError::Missing` if a required field is absent or empty.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_json_str(&raw).map_err(|e| match e {
            ConfigError::Load { message, .. } => ConfigError::Load {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// See [`OidcConfig::from_file`].
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;

        if config.scopes.is_empty() {
            config.scopes = default_scopes();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("client_id", self.client_id.is_empty()),
            ("client_secret", self.client_secret.is_empty()),
            ("redirect_uris", self.redirect_uris.is_empty()),
            ("issuer", self.issuer.is_empty()),
        ];
        match required.iter().find(|(_, missing)| *missing) {
            Some((field, _)) => Err(ConfigError::Missing(format!("{field} in OIDC config"))),
            None => Ok(()),
        }
    }

    /// Returns `true` if `uri` is registered, compared exactly.
    #[must_use]
    pub fn allows_redirect(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Returns `true` if `scope` may be requested.
    #[must_use]
    pub fn supports_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Builds an absolute URL under the issuer.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.issuer.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "client_id": "demo-client",
        "client_secret": "demo-secret",
        "redirect_uris": ["http://localhost:3000/callback"],
        "issuer": "http://localhost:8080/",
        "scopes": ["openid", "profile", "email"]
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = OidcConfig::from_json_str(FULL).unwrap();
        assert_eq!(config.client_id, "demo-client");
        assert!(config.supports_scope("email"));
        assert!(config.allows_redirect("http://localhost:3000/callback"));
        assert!(!config.allows_redirect("http://localhost:3000/callback/"));
        assert_eq!(
            config.endpoint("/auth/token"),
            "http://localhost:8080/auth/token"
        );
    }

    #[test]
    fn test_missing_scopes_default() {
        let config = OidcConfig::from_json_str(
            r#"{"client_id":"c","client_secret":"s","redirect_uris":["http://x/cb"],"issuer":"http://x"}"#,
        )
        .unwrap();
        assert_eq!(config.scopes, vec!["openid", "profile"]);

        let config = OidcConfig::from_json_str(
            r#"{"client_id":"c","client_secret":"s","redirect_uris":["http://x/cb"],"issuer":"http://x","scopes":[]}"#,
        )
        .unwrap();
        assert_eq!(config.scopes, vec!["openid", "profile"]);
    }

    #[test]
    fn test_required_fields() {
        let err = OidcConfig::from_json_str(
            r#"{"client_id":"","client_secret":"s","redirect_uris":["http://x/cb"],"issuer":"http://x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("client_id"));

        let err = OidcConfig::from_json_str(
            r#"{"client_id":"c","client_secret":"s","redirect_uris":[],"issuer":"http://x"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("redirect_uris"));

        let err = OidcConfig::from_json_str(
            r#"{"client_id":"c","client_secret":"s","redirect_uris":["http://x/cb"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_invalid_json() {
        let err = OidcConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_from_missing_file() {
        let err = OidcConfig::from_file(Path::new("/nonexistent/oidc.json")).unwrap_err();
        match err {
            ConfigError::Load { path, .. } => assert!(path.contains("oidc.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
