//! Authentication configuration.
//!
//! Mode strings from files, environment and flags are parsed here, once, into
//! [`AuthMode`] and [`KeyMode`]. Nothing downstream handles raw mode strings.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! required = true
//! mode = "both"
//! key_mode = "rsa"
//! session_ttl = "12h"
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Secret used in HMAC mode when none is configured.
pub const DEFAULT_SECRET: &str = "test-secret-key";

/// How requests to protected routes are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `Authorization: Bearer <jwt>` only.
    #[default]
    Jwt,
    /// `session_id` cookie only.
    Session,
    /// Bearer token first, then session cookie.
    Both,
    /// Embedded OIDC provider; protected routes take bearer access tokens.
    Oidc,
}

impl AuthMode {
    /// Returns the configuration name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jwt => "jwt",
            Self::Session => "session",
            Self::Both => "both",
            Self::Oidc => "oidc",
        }
    }

    /// Returns `true` if login issues a bearer token in this mode.
    #[must_use]
    pub fn issues_tokens(&self) -> bool {
        matches!(self, Self::Jwt | Self::Both | Self::Oidc)
    }

    /// Returns `true` if login creates a server-side session in this mode.
    #[must_use]
    pub fn uses_sessions(&self) -> bool {
        matches!(self, Self::Session | Self::Both)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jwt" => Ok(Self::Jwt),
            "session" => Ok(Self::Session),
            "both" => Ok(Self::Both),
            "oidc" => Ok(Self::Oidc),
            other => Err(ConfigError::InvalidValue(format!(
                "auth mode '{other}' (must be jwt, session, both or oidc)"
            ))),
        }
    }
}

/// Which kind of key material signs tokens, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyModeKind {
    #[default]
    Secret,
    Rsa,
}

impl FromStr for KeyModeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secret" => Ok(Self::Secret),
            "rsa" => Ok(Self::Rsa),
            other => Err(ConfigError::InvalidValue(format!(
                "key mode '{other}' (must be secret or rsa)"
            ))),
        }
    }
}

/// Validated key mode. Fixed for the life of the process.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMode {
    /// HS256 with a shared secret.
    Secret(String),
    /// RS256 with a key pair generated at startup.
    Rsa,
}

impl fmt::Debug for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("Secret(..)"),
            Self::Rsa => f.write_str("Rsa"),
        }
    }
}

/// Root authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether task routes sit behind the auth middleware.
    pub required: bool,

    /// Request authentication mode.
    pub mode: AuthMode,

    /// Signing key kind.
    pub key_mode: KeyModeKind,

    /// HMAC secret, used when `key_mode = "secret"`.
    pub secret: String,

    /// Lifetime of tokens returned by login and register.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Lifetime of server-side sessions.
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,

    /// Name of the session cookie.
    pub session_cookie: String,

    /// Interval of the background sweep over expired sessions and codes.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Path of the OIDC client configuration (JSON). Required in oidc mode.
    pub oidc_config: Option<PathBuf>,

    /// Lifetime of OIDC authorization codes.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Lifetime of OIDC access and ID tokens.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: true,
            mode: AuthMode::Jwt,
            key_mode: KeyModeKind::Secret,
            secret: DEFAULT_SECRET.to_string(),
            token_lifetime: Duration::from_secs(24 * 3600),
            session_ttl: Duration::from_secs(24 * 3600),
            session_cookie: "session_id".to_string(),
            sweep_interval: Duration::from_secs(60),
            oidc_config: None,
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load {path}: {message}")]
    Load {
        /// Path of the file.
        path: String,
        /// Description of the failure.
        message: String,
    },
}

impl AuthConfig {
    /// Builds the validated key mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if HMAC mode has an empty secret.
    pub fn key_mode(&self) -> Result<KeyMode, ConfigError> {
        match self.key_mode {
            KeyModeKind::Secret if self.secret.is_empty() => {
                Err(ConfigError::Missing("auth.secret".to_string()))
            }
            KeyModeKind::Secret => Ok(KeyMode::Secret(self.secret.clone())),
            KeyModeKind::Rsa => Ok(KeyMode::Rsa),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - HMAC mode has an empty secret
    /// - oidc mode has no `oidc_config` path
    /// - any lifetime or the sweep interval is zero
    /// - the session cookie name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.key_mode()?;

        if self.mode == AuthMode::Oidc && self.oidc_config.is_none() {
            return Err(ConfigError::Missing(
                "auth.oidc_config is required when auth.mode = \"oidc\"".to_string(),
            ));
        }

        for (name, value) in [
            ("token_lifetime", self.token_lifetime),
            ("session_ttl", self.session_ttl),
            ("sweep_interval", self.sweep_interval),
            ("authorization_code_lifetime", self.authorization_code_lifetime),
            ("access_token_lifetime", self.access_token_lifetime),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.{name} must be > 0"
                )));
            }
        }

        if self.session_cookie.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "auth.session_cookie cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert!(config.required);
        assert_eq!(config.mode, AuthMode::Jwt);
        assert_eq!(config.key_mode, KeyModeKind::Secret);
        assert_eq!(config.secret, "test-secret-key");
        assert_eq!(config.session_cookie, "session_id");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_mode_collapses_to_tagged_variant() {
        let config = AuthConfig::default();
        assert_eq!(
            config.key_mode().unwrap(),
            KeyMode::Secret("test-secret-key".to_string())
        );

        let config = AuthConfig {
            key_mode: KeyModeKind::Rsa,
            secret: String::new(),
            ..AuthConfig::default()
        };
        assert_eq!(config.key_mode().unwrap(), KeyMode::Rsa);
    }

    #[test]
    fn test_empty_secret_fails_validation() {
        let config = AuthConfig {
            secret: String::new(),
            ..AuthConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("auth.secret"));
    }

    #[test]
    fn test_oidc_mode_requires_config_path() {
        let mut config = AuthConfig {
            mode: AuthMode::Oidc,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());

        config.oidc_config = Some(PathBuf::from("oidc.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_lifetime_fails_validation() {
        let config = AuthConfig {
            session_ttl: Duration::ZERO,
            ..AuthConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session_ttl"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("both".parse::<AuthMode>().unwrap(), AuthMode::Both);
        assert_eq!("oidc".parse::<AuthMode>().unwrap(), AuthMode::Oidc);
        assert!("cookie".parse::<AuthMode>().is_err());
        assert_eq!("rsa".parse::<KeyModeKind>().unwrap(), KeyModeKind::Rsa);
        assert!("ecdsa".parse::<KeyModeKind>().is_err());
    }

    #[test]
    fn test_mode_capabilities() {
        assert!(AuthMode::Jwt.issues_tokens());
        assert!(!AuthMode::Jwt.uses_sessions());
        assert!(!AuthMode::Session.issues_tokens());
        assert!(AuthMode::Session.uses_sessions());
        assert!(AuthMode::Both.issues_tokens() && AuthMode::Both.uses_sessions());
    }

    #[test]
    fn test_key_mode_debug_hides_secret() {
        let rendered = format!("{:?}", KeyMode::Secret("hunter2".to_string()));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let toml_like = serde_json::json!({
            "mode": "session",
            "key_mode": "rsa",
            "session_ttl": "30m"
        });
        let parsed: AuthConfig = serde_json::from_value(toml_like).unwrap();
        assert_eq!(parsed.mode, AuthMode::Session);
        assert_eq!(parsed.key_mode, KeyModeKind::Rsa);
        assert_eq!(parsed.session_ttl, Duration::from_secs(1800));
        assert!(parsed.required);

        let json = serde_json::to_string(&parsed).unwrap();
        let back: AuthConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode, parsed.mode);
    }
}
