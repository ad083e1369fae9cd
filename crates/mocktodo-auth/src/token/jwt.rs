//! JWT token generation and validation.
//!
//! Two mutually exclusive key modes are supported, fixed at startup:
//!
//! - **HS256**: HMAC with a shared secret
//! - **RS256**: RSA key pair generated when the process starts, with the
//!   public half published as a JWKS
//!
//! Validation only accepts the algorithm of the running mode, so a token
//! whose header names another algorithm (for example HS256 signed with the
//! RSA public key) is rejected before any signature check.
//!
//! ## Example
//!
//! ```ignore
//! use mocktodo_auth::token::jwt::{JwtService, SigningKeyPair, UserTokenClaims};
//!
//! let jwt_service = JwtService::new(SigningKeyPair::generate_rsa()?);
//!
//! let token = jwt_service.encode(&UserTokenClaims::new(1, "alice", lifetime))?;
//! let data = jwt_service.decode::<SubjectClaims>(&token)?;
//! assert_eq!(data.claims.user_id()?, 1);
//! ```

use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::KeyMode;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token, including algorithm mismatches.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// The operation needs a key mode other than the running one.
    #[error("Unsupported in {mode} mode: {message}")]
    UnsupportedMode {
        /// Algorithm of the running key mode.
        mode: SigningAlgorithm,
        /// What was attempted.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::decoding_error(err.to_string()),
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256 (shared secret).
    HS256,
    /// RSA with SHA-256.
    RS256,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::RS256 => Algorithm::RS256,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::RS256 => "RS256",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn lifetime_secs(lifetime: Duration) -> i64 {
    i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX)
}

/// Claims of the token returned by login and register.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTokenClaims {
    /// Subject (user id, decimal string).
    pub sub: String,

    /// Display name (username).
    pub name: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl UserTokenClaims {
    /// Creates claims for `user_id` that expire after `lifetime`.
    #[must_use]
    pub fn new(user_id: i64, name: impl Into<String>, lifetime: Duration) -> Self {
        let iat = now_unix();
        Self {
            sub: user_id.to_string(),
            name: name.into(),
            iat,
            exp: iat.saturating_add(lifetime_secs(lifetime)),
        }
    }
}

/// OIDC access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (configured OIDC issuer).
    pub iss: String,

    /// Subject (user id, decimal string).
    pub sub: String,

    /// Audience (client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Space-separated granted scopes.
    pub scope: String,
}

impl AccessTokenClaims {
    /// Creates a new builder for access token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> AccessTokenClaimsBuilder {
        AccessTokenClaimsBuilder::new(issuer, subject, client_id)
    }
}

/// Builder for `AccessTokenClaims`.
pub struct AccessTokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: String,
    exp: i64,
    iat: i64,
    scope: String,
}

impl AccessTokenClaimsBuilder {
    fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        let now = now_unix();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: client_id.into(),
            exp: now + 3600, // Default 1 hour
            iat: now,
            scope: String::new(),
        }
    }

    /// Sets the expiration time in seconds from now.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Sets the scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Builds the access token claims.
    #[must_use]
    pub fn build(self) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud: self.aud,
            exp: self.exp,
            iat: self.iat,
            scope: self.scope,
        }
    }
}

/// ID token claims for OpenID Connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (user id).
    pub sub: String,

    /// Audience (client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Display name, only with the `profile` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Username, only with the `profile` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
}

/// The claims every token minted here carries, used for validation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubjectClaims {
    pub sub: String,
    pub exp: i64,
    /// Present on OIDC access tokens only.
    #[serde(default)]
    pub scope: Option<String>,
}

impl SubjectClaims {
    /// Parses the subject as a user id.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidClaims` if `sub` is not an integer.
    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub
            .parse()
            .map_err(|_| JwtError::invalid_claims(format!("subject '{}' is not a user id", self.sub)))
    }
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key (RSA public key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// Key material for JWT operations.
pub struct SigningKeyPair {
    /// Key ID, set in token headers. `None` for shared secrets.
    pub kid: Option<String>,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (secret or private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (secret or public key) for verification.
    decoding_key: DecodingKey,

    /// Public key components for JWKS export. `None` for shared secrets.
    public_key_data: Option<RsaPublicKeyData>,
}

struct RsaPublicKeyData {
    n: Vec<u8>,
    e: Vec<u8>,
}

impl SigningKeyPair {
    /// Creates an HS256 key from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty.
    pub fn hmac(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::invalid_key("HMAC secret cannot be empty"));
        }

        Ok(Self {
            kid: None,
            algorithm: SigningAlgorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            public_key_data: None,
        })
    }

    /// Generates a new 2048-bit RS256 key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate_rsa() -> Result<Self, JwtError> {
        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            kid: Some(uuid::Uuid::new_v4().to_string()),
            algorithm: SigningAlgorithm::RS256,
            encoding_key,
            decoding_key,
            public_key_data: Some(RsaPublicKeyData { n, e }),
        })
    }

    /// Builds the key for a validated key mode.
    ///
    /// # Errors
    ///
    /// See [`SigningKeyPair::hmac`] and [`SigningKeyPair::generate_rsa`].
    pub fn from_key_mode(mode: &KeyMode) -> Result<Self, JwtError> {
        match mode {
            KeyMode::Secret(secret) => Self::hmac(secret.as_bytes()),
            KeyMode::Rsa => Self::generate_rsa(),
        }
    }

    /// Exports the public key as a JWK. `None` for shared secrets.
    #[must_use]
    pub fn to_jwk(&self) -> Option<Jwk> {
        let RsaPublicKeyData { n, e } = self.public_key_data.as_ref()?;
        Some(Jwk {
            kty: "RSA".to_string(),
            kid: self.kid.clone().unwrap_or_default(),
            use_: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            n: URL_SAFE_NO_PAD.encode(n),
            e: URL_SAFE_NO_PAD.encode(e),
        })
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding JWT tokens.
///
/// This service is thread-safe (`Send + Sync`) and can be shared across
/// async tasks.
pub struct JwtService {
    signing_key: SigningKeyPair,
}

impl JwtService {
    /// Creates a new JWT service.
    #[must_use]
    pub fn new(signing_key: SigningKeyPair) -> Self {
        Self { signing_key }
    }

    /// Encodes claims into a JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        header.kid = self.signing_key.kid.clone();

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string.
    ///
    /// Only the running algorithm is accepted. `exp` is required and
    /// checked; audience and issuer are left to the caller.
    ///
    /// # Errors
    /// Returns an error if decoding or validation fails.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode(token, &self.signing_key.decoding_key, &validation).map_err(JwtError::from)
    }

    /// Returns the signing algorithm of the running key mode.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.signing_key.algorithm
    }

    /// Returns the JWKS containing the public key.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::UnsupportedMode` for shared-secret keys, which
    /// have nothing publishable.
    pub fn jwks(&self) -> Result<Jwks, JwtError> {
        let jwk = self
            .signing_key
            .to_jwk()
            .ok_or_else(|| JwtError::UnsupportedMode {
                mode: self.signing_key.algorithm,
                message: "JWKS is only available in RSA mode".to_string(),
            })?;
        Ok(Jwks { keys: vec![jwk] })
    }
}

// ============================================================================
// Tests
// ============================================================================
