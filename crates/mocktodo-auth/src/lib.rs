//! # mocktodo-auth
//!
//! Authentication for the mocktodo server.
//!
//! This crate provides:
//! - Password hashing (argon2id)
//! - JWT issuance and validation with HMAC or RSA keys, plus JWKS
//! - Server-side sessions with lazy expiry and a background sweeper
//! - An embedded OpenID Connect provider (authorization-code flow)
//! - Mode-aware authentication middleware and axum handlers
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration and mode enums
//! - [`token`] - JWT engine and claim types
//! - [`session`] - Session registry
//! - [`oidc`] - Embedded OIDC provider
//! - [`middleware`] - Request authentication and error responses
//! - [`http`] - Axum handlers for `/auth/*` and `/.well-known/*`

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oidc;
pub mod password;
pub mod service;
pub mod session;
pub mod sweeper;
pub mod token;

pub use config::{AuthConfig, AuthMode, ConfigError, KeyMode, KeyModeKind};
pub use error::{AuthError, ErrorCategory};
pub use middleware::{
    AuthMethod, AuthState, CurrentUser, ErrorBody, MaybePrincipal, Principal, require_auth,
};
pub use oidc::{AuthorizationCodeStore, OidcConfig, OidcProvider};
pub use service::AuthService;
pub use session::{Session, SessionRegistry};
pub use sweeper::spawn_sweeper;
pub use token::{JwtError, JwtService, SigningAlgorithm, SigningKeyPair};

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
