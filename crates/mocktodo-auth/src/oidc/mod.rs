//! Embedded OpenID Connect provider (authorization-code flow).
//!
//! - [`config`] - client registration loaded from JSON
//! - [`authorize`] - authorization request parsing and redirect building
//! - [`code`] - one-time authorization codes
//! - [`token`] - token endpoint request/response types
//! - [`discovery`] - `/.well-known/openid_configuration`
//! - [`provider`] - the flow itself

pub mod authorize;
pub mod code;
pub mod config;
pub mod discovery;
pub mod provider;
pub mod token;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    AuthorizeForm, LoginCredentials,
};
pub use code::{AuthorizationCode, AuthorizationCodeStore};
pub use config::OidcConfig;
pub use discovery::DiscoveryDocument;
pub use provider::{AuthorizeOutcome, LoginPrompt, OidcProvider, UserInfo};
pub use token::{
    ClientCredentials, TokenEndpointAuthMethod, TokenRequest, TokenResponse, parse_basic_auth,
};
