//! Token signing and validation.
//!
//! This module provides:
//!
//! - HS256 and RS256 key material
//! - Claims for login tokens and OIDC access and ID tokens
//! - JWKS export of the RSA public key

pub mod jwt;

pub use jwt::{
    AccessTokenClaims, AccessTokenClaimsBuilder, IdTokenClaims, Jwk, Jwks, JwtError, JwtService,
    SigningAlgorithm, SigningKeyPair, SubjectClaims, UserTokenClaims,
};
