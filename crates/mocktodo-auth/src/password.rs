//! Password hashing and verification.
//!
//! Passwords are hashed with Argon2id into PHC strings. The PHC string
//! records the algorithm, cost parameters and salt, so hashes made with other
//! parameters still verify.
//!
//! # Example
//!
//! ```
//! use mocktodo_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("correct horse").unwrap();
//! assert!(verify_password("correct horse", &hash).unwrap());
//! assert!(!verify_password("battery staple", &hash).unwrap());
//! ```

use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password with Argon2id and the default cost parameters.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    hash_password_with(password, Params::default())
}

/// Hash a password with explicit Argon2 cost parameters.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_password_with(
    password: &str,
    params: Params,
) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(true)` on a match and `Ok(false)` on a mismatch.
///
/// # Errors
///
/// Returns `Err` only if the stored hash is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("s3cret"));
    }

    #[test]
    fn test_verify_matches_only_original_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("s3cret ", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("repeat").unwrap();
        let b = hash_password("repeat").unwrap();
        assert_ne!(a, b, "salts must differ");
        assert!(verify_password("repeat", &a).unwrap());
        assert!(verify_password("repeat", &b).unwrap());
    }

    #[test]
    fn test_custom_params_still_verify() {
        let params = Params::new(8 * 1024, 1, 1, None).unwrap();
        let hash = hash_password_with("cheap", params).unwrap();
        assert!(hash.contains("m=8192,t=1,p=1"));
        assert!(verify_password("cheap", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format_errors() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
