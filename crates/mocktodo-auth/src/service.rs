//! Credential checks and token issuance on top of the user store.

use std::sync::Arc;
use std::time::Duration;

use mocktodo_storage::{DynUserStore, NewUser, StorageError, User};

use crate::error::AuthError;
use crate::middleware::types::Principal;
use crate::password::{hash_password, verify_password};
use crate::token::jwt::{JwtService, SubjectClaims, UserTokenClaims};

/// Login, registration and bearer token validation.
pub struct AuthService {
    users: DynUserStore,
    jwt: Arc<JwtService>,
    token_lifetime: Duration,
}

impl AuthService {
    /// Creates a new service.
    #[must_use]
    pub fn new(users: DynUserStore, jwt: Arc<JwtService>, token_lifetime: Duration) -> Self {
        Self {
            users,
            jwt,
            token_lifetime,
        }
    }

    /// The shared JWT engine.
    #[must_use]
    pub fn jwt(&self) -> &Arc<JwtService> {
        &self.jwt
    }

    /// The user store.
    #[must_use]
    pub fn users(&self) -> &DynUserStore {
        &self.users
    }

    /// Issues a login token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let claims = UserTokenClaims::new(user.id, &user.username, self.token_lifetime);
        self.jwt
            .encode(&claims)
            .map_err(|e| AuthError::internal(e.to_string()))
    }

    /// Validates a bearer token and resolves its principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a wrong algorithm, bad
    /// signature, expiry or a non-numeric subject.
    pub fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self
            .jwt
            .decode::<SubjectClaims>(token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                AuthError::invalid_token(e.to_string())
            })?
            .claims;

        let user_id = claims
            .user_id()
            .map_err(|e| AuthError::invalid_token(e.to_string()))?;
        Ok(Principal::new(user_id))
    }

    /// Checks a username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user and for
    /// a wrong password alike.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.users.get_by_username(username).await? else {
            tracing::debug!(username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let hash = user.hashed_password.clone();
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(e.to_string()))?
            .unwrap_or_else(|e| {
                tracing::warn!(user_id = user.id, error = %e, "Stored password hash is malformed");
                false
            });

        if matches {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Authenticates and issues a token.
    ///
    /// # Errors
    ///
    /// See [`AuthService::authenticate`].
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        let user = self.authenticate(username, password).await?;
        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, token))
    }

    /// Creates a user and issues a token.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidRequest` if the username or password is empty
    /// - `AuthError::UsernameTaken` if the username exists
    /// - `AuthError::Storage` if the user cannot be persisted
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::invalid_request(
                "username and password are required",
            ));
        }

        let password = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::internal(e.to_string()))?
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;

        let user = match self.users.create(NewUser::new(username, hashed)).await {
            Ok(user) => user,
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthError::username_taken(username));
            }
            Err(e) => return Err(e.into()),
        };

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok((user, token))
    }
}
