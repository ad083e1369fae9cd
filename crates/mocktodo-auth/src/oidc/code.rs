//! One-time authorization codes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use time::OffsetDateTime;

use crate::error::AuthError;

const CODE_BYTES: usize = 32;

/// A code issued by the authorize step and not yet exchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub user_id: i64,
    pub redirect_uri: String,
    /// Granted scopes, in request order.
    pub scopes: Vec<String>,
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Outstanding codes. Redemption removes the entry under the same lock
/// that checked it, so concurrent exchanges of one code cannot both win.
#[derive(Debug)]
pub struct AuthorizationCodeStore {
    codes: Mutex<HashMap<String, AuthorizationCode>>,
    lifetime: Duration,
}

impl AuthorizationCodeStore {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            lifetime,
        }
    }

    /// Issues a fresh code bound to the client, user and redirect URI.
    pub fn issue(
        &self,
        client_id: &str,
        user_id: i64,
        redirect_uri: &str,
        scopes: Vec<String>,
    ) -> AuthorizationCode {
        let mut bytes = [0u8; CODE_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let code = AuthorizationCode {
            code: URL_SAFE_NO_PAD.encode(bytes),
            client_id: client_id.to_string(),
            user_id,
            redirect_uri: redirect_uri.to_string(),
            scopes,
            expires_at: OffsetDateTime::now_utc() + self.lifetime,
        };

        self.codes.lock().insert(code.code.clone(), code.clone());
        code
    }

    /// Consumes a code.
    ///
    /// An expired code is deleted. A code presented with the wrong client or
    /// redirect URI stays redeemable by its rightful holder.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidGrant` if the code is unknown, already
    /// used, expired, or bound to another client or redirect URI.
    pub fn redeem(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationCode, AuthError> {
        let now = OffsetDateTime::now_utc();
        let mut codes = self.codes.lock();

        let Entry::Occupied(entry) = codes.entry(code.to_string()) else {
            return Err(AuthError::invalid_grant("invalid authorization code"));
        };

        if entry.get().is_expired_at(now) {
            entry.remove();
            return Err(AuthError::invalid_grant("authorization code expired"));
        }
        if entry.get().client_id != client_id {
            return Err(AuthError::invalid_grant("client ID mismatch"));
        }
        if entry.get().redirect_uri != redirect_uri {
            return Err(AuthError::invalid_grant("redirect URI mismatch"));
        }

        Ok(entry.remove())
    }

    /// Removes expired codes and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut codes = self.codes.lock();
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired_at(now));
        before - codes.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const CB: &str = "http://localhost:3000/callback";

    fn store() -> AuthorizationCodeStore {
        AuthorizationCodeStore::new(Duration::from_secs(600))
    }

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_code_format() {
        let code = store().issue("c", 1, CB, scopes(&["openid"]));
        // 32 bytes, base64url without padding
        assert_eq!(code.code.len(), 43);
        assert!(!code.code.contains(['+', '/', '=']));
    }

    #[test]
    fn test_redeem_once() {
        let store = store();
        let code = store.issue("c", 7, CB, scopes(&["openid", "profile"]));

        let redeemed = store.redeem(&code.code, "c", CB).unwrap();
        assert_eq!(redeemed.user_id, 7);
        assert!(redeemed.has_scope("profile"));

        let err = store.redeem(&code.code, "c", CB).unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_redirect_mismatch_keeps_code() {
        let store = store();
        let code = store.issue("c", 1, CB, scopes(&["openid"]));

        let err = store
            .redeem(&code.code, "c", "http://evil.example/cb")
            .unwrap_err();
        assert!(err.to_string().contains("redirect URI mismatch"));

        let err = store.redeem(&code.code, "other", CB).unwrap_err();
        assert!(err.to_string().contains("client ID mismatch"));

        assert!(store.redeem(&code.code, "c", CB).is_ok());
    }

    #[test]
    fn test_expired_code_rejected_and_deleted() {
        let store = AuthorizationCodeStore::new(Duration::ZERO);
        let code = store.issue("c", 1, CB, scopes(&["openid"]));

        let err = store.redeem(&code.code, "c", CB).unwrap_err();
        assert!(err.to_string().contains("expired"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_expired() {
        let expired = AuthorizationCodeStore::new(Duration::ZERO);
        expired.issue("c", 1, CB, vec![]);
        expired.issue("c", 2, CB, vec![]);
        assert_eq!(expired.sweep_expired(), 2);
        assert!(expired.is_empty());

        let live = store();
        live.issue("c", 1, CB, vec![]);
        assert_eq!(live.sweep_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_concurrent_redemption_single_winner() {
        let store = Arc::new(store());
        let code = store.issue("c", 1, CB, scopes(&["openid"])).code;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = code.clone();
                std::thread::spawn(move || store.redeem(&code, "c", CB).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
