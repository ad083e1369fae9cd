mod common;

use common::{client, register, session_cookie, start_server};
use mocktodo_auth::config::{AuthMode, KeyModeKind};
use mocktodo_auth::token::UserTokenClaims;
use mocktodo_auth::{JwtService, SigningKeyPair};
use mocktodo_server::AppConfig;
use reqwest::{StatusCode, header};
use serde_json::{Value, json};

fn config(mode: AuthMode) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.mode = mode;
    cfg
}

#[tokio::test]
async fn jwt_mode_login_and_me() {
    let server = start_server(config(AuthMode::Jwt)).await;
    let base = &server.base;
    let client = client();
    register(&client, base, "alice", "pw").await;

    // Wrong password and unknown user look the same
    for (username, password) in [("alice", "nope"), ("nobody", "pw")] {
        let resp = client
            .post(format!("{base}/auth/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_credentials");
    }

    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"username": "alice", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_none());
    let body: Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let resp = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["username"], "alice");

    let resp = client
        .get(format!("{base}/auth/me"))
        .header(header::AUTHORIZATION, "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert!(challenge.starts_with("Bearer"));

    // Duplicate registration
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&json!({"username": "alice", "password": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    server.shutdown().await;
}

#[tokio::test]
async fn session_mode_cookie_lifecycle() {
    let server = start_server(config(AuthMode::Session)).await;
    let base = &server.base;
    let client = client();
    register(&client, base, "bob", "pw").await;

    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"username": "bob", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=86400"));
    let cookie = session_cookie(&resp).unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("token").is_none());
    assert_eq!(body["user"]["username"], "bob");

    let resp = client
        .post(format!("{base}/tasks"))
        .header(header::COOKIE, &cookie)
        .json(&json!({"title": "via session"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/auth/logout"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Logged out");

    let resp = client
        .get(format!("{base}/tasks"))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.shutdown().await;
}

#[tokio::test]
async fn both_mode_falls_back_to_session_after_expired_jwt() {
    let server = start_server(config(AuthMode::Both)).await;
    let base = &server.base;
    let client = client();
    let registered = register(&client, base, "carol", "pw").await;
    let user_id = registered["user"]["id"].as_i64().unwrap();

    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"username": "carol", "password": "pw"}))
        .send()
        .await
        .unwrap();
    let cookie = session_cookie(&resp).unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["token"].is_string());

    // Signed with the configured secret, but expired an hour ago
    let jwt = JwtService::new(SigningKeyPair::hmac(b"test-secret-key").unwrap());
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let expired = jwt
        .encode(&UserTokenClaims {
            sub: user_id.to_string(),
            name: "carol".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        })
        .unwrap();

    let resp = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&expired)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{base}/auth/me"))
        .bearer_auth(&expired)
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["id"], user_id);

    server.shutdown().await;
}

#[tokio::test]
async fn jwks_depends_on_key_mode() {
    let server = start_server(config(AuthMode::Jwt)).await;
    let client = client();
    let resp = client
        .get(format!("{}/auth/jwks", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unsupported_mode");
    server.shutdown().await;

    let mut cfg = config(AuthMode::Jwt);
    cfg.auth.key_mode = KeyModeKind::Rsa;
    let server = start_server(cfg).await;
    let resp = client
        .get(format!("{}/.well-known/jwks.json", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
    let jwks: Value = resp.json().await.unwrap();
    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "RSA");
    assert_eq!(keys[0]["alg"], "RS256");
    assert_eq!(keys[0]["use"], "sig");

    // Tokens minted in RSA mode carry the published kid
    let registered = register(&client, &server.base, "dana", "pw").await;
    let resp = client
        .get(format!("{}/auth/me", server.base))
        .bearer_auth(registered["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // An HS256 token is refused by an RS256 server
    let hs = JwtService::new(SigningKeyPair::hmac(b"test-secret-key").unwrap());
    let claims = UserTokenClaims::new(1, "dana", std::time::Duration::from_secs(60));
    let resp = client
        .get(format!("{}/auth/me", server.base))
        .bearer_auth(hs.encode(&claims).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.shutdown().await;
}

#[tokio::test]
async fn discovery_outside_oidc_mode() {
    let mut cfg = config(AuthMode::Jwt);
    cfg.server.base_url = Some("http://todo.test".to_string());
    let server = start_server(cfg).await;

    let resp = client()
        .get(format!("{}/.well-known/openid_configuration", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = resp.json().await.unwrap();
    assert_eq!(doc["issuer"], "http://todo.test");
    assert_eq!(doc["userinfo_endpoint"], "http://todo.test/auth/me");
    assert_eq!(doc["id_token_signing_alg_values_supported"], json!(["HS256"]));

    server.shutdown().await;
}
