#![allow(dead_code)]

use mocktodo_server::{AppConfig, ServerBuilder, ServerError, ServerHandle};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base: String,
    pub handle: ServerHandle,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn shutdown(self) {
        self.handle.stop();
        self.task.await.expect("join").expect("serve");
    }
}

pub async fn start_server(cfg: AppConfig) -> TestServer {
    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .expect("build server");
    let handle = server.handle();

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(server.serve(listener));

    TestServer {
        base: format!("http://{addr}"),
        handle,
        task,
    }
}

/// Client that does not follow redirects, so authorize responses can be inspected.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Registers a user and returns the response body (`{token, user}`).
pub async fn register(client: &reqwest::Client, base: &str, username: &str, password: &str) -> Value {
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&json!({"username": username, "password": password}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.unwrap()
}

/// Extracts `name=value` of the first `Set-Cookie` header.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
