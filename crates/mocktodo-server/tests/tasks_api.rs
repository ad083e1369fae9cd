mod common;

use common::{client, register, start_server};
use mocktodo_server::AppConfig;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn file_config(path: &std::path::Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.json_file_path = Some(path.to_path_buf());
    cfg
}

#[tokio::test]
async fn owner_scoped_tasks_on_file_store() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("data.json");
    let server = start_server(file_config(&path)).await;
    let base = &server.base;
    let client = client();

    let alice = register(&client, base, "alice", "secret1").await;
    let bob = register(&client, base, "bob", "secret2").await;
    let alice_token = alice["token"].as_str().unwrap();
    let bob_token = bob["token"].as_str().unwrap();
    assert_eq!(alice["user"]["id"], 1);
    assert!(alice["user"].get("hashed_password").is_none());

    // Create as user 1
    let resp = client
        .post(format!("{base}/tasks"))
        .bearer_auth(alice_token)
        .json(&json!({"title": "buy milk"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["id"], 1);
    assert_eq!(task["user_id"], 1);
    assert_eq!(task["title"], "buy milk");

    // Another user is refused
    let resp = client
        .get(format!("{base}/tasks/1"))
        .bearer_auth(bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    // The owner sees the same task
    let resp = client
        .get(format!("{base}/tasks/1"))
        .bearer_auth(alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched, task);

    // Update keeps created_at
    let resp = client
        .put(format!("{base}/tasks/1"))
        .bearer_auth(alice_token)
        .json(&json!({"title": "buy oat milk"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "buy oat milk");
    assert_eq!(updated["created_at"], task["created_at"]);
    assert_eq!(updated["user_id"], 1);

    // Listing is per owner
    let resp = client
        .get(format!("{base}/tasks"))
        .bearer_auth(bob_token)
        .send()
        .await
        .unwrap();
    let tasks: Vec<Value> = resp.json().await.unwrap();
    assert!(tasks.is_empty());

    let resp = client
        .delete(format!("{base}/tasks/1"))
        .bearer_auth(bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    server.shutdown().await;
}

#[tokio::test]
async fn ids_continue_after_restart() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("data.json");
    let client = client();

    let server = start_server(file_config(&path)).await;
    let token = register(&client, &server.base, "carol", "pw").await["token"]
        .as_str()
        .unwrap()
        .to_string();
    for title in ["one", "two"] {
        let resp = client
            .post(format!("{}/tasks", server.base))
            .bearer_auth(&token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    let resp = client
        .delete(format!("{}/tasks/2", server.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    server.shutdown().await;

    let server = start_server(file_config(&path)).await;
    let resp = client
        .post(format!("{}/auth/login", server.base))
        .json(&json!({"username": "carol", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = resp.json().await.unwrap();
    let token = login["token"].as_str().unwrap();

    let resp = client
        .post(format!("{}/tasks", server.base))
        .bearer_auth(token)
        .json(&json!({"title": "three"}))
        .send()
        .await
        .unwrap();
    let task: Value = resp.json().await.unwrap();
    // Task 2 was deleted; the next id is max(1) + 1
    assert_eq!(task["id"], 2);

    let dave = register(&client, &server.base, "dave", "pw").await;
    assert_eq!(dave["user"]["id"], 2);

    let state = server.handle.memory_state().await.unwrap();
    assert_eq!(state.tasks.len(), 2);
    assert_eq!(state.users.len(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn anonymous_mode_and_memory_state() {
    let mut cfg = AppConfig::default();
    cfg.auth.required = false;
    let server = start_server(cfg).await;
    let base = &server.base;
    let client = client();

    let resp = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "anonymous"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["user_id"], 0);

    let resp = client
        .put(format!("{base}/tasks/1"))
        .json(&json!({"title": "renamed"}))
        .send()
        .await
        .unwrap();
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["user_id"], 0);

    register(&client, base, "erin", "pw").await;

    let resp = client
        .get(format!("{base}/internal/memory-state"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let state: Value = resp.json().await.unwrap();
    assert_eq!(state["tasks"][0]["title"], "renamed");
    assert_eq!(state["users"][0]["username"], "erin");
    assert!(state["users"][0]["hashed_password"].is_string());

    let resp = client
        .get(format!("{base}/tasks/not-a-number"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("{base}/tasks/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}
