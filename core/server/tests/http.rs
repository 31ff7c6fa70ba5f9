//! End-to-end tests for the HTTP boundary.
//!
//! Each test starts the real router on an OS-assigned ephemeral TCP port
//! over an in-memory vault and drives it with `reqwest`.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use resivault_server::{build_router, AppState};
use resivault_storage::{BlobStorage, MemoryStorage};
use resivault_vault::{Registry, Vault};

// ── helpers ──────────────────────────────────────────────────────────────────

struct TestServer {
    base: String,
    client: reqwest::Client,
    entries: Arc<MemoryStorage>,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn initialize(&self, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/initialize"))
            .json(&json!({ "password": password }))
            .send()
            .await
            .expect("request failed")
    }

    /// Unlock asking for JSON and return the session token.
    async fn unlock(&self, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/unlock"))
            .header("Accept", "application/json")
            .json(&json!({ "password": password }))
            .send()
            .await
            .expect("request failed");
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("invalid JSON");
        body["token"].as_str().expect("token missing").to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed")
    }
}

async fn start_test_server() -> TestServer {
    let meta = Arc::new(MemoryStorage::new());
    let entries = Arc::new(MemoryStorage::new());
    let registry = Arc::new(Registry::with_builtin_variants().expect("registry"));
    let vault = Vault::new(meta, entries.clone(), registry);
    let app = build_router(Arc::new(AppState::new(vault)));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");
    let base = format!("http://127.0.0.1:{}", addr.port());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    // Small yield so the listener is ready.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    TestServer {
        base,
        client: reqwest::Client::new(),
        entries,
        _handle: handle,
    }
}

async fn create_login(server: &TestServer, token: &str, id: &str) -> reqwest::Response {
    server
        .client
        .post(server.url("/entries"))
        .bearer_auth(token)
        .json(&json!({
            "id": id,
            "name": "Example",
            "tags": [{ "key": "team", "value": "ops" }],
            "usage": {
                "type": "WebLogin",
                "details": { "url": "https://example.com/login", "username": "alice" }
            }
        }))
        .send()
        .await
        .expect("request failed")
}

// ── lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_tracks_lifecycle() {
    let server = start_test_server().await;

    let status: Value = server
        .client
        .get(server.url("/status"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid JSON");
    assert_eq!(
        status,
        json!({ "initialized": false, "unlocked": false, "sessionCount": 0 })
    );

    assert_eq!(server.initialize("hunter2").await.status(), 201);
    server.unlock("hunter2").await;

    let status: Value = server
        .client
        .get(server.url("/status"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid JSON");
    assert_eq!(
        status,
        json!({ "initialized": true, "unlocked": true, "sessionCount": 1 })
    );
}

#[tokio::test]
async fn initialize_twice_conflicts() {
    let server = start_test_server().await;
    assert_eq!(server.initialize("hunter2").await.status(), 201);

    let resp = server.initialize("hunter2").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.expect("invalid JSON");
    assert_eq!(body["error"], "VaultAlreadyInitialized");
}

#[tokio::test]
async fn unlock_with_wrong_password_is_forbidden() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;

    let resp = server
        .client
        .post(server.url("/unlock"))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), 403);
    assert!(resp.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn unlock_without_json_sets_cookie_only() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;

    let resp = server
        .client
        .post(server.url("/unlock"))
        .json(&json!({ "password": "hunter2" }))
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), 204);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("cookie missing")
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    // The cookie alone authenticates
    let pair = cookie.split(';').next().expect("cookie pair");
    let resp = server
        .client
        .get(server.url("/entries"))
        .header("Cookie", pair)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn unlock_reports_loading_errors() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    server
        .entries
        .save("broken", b"garbage".to_vec())
        .await
        .expect("save");

    let resp = server
        .client
        .post(server.url("/unlock"))
        .header("Accept", "application/json")
        .json(&json!({ "password": "hunter2" }))
        .send()
        .await
        .expect("request failed");
    let body: Value = resp.json().await.expect("invalid JSON");

    assert_eq!(body["token"].as_str().map(str::len), Some(32));
    assert!(body["loadingErrors"]["broken"].is_string());
}

#[tokio::test]
async fn lock_revokes_tokens() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    let token = server.unlock("hunter2").await;
    assert_eq!(server.get("/entries", &token).await.status(), 200);

    let resp = server
        .client
        .post(server.url("/lock"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 204);

    assert_eq!(server.get("/entries", &token).await.status(), 401);
}

#[tokio::test]
async fn types_lists_registered_variants() {
    let server = start_test_server().await;
    let body: Value = server
        .client
        .get(server.url("/types"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid JSON");

    assert_eq!(body["secrets"]["Password"]["type"], "string");
    assert_eq!(body["usages"]["WebLogin"]["type"], "object");
}

// ── sensitive routes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn entries_require_token() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    server.unlock("hunter2").await;

    let resp = server
        .client
        .get(server.url("/entries"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 401);

    let bogus = "00".repeat(16);
    assert_eq!(server.get("/entries", &bogus).await.status(), 401);
}

#[tokio::test]
async fn entry_and_secret_crud() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    let token = server.unlock("hunter2").await;

    let resp = create_login(&server, &token, "github").await;
    assert_eq!(resp.status(), 201);
    assert_eq!(
        resp.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/entries/github")
    );

    let resp = server
        .client
        .post(server.url("/entries/github/secrets"))
        .bearer_auth(&token)
        .json(&json!({ "type": "Password", "label": "main", "value": "p@ss" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 201);

    // Duplicate label
    let resp = server
        .client
        .post(server.url("/entries/github/secrets"))
        .bearer_auth(&token)
        .json(&json!({ "type": "Password", "label": "main", "value": "other" }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 409);

    let revealed: Value = server
        .get("/entries/github/secrets/main", &token)
        .await
        .json()
        .await
        .expect("invalid JSON");
    assert_eq!(revealed, json!("p@ss"));

    let entry: Value = server
        .get("/entries/github", &token)
        .await
        .json()
        .await
        .expect("invalid JSON");
    assert_eq!(entry["name"], "Example");
    assert_eq!(entry["autoTags"], json!([{ "key": "domain", "value": "example.com" }]));
    assert_eq!(entry["secrets"], json!([{ "type": "Password", "label": "main" }]));

    let list: Value = server
        .get("/entries", &token)
        .await
        .json()
        .await
        .expect("invalid JSON");
    assert_eq!(list[0]["id"], "github");
    assert_eq!(list[0]["usageType"], "WebLogin");

    let resp = server
        .client
        .delete(server.url("/entries/github/secrets/main"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 204);
    assert_eq!(
        server.get("/entries/github/secrets/main", &token).await.status(),
        404
    );

    let resp = server
        .client
        .delete(server.url("/entries/github"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 204);
    assert_eq!(server.get("/entries/github", &token).await.status(), 404);
}

#[tokio::test]
async fn create_entry_generates_id() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    let token = server.unlock("hunter2").await;

    let resp = server
        .client
        .post(server.url("/entries"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "No id",
            "usage": {
                "type": "WebLogin",
                "details": { "url": "https://example.org", "username": "bob" }
            }
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.expect("invalid JSON");
    let id = body["id"].as_str().expect("id missing");
    assert!(!id.is_empty());
    assert!(server.entries.load(id).await.expect("load").is_some());
}

#[tokio::test]
async fn invalid_entries_are_rejected() {
    let server = start_test_server().await;
    server.initialize("hunter2").await;
    let token = server.unlock("hunter2").await;

    let resp = server
        .client
        .post(server.url("/entries"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Unknown usage",
            "usage": { "type": "SshHost", "details": {} }
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 422);

    let resp = server
        .client
        .post(server.url("/entries"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Bad URL",
            "usage": { "type": "WebLogin", "details": { "url": "nope", "username": "x" } }
        }))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), 400);

    create_login(&server, &token, "dup").await;
    assert_eq!(create_login(&server, &token, "dup").await.status(), 409);
}
