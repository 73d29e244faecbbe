//! End-to-end API tests against a server bound on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relaydir_core::{MemorySnapshotStore, RelayStore, SystemClock};
use relaydir_http::{DirectoryContext, DirectoryServer};
use serde_json::{Value, json};
use tokio::sync::oneshot;

struct TestServer {
    base_url: String,
    shutdown_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<relaydir_core::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let clock = Arc::new(SystemClock);
        let store = Arc::new(
            RelayStore::open(Arc::new(MemorySnapshotStore::new()), clock.clone()).await,
        );
        let ctx = Arc::new(DirectoryContext::new(
            store,
            clock,
            Duration::from_secs(300),
        ));

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = DirectoryServer::bind(addr, ctx).await.unwrap();
        let base_url = format!("http://{}", server.local_addr().unwrap());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(server.serve(shutdown_rx));

        Self {
            base_url,
            shutdown_tx,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.handle.await.unwrap().unwrap();
    }
}

fn register_body(id: &str) -> Value {
    json!({
        "id": id,
        "address": "10.1.2.3",
        "port": 9000,
        "public_key": format!("pk-{id}"),
    })
}

#[tokio::test]
async fn root_greeting_responds() {
    let server = TestServer::start().await;

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("alive"));

    server.stop().await;
}

#[tokio::test]
async fn register_then_list_round_trip() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));

    let body: Value = client
        .get(server.url("/relays"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], json!(1));
    let relay = &body["relays"][0];
    assert_eq!(relay["id"], json!("r1"));
    assert_eq!(relay["address"], json!("10.1.2.3"));
    assert_eq!(relay["port"], json!(9000));
    assert_eq!(relay["public_key"], json!("pk-r1"));
    assert!(relay.get("last_seen").is_none());

    server.stop().await;
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let first = client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    server.stop().await;
}

#[tokio::test]
async fn register_validation_failures_are_400() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let cases = [
        // missing public_key
        json!({"id": "r1", "address": "1.2.3.4", "port": 80}),
        // malformed address
        json!({"id": "r1", "address": "1.2.3", "port": 80, "public_key": "pk"}),
        // octet out of range
        json!({"id": "r1", "address": "256.1.1.1", "port": 80, "public_key": "pk"}),
        // port out of range
        json!({"id": "r1", "address": "1.2.3.4", "port": 0, "public_key": "pk"}),
        json!({"id": "r1", "address": "1.2.3.4", "port": 65536, "public_key": "pk"}),
        // fractional port
        json!({"id": "r1", "address": "1.2.3.4", "port": 80.5, "public_key": "pk"}),
    ];

    for case in &cases {
        let response = client
            .post(server.url("/register"))
            .json(case)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "expected 400 for {case}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], json!(false));
    }

    // nothing registered
    let body: Value = client
        .get(server.url("/relays"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], json!(0));

    server.stop().await;
}

#[tokio::test]
async fn port_accepts_numeric_string() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/register"))
        .json(&json!({
            "id": "r1",
            "address": "10.1.2.3",
            "port": "8080",
            "public_key": "pk",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Stored canonically as an integer
    let body: Value = client
        .get(server.url("/relays"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["relays"][0]["port"], json!(8080));

    server.stop().await;
}

#[tokio::test]
async fn heartbeat_lifecycle() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // unknown id
    let response = client
        .post(server.url("/heartbeat"))
        .json(&json!({"id": "ghost"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // missing id
    let response = client
        .post(server.url("/heartbeat"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();

    let response = client
        .post(server.url("/heartbeat"))
        .json(&json!({"id": "r1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["relay_id"], json!("r1"));
    assert!(body["last_seen"].as_i64().unwrap() > 0);

    server.stop().await;
}

#[tokio::test]
async fn delete_lifecycle() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(server.url("/relay/r1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["relay_id"], json!("r1"));

    let response = client
        .delete(server.url("/relay/r1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn health_reports_counts_and_uptime() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client
        .post(server.url("/register"))
        .json(&register_body("r1"))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["relayCount"], json!(1));
    assert_eq!(body["activeRelays"], json!(1));
    assert_eq!(body["inactiveRelays"], json!(0));
    assert!(body["uptime_seconds"].as_u64().is_some());

    server.stop().await;
}

#[tokio::test]
async fn malformed_json_and_unknown_routes() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .get(server.url("/no-such-route"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.stop().await;
}
