//! End-to-end tests: real listener, real WebSocket client, real store.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use tasksync_core::{NewTask, TaskPatch};
use tasksync_server::{ServerConfig, ServerHandle, TaskSyncServer};
use tasksync_store::TaskStore;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    server: TaskSyncServer,
    handle: Option<ServerHandle>,
    port: u16,
}

impl TestServer {
    fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    fn store(&self) -> &Arc<TaskStore> {
        self.server.store()
    }

    async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            self.server.stop(handle).await;
        }
    }
}

/// Boot a server on an auto-assigned port with an in-memory store.
async fn boot_server() -> TestServer {
    let store = Arc::new(TaskStore::in_memory().unwrap());
    let server = TaskSyncServer::new(ServerConfig::default(), store);
    let handle = server.serve().await.unwrap();
    let port = handle.port;
    TestServer {
        server,
        handle: Some(handle),
        port,
    }
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Read the next text frame as JSON, skipping control frames.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send_json(ws: &mut WsStream, value: &Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

fn new_task(title: &str, owner: &str) -> NewTask {
    NewTask {
        title: title.into(),
        description: "d".into(),
        category: "Work".into(),
        priority: "Medium".into(),
        user_email: owner.into(),
    }
}

/// Poll until the store reports `n` open cursors.
async fn wait_for_watchers(store: &TaskStore, n: usize) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while store.watcher_count() != n {
        assert!(
            tokio::time::Instant::now() < deadline,
            "never reached {n} watchers (now {})",
            store.watcher_count()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn snapshot_returns_only_owner_tasks() {
    let ts = boot_server().await;
    let _ = ts.store().create(&new_task("mine", "ana@example.com")).unwrap();
    let _ = ts.store().create(&new_task("theirs", "bo@example.com")).unwrap();

    let mut ws = connect(&ts.ws_url()).await;
    send_json(
        &mut ws,
        &json!({"type": "INITIAL_TASKS", "userEmail": "ana@example.com"}),
    )
    .await;

    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "INITIAL_TASKS");
    let data = reply["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["title"], "mine");
    assert_eq!(data[0]["userEmail"], "ana@example.com");

    ts.stop().await;
}

#[tokio::test]
async fn rest_create_reaches_connected_client() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(ts.http_url("/tasks"))
        .json(&json!({
            "title": "from rest",
            "description": "d",
            "category": "Work",
            "priority": "High",
            "userEmail": "ana@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();

    let event = read_json(&mut ws).await;
    assert_eq!(event["type"], "TASK_ADDED");
    assert_eq!(event["data"]["_id"], created["_id"]);
    assert_eq!(event["data"]["title"], "from rest");

    ts.stop().await;
}

#[tokio::test]
async fn live_feed_is_not_scoped_to_snapshot_owner() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    // Snapshot for ana; mutation for bo still arrives.
    send_json(
        &mut ws,
        &json!({"type": "INITIAL_TASKS", "userEmail": "ana@example.com"}),
    )
    .await;
    let snapshot = read_json(&mut ws).await;
    assert_eq!(snapshot["type"], "INITIAL_TASKS");
    assert!(snapshot["data"].as_array().unwrap().is_empty());

    let _ = ts.store().create(&new_task("not mine", "bo@example.com")).unwrap();

    let event = read_json(&mut ws).await;
    assert_eq!(event["type"], "TASK_ADDED");
    assert_eq!(event["data"]["userEmail"], "bo@example.com");

    ts.stop().await;
}

#[tokio::test]
async fn update_and_delete_events_have_expected_payloads() {
    let ts = boot_server().await;
    let task = ts.store().create(&new_task("t", "ana@example.com")).unwrap();

    let mut ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    let patch = TaskPatch {
        category: Some("Done".into()),
        ..TaskPatch::default()
    };
    let _ = ts.store().update(&task.id, &patch).unwrap().unwrap();

    let updated = read_json(&mut ws).await;
    assert_eq!(updated["type"], "TASK_UPDATED");
    // Full post-update document, not a diff
    assert_eq!(updated["data"]["_id"], task.id.as_str());
    assert_eq!(updated["data"]["category"], "Done");
    assert_eq!(updated["data"]["title"], "t");

    assert!(ts.store().delete(&task.id).unwrap());
    let deleted = read_json(&mut ws).await;
    assert_eq!(deleted["type"], "TASK_DELETED");
    assert_eq!(deleted["data"]["_id"], task.id.as_str());
    assert!(deleted["data"].get("title").is_none());

    ts.stop().await;
}

#[tokio::test]
async fn events_arrive_in_commit_order() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    let a = ts.store().create(&new_task("a", "ana@example.com")).unwrap();
    let b = ts.store().create(&new_task("b", "ana@example.com")).unwrap();
    assert!(ts.store().delete(&a.id).unwrap());

    let first = read_json(&mut ws).await;
    assert_eq!(first["type"], "TASK_ADDED");
    assert_eq!(first["data"]["_id"], a.id.as_str());
    let second = read_json(&mut ws).await;
    assert_eq!(second["type"], "TASK_ADDED");
    assert_eq!(second["data"]["_id"], b.id.as_str());
    let third = read_json(&mut ws).await;
    assert_eq!(third["type"], "TASK_DELETED");
    assert_eq!(third["data"]["_id"], a.id.as_str());

    ts.stop().await;
}

#[tokio::test]
async fn malformed_request_gets_error_and_session_survives() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;

    ws.send(Message::Text("{not json".to_string().into()))
        .await
        .unwrap();
    let error = read_json(&mut ws).await;
    assert_eq!(error["type"], "ERROR");
    assert_eq!(error["data"]["code"], "INVALID_REQUEST");

    // Session is still usable afterwards
    send_json(
        &mut ws,
        &json!({"type": "INITIAL_TASKS", "userEmail": "ana@example.com"}),
    )
    .await;
    let reply = read_json(&mut ws).await;
    assert_eq!(reply["type"], "INITIAL_TASKS");

    ts.stop().await;
}

#[tokio::test]
async fn missing_user_email_gets_error() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;

    send_json(&mut ws, &json!({"type": "INITIAL_TASKS"})).await;
    let error = read_json(&mut ws).await;
    assert_eq!(error["type"], "ERROR");
    assert_eq!(error["data"]["code"], "INVALID_REQUEST");

    ts.stop().await;
}

#[tokio::test]
async fn disconnect_closes_the_subscription() {
    let ts = boot_server().await;
    let ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    drop(ws);
    wait_for_watchers(ts.store(), 0).await;

    ts.stop().await;
}

#[tokio::test]
async fn one_disconnect_leaves_other_sessions_live() {
    let ts = boot_server().await;
    let ws_a = connect(&ts.ws_url()).await;
    let mut ws_b = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 2).await;

    drop(ws_a);
    wait_for_watchers(ts.store(), 1).await;

    let task = ts.store().create(&new_task("still here", "ana@example.com")).unwrap();
    let event = read_json(&mut ws_b).await;
    assert_eq!(event["type"], "TASK_ADDED");
    assert_eq!(event["data"]["_id"], task.id.as_str());

    ts.stop().await;
}

#[tokio::test]
async fn health_reports_connection_count() {
    let ts = boot_server().await;
    let _ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    let body: Value = reqwest::get(ts.http_url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 1);

    ts.stop().await;
}

#[tokio::test]
async fn rest_update_and_delete_round_trip() {
    let ts = boot_server().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(ts.http_url("/tasks"))
        .json(&json!({
            "title": "t",
            "description": "d",
            "category": "Work",
            "priority": "Low",
            "userEmail": "ana@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["_id"].as_str().unwrap();

    let updated: Value = client
        .put(ts.http_url(&format!("/tasks/{id}")))
        .json(&json!({"priority": "High"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["priority"], "High");
    assert_eq!(updated["title"], "t");

    let deleted: Value = client
        .delete(ts.http_url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["deleted"], true);

    let resp = client
        .delete(ts.http_url(&format!("/tasks/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    ts.stop().await;
}

#[tokio::test]
async fn server_shutdown_ends_open_sessions() {
    let ts = boot_server().await;
    let mut ws = connect(&ts.ws_url()).await;
    wait_for_watchers(ts.store(), 1).await;

    ts.stop().await;

    // The session closes the socket; the client sees close or end-of-stream.
    let end = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(end.is_ok(), "socket did not close after shutdown");
}
