//! Integration tests for the SSE transport and session lifecycle
//!
//! These tests drive the axum router with a stub directory backend, either
//! in-process through `tower::ServiceExt` or over a real TCP socket.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use entra_mcp_rs::entra::graph::{DirectoryClient, DirectoryRequest};
use entra_mcp_rs::entra::server::{router, AppState};
use entra_mcp_rs::entra::{registry_for, server_info};
use entra_mcp_rs::mcp::error::{McpError, Result};
use entra_mcp_rs::mcp::AccessGate;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

// ============================================================================
// Mock Components
// ============================================================================

static GROUPS_PAGE: Lazy<Value> = Lazy::new(|| {
    json!({
        "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#groups",
        "value": [
            {"id": "g1", "displayName": "Engineering"},
            {"id": "g2", "displayName": "Finance"}
        ]
    })
});

/// Directory stub: single-user lookups fail at the transport, everything
/// else returns a fixed page
struct ScriptedDirectory {
    calls: Mutex<Vec<DirectoryRequest>>,
}

impl ScriptedDirectory {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<DirectoryRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryClient for ScriptedDirectory {
    async fn call(&self, request: DirectoryRequest) -> Result<Value> {
        let path = request.path.clone();
        self.calls.lock().unwrap().push(request);
        if path.starts_with("/users/") {
            return Err(McpError::backend("error sending request: connection refused"));
        }
        Ok(GROUPS_PAGE.clone())
    }
}

fn state(gate: AccessGate) -> (AppState, Arc<ScriptedDirectory>) {
    let directory = Arc::new(ScriptedDirectory::new());
    let state = AppState::new(registry_for(directory.clone()), gate, server_info());
    (state, directory)
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ============================================================================
// Access gate
// ============================================================================

#[tokio::test]
async fn test_sse_without_key_is_forbidden() {
    let (state, _) = state(AccessGate::from_keys("k1,k2"));

    let resp = router(state.clone())
        .oneshot(Request::builder().uri("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body, json!({"detail": "Invalid API key"}));
    assert_eq!(state.session_count().await, 0);
}

#[tokio::test]
async fn test_sse_with_wrong_or_empty_key_is_forbidden() {
    let (state, _) = state(AccessGate::from_keys("k1,"));

    for key in ["k3", ""] {
        let resp = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/sse")
                    .header("x-api-key", key)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "key {:?}", key);
    }
    assert_eq!(state.session_count().await, 0);
}

#[tokio::test]
async fn test_sse_with_valid_key_opens_stream() {
    let (state, _) = state(AccessGate::from_keys("k1,k2"));

    let resp = router(state.clone())
        .oneshot(
            Request::builder()
                .uri("/sse")
                .header("x-api-key", "k2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(state.session_count().await, 1);
}

#[tokio::test]
async fn test_dropping_stream_closes_session() {
    let (state, _) = state(AccessGate::trusted_host());

    let resp = router(state.clone())
        .oneshot(Request::builder().uri("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.session_count().await, 1);

    drop(resp);

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.session_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session was not removed after disconnect");
}

// ============================================================================
// Message endpoint
// ============================================================================

#[tokio::test]
async fn test_post_message_rejections() {
    let (state, _) = state(AccessGate::trusted_host());
    let app = router(state);

    let cases = [
        ("/messages/", StatusCode::BAD_REQUEST),
        ("/messages/?session_id=not-a-uuid", StatusCode::BAD_REQUEST),
        (
            "/messages/?session_id=6f1c3b1e0b5a4a3e9a51c0f1b1a2c3d4",
            StatusCode::NOT_FOUND,
        ),
    ];

    for (uri, expected) in cases {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), expected, "uri {}", uri);
    }
}

// ============================================================================
// End-to-end over TCP
// ============================================================================

/// Minimal SSE frame reader over a streaming reqwest response
struct SseReader {
    resp: reqwest::Response,
    buf: String,
}

impl SseReader {
    fn new(resp: reqwest::Response) -> Self {
        Self {
            resp,
            buf: String::new(),
        }
    }

    /// Next `(event, data)` pair, skipping keep-alive comments
    async fn next_event(&mut self) -> (String, String) {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let frame: String = self.buf.drain(..end + 2).collect();
                let mut event = String::from("message");
                let mut data = Vec::new();
                for line in frame.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        event = v.trim().to_string();
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data.push(v.trim_start().to_string());
                    }
                }
                if data.is_empty() {
                    continue;
                }
                return (event, data.join("\n"));
            }

            let chunk = tokio::time::timeout(Duration::from_secs(5), self.resp.chunk())
                .await
                .expect("timed out waiting for SSE data")
                .unwrap()
                .expect("SSE stream ended");
            self.buf.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    async fn next_message(&mut self) -> Value {
        let (event, data) = self.next_event().await;
        assert_eq!(event, "message");
        serde_json::from_str(&data).unwrap()
    }
}

struct Harness {
    http: reqwest::Client,
    base: String,
    endpoint: String,
    events: SseReader,
}

impl Harness {
    async fn connect(state: AppState, key: Option<&str>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let base = format!("http://{}", addr);
        let mut req = http.get(format!("{}/sse", base));
        if let Some(key) = key {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let mut events = SseReader::new(resp);
        let (event, endpoint) = events.next_event().await;
        assert_eq!(event, "endpoint");
        assert!(endpoint.starts_with("/messages/?session_id="));

        Self {
            http,
            base,
            endpoint,
            events,
        }
    }

    async fn post(&self, message: Value) -> reqwest::StatusCode {
        self.http
            .post(format!("{}{}", self.base, self.endpoint))
            .json(&message)
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        let status = self
            .post(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
        let response = self.events.next_message().await;
        assert_eq!(response["id"], id);
        response
    }

    async fn handshake(&mut self) -> Value {
        let init = self
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "integration-test", "version": "0"}
                }),
            )
            .await;
        let status = self
            .post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
        init
    }
}

fn call_payload(response: &Value) -> (bool, Value) {
    let result = &response["result"];
    let text = result["content"][0]["text"].as_str().unwrap();
    (
        result["isError"].as_bool().unwrap(),
        serde_json::from_str(text).unwrap(),
    )
}

#[tokio::test]
async fn test_full_session_flow() {
    let (state, directory) = state(AccessGate::from_keys("secret"));
    let mut harness = Harness::connect(state, Some("secret")).await;

    let init = harness.handshake().await;
    assert_eq!(init["result"]["serverInfo"]["name"], "Microsoft Graph API");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let list = harness.request(1, "tools/list", json!({})).await;
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["listUsers", "getUser", "searchUsers", "listGroups", "getGroupMembers"]
    );

    // Backend failure is contained to its own invocation
    let failed = harness
        .request(2, "tools/call", json!({"name": "getUser", "arguments": {"id": "u1"}}))
        .await;
    let (is_error, payload) = call_payload(&failed);
    assert!(is_error);
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));

    let ok = harness
        .request(3, "tools/call", json!({"name": "listGroups", "arguments": {}}))
        .await;
    let (is_error, payload) = call_payload(&ok);
    assert!(!is_error);
    assert_eq!(payload, *GROUPS_PAGE);

    let calls = directory.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].request_line(),
        "/users/u1?$select=displayName,userPrincipalName,mail,id,\
         jobTitle,department,officeLocation,businessPhones,mobilePhone"
    );
    assert_eq!(calls[1].request_line(), "/groups?$top=100");
}

#[tokio::test]
async fn test_validation_and_unknown_tool_never_reach_backend() {
    let (state, directory) = state(AccessGate::trusted_host());
    let mut harness = Harness::connect(state, None).await;
    harness.handshake().await;

    let missing = harness
        .request(1, "tools/call", json!({"name": "getGroupMembers", "arguments": {"top": 5}}))
        .await;
    let (is_error, payload) = call_payload(&missing);
    assert!(is_error);
    assert!(payload["error"].as_str().unwrap().contains("'id'"));

    let unknown = harness
        .request(2, "tools/call", json!({"name": "deleteUser", "arguments": {}}))
        .await;
    let (is_error, payload) = call_payload(&unknown);
    assert!(is_error);
    assert!(payload["error"].as_str().unwrap().contains("deleteUser"));

    let search = harness
        .request(
            3,
            "tools/call",
            json!({"name": "searchUsers", "arguments": {"query": "Jane", "top": 4000}}),
        )
        .await;
    assert!(!call_payload(&search).0);

    let calls = directory.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query_value("$search"), Some("\"Jane\""));
    assert_eq!(calls[0].query_value("$top"), Some("999"));
}

#[tokio::test]
async fn test_protocol_errors_keep_session_alive() {
    let (state, _) = state(AccessGate::trusted_host());
    let mut harness = Harness::connect(state, None).await;

    let early = harness.request(1, "tools/list", json!({})).await;
    assert_eq!(early["error"]["code"], -32002);

    harness.handshake().await;

    let again = harness.request(2, "initialize", json!({})).await;
    assert_eq!(again["error"]["code"], -32600);

    let unknown = harness.request(3, "prompts/list", json!({})).await;
    assert_eq!(unknown["error"]["code"], -32601);

    let bad_body = harness
        .http
        .post(format!("{}{}", harness.base, harness.endpoint))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_body.status(), reqwest::StatusCode::BAD_REQUEST);

    let ping = harness.request(4, "ping", json!({})).await;
    assert_eq!(ping["result"], json!({}));
}
