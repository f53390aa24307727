// SPDX-License-Identifier: MIT

//! HTTP + SSE transport for MCP sessions
//!
//! `GET /sse` opens a session (after the API-key gate) and streams responses
//! as `message` events. The first event is `endpoint`, telling the client
//! where to `POST` its JSON-RPC messages.

use crate::mcp::access::{AccessGate, API_KEY_HEADER};
use crate::mcp::protocol::{Incoming, ServerInfo};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::session::Session;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

pub const MESSAGES_PATH: &str = "/messages/";

/// Outbound messages buffered per session before senders wait
const SESSION_BUFFER: usize = 64;

type SessionMap = HashMap<Uuid, Arc<Session>>;

/// Shared, read-mostly server state
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
    gate: Arc<AccessGate>,
    info: Arc<ServerInfo>,
    sessions: Arc<RwLock<SessionMap>>,
}

impl AppState {
    pub fn new(registry: ToolRegistry, gate: AccessGate, info: ServerInfo) -> Self {
        Self {
            registry: Arc::new(registry),
            gate: Arc::new(gate),
            info: Arc::new(info),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(open_session))
        .route(MESSAGES_PATH, post(post_message))
        .route("/messages", post(post_message))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}/sse", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn open_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    let session = Arc::new(Session::new(state.registry.clone(), state.info.clone(), tx));

    if let Err(e) = session.authenticate(&state.gate, key).await {
        log::warn!("Rejected session: {}", e);
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "detail": e.to_string() })),
        )
            .into_response();
    }

    let id = session.id();
    state.sessions.write().await.insert(id, session.clone());
    log::info!("Session {} opened", id);

    // Closing (client disconnect drops the guard below) removes the session
    let cancel = session.cancellation();
    let sessions = state.sessions.clone();
    let reaped = session.clone();
    tokio::spawn(async move {
        cancel.cancelled().await;
        reaped.close().await;
        sessions.write().await.remove(&id);
    });

    let guard = session.cancellation().drop_guard();
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?session_id={}", MESSAGES_PATH, id.simple()));

    let messages = ReceiverStream::new(rx).map(move |response| {
        let _alive = &guard;
        Event::default().event("message").json_data(response)
    });
    let stream = tokio_stream::once(Ok(endpoint)).chain(messages);

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(raw_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Ok(id) = Uuid::parse_str(&raw_id) else {
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };

    let session = state.sessions.read().await.get(&id).cloned();
    let Some(session) = session else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };
    if session.is_closed().await {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }

    let message = match Incoming::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("Session {} sent an unparseable message: {}", id, e);
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    // Each message runs on its own task so slow tool calls overlap
    tokio::spawn(async move {
        session.deliver(message).await;
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
