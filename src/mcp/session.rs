// SPDX-License-Identifier: MIT

//! Per-connection MCP session state machine
//!
//! ```text
//! Unauthenticated ──gate──▶ Handshaking ──initialized──▶ Active ──drop──▶ Closed
//!        └──────────────── rejected ───────────────────────────────────────┘
//! ```
//!
//! The session knows nothing about HTTP. The transport feeds it parsed
//! messages through [`Session::deliver`] and drains responses from the
//! channel handed to [`Session::new`].

use crate::mcp::access::AccessGate;
use crate::mcp::error::{codes, McpError, Result};
use crate::mcp::protocol::{Incoming, JsonRpcResponse, ServerInfo};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::ToolInvocation;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// `advertised` flips once the `initialize` request has been answered
    Handshaking {
        advertised: bool,
    },
    Active,
    Closed,
}

pub struct Session {
    id: Uuid,
    state: Mutex<SessionState>,
    registry: Arc<ToolRegistry>,
    info: Arc<ServerInfo>,
    outbound: mpsc::Sender<JsonRpcResponse>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(
        registry: Arc<ToolRegistry>,
        info: Arc<ServerInfo>,
        outbound: mpsc::Sender<JsonRpcResponse>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(SessionState::Unauthenticated),
            registry,
            info,
            outbound,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Token cancelled when the session closes
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the access gate. A rejected session is closed immediately.
    pub async fn authenticate(&self, gate: &AccessGate, key: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Unauthenticated {
            return Err(McpError::protocol(
                codes::INVALID_REQUEST,
                "session already authenticated",
            ));
        }

        if gate.authorize(key) {
            *state = SessionState::Handshaking { advertised: false };
            Ok(())
        } else {
            *state = SessionState::Closed;
            self.cancel.cancel();
            Err(McpError::Unauthorized)
        }
    }

    /// Terminal transition; in-flight work is abandoned
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state != SessionState::Closed {
            log::info!("Session {} closed", self.id);
            *state = SessionState::Closed;
        }
        self.cancel.cancel();
    }

    pub async fn is_closed(&self) -> bool {
        self.state().await == SessionState::Closed
    }

    /// Handle one inbound message and push its response, if any, to the
    /// outbound channel.
    ///
    /// Work racing a session close is dropped without emitting anything.
    pub async fn deliver(&self, message: Incoming) {
        let response = tokio::select! {
            _ = self.cancel.cancelled() => {
                log::debug!("Session {} closed, dropping in-flight message", self.id);
                return;
            }
            response = self.handle(message) => response,
        };

        let Some(response) = response else {
            return;
        };

        if self.is_closed().await {
            return;
        }

        if self.outbound.send(response).await.is_err() {
            log::debug!("Session {} stream gone", self.id);
            self.close().await;
        }
    }

    /// Produce the response for one inbound message.
    ///
    /// Notifications and client responses yield `None`.
    pub async fn handle(&self, message: Incoming) -> Option<JsonRpcResponse> {
        match message {
            Incoming::Request { id, method, params } => {
                let result = self.handle_request(&method, params).await;
                Some(match result {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => {
                        log::debug!("Request {} failed: {}", method, e);
                        JsonRpcResponse::failure(id, &e)
                    }
                })
            }
            Incoming::Notification { method, .. } => {
                self.handle_notification(&method).await;
                None
            }
            Incoming::Response { id } => {
                log::debug!("Ignoring client response {}", id);
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "initialize" => self.initialize().await,
            "ping" => {
                self.require_open().await?;
                Ok(json!({}))
            }
            "tools/list" => {
                self.require_ready().await?;
                let tools: Vec<Value> = self
                    .registry
                    .definitions()
                    .map(|d| d.to_listing())
                    .collect();
                Ok(json!({ "tools": tools }))
            }
            "tools/call" => {
                self.require_ready().await?;
                let invocation: ToolInvocation = serde_json::from_value(params).map_err(|e| {
                    McpError::protocol(
                        codes::INVALID_PARAMS,
                        format!("invalid tools/call params: {}", e),
                    )
                })?;
                log::info!("Session {} calling {}", self.id, invocation.name);
                Ok(self.registry.dispatch(invocation).await.into_call_result())
            }
            other => Err(McpError::protocol(
                codes::METHOD_NOT_FOUND,
                format!("method not found: {}", other),
            )),
        }
    }

    async fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => {
                let mut state = self.state.lock().await;
                match *state {
                    SessionState::Handshaking { advertised: true } => {
                        log::info!("Session {} active", self.id);
                        *state = SessionState::Active;
                    }
                    SessionState::Handshaking { advertised: false } => {
                        log::warn!("Session {} sent initialized before initialize", self.id);
                    }
                    _ => {}
                }
            }
            "notifications/cancelled" => {
                log::debug!("Session {} cancellation notice ignored", self.id);
            }
            other => log::debug!("Unhandled notification {}", other),
        }
    }

    /// Advertise identity and capabilities, exactly once per session
    async fn initialize(&self) -> Result<Value> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Handshaking { advertised: false } => {
                *state = SessionState::Handshaking { advertised: true };
                Ok(self.info.initialize_result())
            }
            SessionState::Handshaking { advertised: true } | SessionState::Active => Err(
                McpError::protocol(codes::INVALID_REQUEST, "session already initialized"),
            ),
            SessionState::Unauthenticated | SessionState::Closed => Err(McpError::protocol(
                codes::INVALID_REQUEST,
                "session is not open",
            )),
        }
    }

    async fn require_open(&self) -> Result<()> {
        match self.state().await {
            SessionState::Unauthenticated | SessionState::Closed => Err(McpError::protocol(
                codes::INVALID_REQUEST,
                "session is not open",
            )),
            _ => Ok(()),
        }
    }

    /// Tool requests need an answered `initialize`. A client that skips the
    /// `initialized` notification is promoted on its first tool request.
    async fn require_ready(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Active => Ok(()),
            SessionState::Handshaking { advertised: true } => {
                *state = SessionState::Active;
                Ok(())
            }
            _ => Err(McpError::protocol(
                codes::NOT_INITIALIZED,
                "session not initialized",
            )),
        }
    }
}
