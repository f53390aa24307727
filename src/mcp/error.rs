// SPDX-License-Identifier: MIT

//! Typed error handling for entra-mcp-rs
//!
//! Only `Unauthorized` ends a session. Every other variant is contained to
//! the invocation that raised it and reported back to the client as data.

use thiserror::Error;

/// JSON-RPC error codes used by the session bridge
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const NOT_INITIALIZED: i64 = -32002;
}

/// Top-level error type for entra-mcp-rs
#[derive(Debug, Error)]
pub enum McpError {
    /// Required configuration (credentials, URLs) is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access key missing or not in the allow-list
    #[error("Invalid API key")]
    Unauthorized,

    /// A tool parameter is missing or has the wrong type
    #[error("Invalid arguments for '{tool}': {message}")]
    Validation { tool: String, message: String },

    /// Tool not found in the registry
    #[error("unknown tool: {name}")]
    ToolNotFound { name: String },

    /// Transport failure, malformed response or a fault reported by the backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// JSON-RPC level failure answered with an error response
    #[error("Protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl McpError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error for the given tool
    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a JSON-RPC protocol error
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// JSON-RPC error code this error maps to when it escapes a request
    pub fn code(&self) -> i64 {
        match self {
            Self::Protocol { code, .. } => *code,
            Self::Validation { .. } => codes::INVALID_PARAMS,
            Self::Json(_) => codes::PARSE_ERROR,
            _ => codes::INTERNAL_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
