// SPDX-License-Identifier: MIT

//! # entra-mcp-rs
//!
//! An MCP server exposing read-only Microsoft Entra ID directory lookups
//! (users, groups, group members) over HTTP + Server-Sent Events.
//!
//! - [`mcp`] holds the protocol toolkit: tool definitions and validation,
//!   the registry, the API-key gate and the per-connection session.
//! - [`entra`] holds the Graph-specific parts: configuration, the token
//!   provider and request adapter, the five directory tools and the axum
//!   transport.

pub mod entra;
pub mod mcp;

pub use mcp::error::{McpError, Result};
