// SPDX-License-Identifier: MIT

//! MCP server toolkit - tools, registry, access gate and sessions
//!
//! Nothing in here knows about Microsoft Graph. The `entra` module plugs
//! concrete tools and an HTTP transport into these pieces.

pub mod access;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod tool;

pub use access::AccessGate;
pub use error::{McpError, Result};
pub use registry::ToolRegistry;
pub use session::{Session, SessionState};
pub use tool::{Tool, ToolDefinition, ToolInvocation, ToolResult};
