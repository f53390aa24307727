// SPDX-License-Identifier: MIT

//! Microsoft Entra ID directory server: configuration, Graph adapter,
//! directory tools and the HTTP transport.

pub mod config;
pub mod graph;
pub mod server;
pub mod tools;

use crate::mcp::error::Result;
use crate::mcp::protocol::ServerInfo;
use crate::mcp::registry::ToolRegistry;
use config::Config;
use graph::{DirectoryClient, GraphClient};
use server::AppState;
use std::sync::Arc;

pub const SERVER_NAME: &str = "Microsoft Graph API";

pub fn server_info() -> ServerInfo {
    ServerInfo::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .with_instructions(
            "MCP Server for Microsoft Graph API. \
             Read-only access to users and groups in a Microsoft Entra ID tenant.",
        )
}

/// Registry holding every directory tool bound to `client`
pub fn registry_for(client: Arc<dyn DirectoryClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools::create_tools(client) {
        log::info!("Registered tool: {}", tool.name());
        registry.register(tool);
    }
    registry
}

/// Wire configuration, Graph adapter and tools into server state
pub fn build_state(config: &Config) -> Result<AppState> {
    let client: Arc<dyn DirectoryClient> = Arc::new(GraphClient::from_config(config)?);
    Ok(AppState::new(
        registry_for(client),
        config.access.clone(),
        server_info(),
    ))
}
