// SPDX-License-Identifier: MIT

use crate::mcp::error::McpError;
use crate::mcp::tool::{Tool, ToolDefinition, ToolInvocation, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed name → tool mapping.
///
/// Tools are registered while the server starts up; after that the registry
/// is shared behind an `Arc` and only read.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&idx) => {
                log::warn!("Tool '{}' registered twice, keeping the latest", name);
                self.tools[idx] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&idx| self.tools[idx].clone())
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| t.definition())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run one invocation.
    ///
    /// Unknown tools and invalid arguments short-circuit before the handler
    /// runs. Handler failures come back as `ToolResult::Error`.
    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolResult {
        let Some(tool) = self.get(&invocation.name) else {
            log::warn!("Rejected call to unknown tool '{}'", invocation.name);
            return ToolResult::error(McpError::tool_not_found(&invocation.name).to_string());
        };

        let args = match tool.definition().validate(&invocation.arguments) {
            Ok(args) => args,
            Err(e) => {
                log::info!("Rejected call to {}: {}", invocation.name, e);
                return ToolResult::error(e.to_string());
            }
        };

        log::debug!("Dispatching {}", invocation.name);
        let result = ToolResult::from(tool.execute(args).await);
        if let ToolResult::Error { message } = &result {
            log::warn!("Tool {} failed: {}", invocation.name, message);
        }
        result
    }
}
