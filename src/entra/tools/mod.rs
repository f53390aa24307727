// SPDX-License-Identifier: MIT

//! Directory tools exposed over MCP

pub mod groups;
pub mod users;

use crate::entra::graph::DirectoryClient;
use crate::mcp::error::{McpError, Result};
use crate::mcp::tool::{Tool, ToolArgs};
use std::sync::Arc;

/// Upper bound Graph accepts for `$top`
pub const MAX_TOP: i64 = 999;

/// Resolve the page size: default when absent, clamped to [`MAX_TOP`].
///
/// Returns `None` for zero, which leaves `$top` off the request so the
/// backend applies its own page size.
pub fn effective_top(args: &ToolArgs, default: i64) -> Result<Option<i64>> {
    let top = args.int("top").unwrap_or(default);
    if top < 0 {
        return Err(McpError::validation(
            args.tool(),
            format!("parameter 'top' must be non-negative, got {}", top),
        ));
    }
    Ok((top > 0).then(|| top.min(MAX_TOP)))
}

/// Reject identifiers that would escape their path segment.
///
/// `url` treats `\` as a separator for https, and `.`/`..` are dot
/// segments, so both are refused along with `/`, `?` and `#`.
pub fn path_segment<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str> {
    let value = args.require_str(name)?;
    if value.contains(['/', '\\', '?', '#']) {
        return Err(McpError::validation(
            args.tool(),
            format!("parameter '{}' must not contain '/', '\\', '?' or '#'", name),
        ));
    }
    if value == "." || value == ".." {
        return Err(McpError::validation(
            args.tool(),
            format!("parameter '{}' must not be a dot segment", name),
        ));
    }
    Ok(value)
}

/// Every directory tool, in advertisement order
pub fn create_tools(client: Arc<dyn DirectoryClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(users::ListUsersTool::new(client.clone())),
        Arc::new(users::GetUserTool::new(client.clone())),
        Arc::new(users::SearchUsersTool::new(client.clone())),
        Arc::new(groups::ListGroupsTool::new(client.clone())),
        Arc::new(groups::GetGroupMembersTool::new(client)),
    ]
}
