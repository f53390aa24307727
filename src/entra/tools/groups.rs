// SPDX-License-Identifier: MIT

use super::{effective_top, path_segment};
use crate::entra::graph::{DirectoryClient, DirectoryRequest};
use crate::mcp::error::Result;
use crate::mcp::tool::{ParamSpec, ParamType, Tool, ToolArgs, ToolDefinition};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

// --- List Groups ---

static LIST_GROUPS: Lazy<ToolDefinition> = Lazy::new(|| {
    ToolDefinition::new(
        "listGroups",
        "Retrieve a list of groups from Microsoft Entra ID tenant",
        vec![
            ParamSpec::optional(
                "top",
                ParamType::Integer,
                "Number of groups to retrieve (maximum 999)",
            ),
            ParamSpec::optional(
                "filter",
                ParamType::String,
                "OData filter expression for filtering groups",
            ),
        ],
    )
});

pub struct ListGroupsTool {
    client: Arc<dyn DirectoryClient>,
}

impl ListGroupsTool {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListGroupsTool {
    fn definition(&self) -> &ToolDefinition {
        &LIST_GROUPS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let mut request = DirectoryRequest::new("/groups");
        if let Some(top) = effective_top(&args, 100)? {
            request = request.query("$top", top.to_string());
        }
        let request = request.query_opt("$filter", args.str("filter"));

        self.client.call(request).await
    }
}

// --- Get Group Members ---

static GET_GROUP_MEMBERS: Lazy<ToolDefinition> = Lazy::new(|| {
    ToolDefinition::new(
        "getGroupMembers",
        "Retrieve members of a specific group from Microsoft Entra ID tenant",
        vec![
            ParamSpec::required("id", ParamType::String, "Group ID"),
            ParamSpec::optional(
                "top",
                ParamType::Integer,
                "Number of members to retrieve (maximum 999)",
            ),
        ],
    )
});

pub struct GetGroupMembersTool {
    client: Arc<dyn DirectoryClient>,
}

impl GetGroupMembersTool {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetGroupMembersTool {
    fn definition(&self) -> &ToolDefinition {
        &GET_GROUP_MEMBERS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let id = path_segment(&args, "id")?;
        let mut request = DirectoryRequest::new(format!("/groups/{}/members", id));
        if let Some(top) = effective_top(&args, 100)? {
            request = request.query("$top", top.to_string());
        }

        self.client.call(request).await
    }
}
