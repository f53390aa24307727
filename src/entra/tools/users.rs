// SPDX-License-Identifier: MIT

use super::{effective_top, path_segment};
use crate::entra::graph::{DirectoryClient, DirectoryRequest};
use crate::mcp::error::Result;
use crate::mcp::tool::{ParamSpec, ParamType, Tool, ToolArgs, ToolDefinition};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_USER_SELECT: &str = "displayName,userPrincipalName,mail,id";
pub const DEFAULT_USER_DETAIL_SELECT: &str = "displayName,userPrincipalName,mail,id,\
    jobTitle,department,officeLocation,businessPhones,mobilePhone";

// --- List Users ---

static LIST_USERS: Lazy<ToolDefinition> = Lazy::new(|| {
    ToolDefinition::new(
        "listUsers",
        "Retrieve a list of users from Microsoft Entra ID tenant",
        vec![
            ParamSpec::optional(
                "top",
                ParamType::Integer,
                "Number of users to retrieve (maximum 999)",
            ),
            ParamSpec::optional(
                "filter",
                ParamType::String,
                "OData filter expression for filtering users",
            ),
            ParamSpec::optional(
                "select",
                ParamType::String,
                "Comma-separated list of properties to include",
            ),
        ],
    )
});

pub struct ListUsersTool {
    client: Arc<dyn DirectoryClient>,
}

impl ListUsersTool {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ListUsersTool {
    fn definition(&self) -> &ToolDefinition {
        &LIST_USERS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let mut request = DirectoryRequest::new("/users");
        if let Some(top) = effective_top(&args, 100)? {
            request = request.query("$top", top.to_string());
        }
        let request = request
            .query_opt("$filter", args.str("filter"))
            .query("$select", args.str("select").unwrap_or(DEFAULT_USER_SELECT));

        self.client.call(request).await
    }
}

// --- Get User ---

static GET_USER: Lazy<ToolDefinition> = Lazy::new(|| {
    ToolDefinition::new(
        "getUser",
        "Retrieve a specific user by ID or UPN from Microsoft Entra ID tenant",
        vec![
            ParamSpec::required("id", ParamType::String, "User ID or user principal name"),
            ParamSpec::optional(
                "select",
                ParamType::String,
                "Comma-separated list of properties to include",
            ),
        ],
    )
});

pub struct GetUserTool {
    client: Arc<dyn DirectoryClient>,
}

impl GetUserTool {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetUserTool {
    fn definition(&self) -> &ToolDefinition {
        &GET_USER
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let id = path_segment(&args, "id")?;
        let request = DirectoryRequest::new(format!("/users/{}", id)).query(
            "$select",
            args.str("select").unwrap_or(DEFAULT_USER_DETAIL_SELECT),
        );

        self.client.call(request).await
    }
}

// --- Search Users ---

static SEARCH_USERS: Lazy<ToolDefinition> = Lazy::new(|| {
    ToolDefinition::new(
        "searchUsers",
        "Search for users by display name, email, etc. in Microsoft Entra ID tenant",
        vec![
            ParamSpec::required("query", ParamType::String, "Search query string"),
            ParamSpec::optional(
                "top",
                ParamType::Integer,
                "Number of users to retrieve (maximum 999)",
            ),
        ],
    )
});

pub struct SearchUsersTool {
    client: Arc<dyn DirectoryClient>,
}

impl SearchUsersTool {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchUsersTool {
    fn definition(&self) -> &ToolDefinition {
        &SEARCH_USERS
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let query = args.require_str("query")?;

        // $search is only honoured with eventual consistency
        let mut request = DirectoryRequest::new("/users")
            .query("$search", format!("\"{}\"", query.replace('"', "")))
            .header("ConsistencyLevel", "eventual");
        if let Some(top) = effective_top(&args, 10)? {
            request = request.query("$top", top.to_string());
        }
        let request = request.query("$select", DEFAULT_USER_SELECT);

        self.client.call(request).await
    }
}
