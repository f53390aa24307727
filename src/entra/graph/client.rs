// SPDX-License-Identifier: MIT

use super::credential::{ClientSecretCredential, CredentialProvider};
use super::{DirectoryClient, DirectoryRequest};
use crate::entra::config::Config;
use crate::mcp::error::{McpError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Microsoft Graph REST adapter
pub struct GraphClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: Url,
}

impl GraphClient {
    pub fn new(client: Client, credentials: Arc<dyn CredentialProvider>, base_url: Url) -> Self {
        Self {
            client,
            credentials,
            base_url,
        }
    }

    /// Build the adapter and its client-secret credential from configuration.
    ///
    /// The configured timeout applies to token and Graph requests alike.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let credentials = Arc::new(ClientSecretCredential::new(
            client.clone(),
            config.credentials.clone(),
            config.authority_host.clone(),
        ));
        Ok(Self::new(client, credentials, config.graph_base_url.clone()))
    }

    /// Append each path segment percent-encoded, so no segment can climb out
    /// of the base path
    fn url_for(&self, request: &DirectoryRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| McpError::config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(request.path.split('/').filter(|s| !s.is_empty()));
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error) -> McpError {
    if e.is_timeout() {
        McpError::backend("request timed out")
    } else {
        McpError::backend(e.to_string())
    }
}

/// Graph reports faults as `{"error": {"code": ..., "message": ...}}`
fn graph_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = error.get("message").and_then(Value::as_str);
    let code = error.get("code").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
        (None, Some(message)) => Some(message.to_string()),
        (Some(code), None) => Some(code.to_string()),
        (None, None) => None,
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn call(&self, request: DirectoryRequest) -> Result<Value> {
        let token = self.credentials.token().await?;
        let url = self.url_for(&request)?;

        log::debug!("GET {}", request.request_line());

        let mut req = self
            .client
            .get(url)
            .bearer_auth(&token.secret)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(McpError::backend(format!("malformed response: {}", e)));
            }
            Err(_) => {
                return Err(McpError::backend(format!("Graph API returned {}", status)));
            }
        };

        if !status.is_success() {
            let detail = graph_error_message(&body).unwrap_or_else(|| status.to_string());
            return Err(McpError::backend(format!(
                "Graph API error ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        Ok(body)
    }
}
