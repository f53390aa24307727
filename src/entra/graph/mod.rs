// SPDX-License-Identifier: MIT

//! Microsoft Graph access - token acquisition and the request adapter

pub mod client;
pub mod credential;

pub use client::GraphClient;
pub use credential::{AccessToken, ClientSecretCredential, CredentialProvider};

use crate::mcp::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One outbound directory request: a path, ordered query pairs and extra headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl DirectoryRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append the pair only when the value is present and non-empty
    pub fn query_opt(self, key: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.query(key, v),
            _ => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `path?k=v&...` in insertion order, unencoded
    pub fn request_line(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let pairs: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.path, pairs.join("&"))
    }
}

/// Issues one directory request and decodes the JSON body.
///
/// Implementations resolve credentials per call and never cache responses.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn call(&self, request: DirectoryRequest) -> Result<Value>;
}
