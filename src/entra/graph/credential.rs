// SPDX-License-Identifier: MIT

//! OAuth2 client-credentials token acquisition for Microsoft Graph

use crate::entra::config::Credentials;
use crate::mcp::error::{McpError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens this close to expiry are refreshed instead of reused
const REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Usable at `now` with the refresh margin to spare
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Resolves a bearer token for downstream calls
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<AccessToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Client-secret credential against the Microsoft identity platform.
///
/// The token is cached until it comes within five minutes of expiry; every
/// `token()` call either returns a fresh cached token or fetches a new one.
pub struct ClientSecretCredential {
    client: Client,
    credentials: Credentials,
    authority_host: Url,
    cached: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(client: Client, credentials: Credentials, authority_host: Url) -> Self {
        Self {
            client,
            credentials,
            authority_host,
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.as_str().trim_end_matches('/'),
            tenant_id
        )
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let (tenant_id, client_id, client_secret) = self.credentials.require()?;

        let resp = self
            .client
            .post(self.token_url(tenant_id))
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| McpError::backend(format!("token request failed: {}", e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| McpError::backend(format!("token request failed: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error_description")
                        .or_else(|| v.get("error"))
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| status.to_string());
            return Err(McpError::backend(format!(
                "token request rejected ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| McpError::backend(format!("malformed token response: {}", e)))?;

        log::debug!("Acquired Graph token valid for {}s", token.expires_in);
        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(token.expires_in),
        ))
    }
}

#[async_trait]
impl CredentialProvider for ClientSecretCredential {
    async fn token(&self) -> Result<AccessToken> {
        // Configuration gaps fail every call, even with a cached token
        self.credentials.require()?;

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
            log::debug!("Cached Graph token near expiry, refreshing");
        }

        let token = self.fetch().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
