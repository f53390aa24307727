// SPDX-License-Identifier: MIT

//! Process-wide configuration, read once at startup

use crate::mcp::access::AccessGate;
use crate::mcp::error::{McpError, Result};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Variables whose presence marks an embedding assistant host
const TRUSTED_HOST_MARKERS: [&str; 3] =
    ["GITHUB_COPILOT_TOKEN", "CURSOR_SESSION", "CLAUDE_SESSION"];

/// App registration used for the client-credentials grant.
///
/// Fields stay optional so a partial configuration can still boot and
/// fail per call with a clear message.
#[derive(Clone, Default)]
pub struct Credentials {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
        }
    }

    /// Names of the variables that are unset or empty
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.tenant_id) {
            missing.push("TENANT_ID");
        }
        if is_blank(&self.client_id) {
            missing.push("CLIENT_ID");
        }
        if is_blank(&self.client_secret) {
            missing.push("CLIENT_SECRET");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// `(tenant, client, secret)` or a configuration error naming the gaps
    pub fn require(&self) -> Result<(&str, &str, &str)> {
        match (
            self.tenant_id.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
        ) {
            (Some(t), Some(c), Some(s)) if self.is_complete() => Ok((t, c, s)),
            _ => Err(McpError::config(format!(
                "Missing Microsoft Graph authentication credentials: {}",
                self.missing().join(", ")
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub access: AccessGate,
    pub graph_base_url: Url,
    pub authority_host: Url,
    pub timeout: Duration,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            tenant_id: lookup("TENANT_ID"),
            client_id: lookup("CLIENT_ID"),
            client_secret: lookup("CLIENT_SECRET"),
        };

        let access = if detect_trusted_host(&lookup) {
            AccessGate::trusted_host()
        } else {
            AccessGate::from_keys(&lookup("API_KEYS").unwrap_or_default())
        };

        let graph_base_url = parse_url(
            "GRAPH_BASE_URL",
            lookup("GRAPH_BASE_URL").as_deref().unwrap_or(DEFAULT_GRAPH_BASE_URL),
        )?;
        let authority_host = parse_url(
            "AUTHORITY_HOST",
            lookup("AUTHORITY_HOST").as_deref().unwrap_or(DEFAULT_AUTHORITY_HOST),
        )?;

        let timeout_secs = match lookup("GRAPH_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                McpError::config(format!(
                    "GRAPH_TIMEOUT_SECS must be a whole number, got '{}'",
                    raw
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credentials,
            access,
            graph_base_url,
            authority_host,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Log which settings are present, never their values
    pub fn log_summary(&self) {
        let state = |v: &Option<String>| if is_blank(v) { "[NOT SET]" } else { "[SET]" };
        log::info!("Loaded configuration:");
        log::info!("  TENANT_ID: {}", state(&self.credentials.tenant_id));
        log::info!("  CLIENT_ID: {}", state(&self.credentials.client_id));
        log::info!("  CLIENT_SECRET: {}", state(&self.credentials.client_secret));
        if self.access.is_trusted_host() {
            log::info!("  API_KEYS: [BYPASSED - running inside a trusted host]");
        } else {
            log::info!("  API_KEYS: {} key(s)", self.access.key_count());
        }
        log::info!("  GRAPH_BASE_URL: {}", self.graph_base_url);

        let missing = self.credentials.missing();
        if !missing.is_empty() {
            log::warn!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        if !self.access.is_trusted_host() && self.access.key_count() == 0 {
            log::warn!("API_KEYS is empty; every session will be rejected");
        }
    }
}

/// True when an embedding assistant host is signalled by the environment
pub fn detect_trusted_host<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("AI_ASSISTANT").as_deref() == Some("true") {
        return true;
    }
    TRUSTED_HOST_MARKERS
        .iter()
        .any(|marker| lookup(marker).is_some_and(|v| !v.is_empty()))
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| McpError::config(format!("{} is not a valid URL ({}): {}", name, raw, e)))
}
