//! Source API HTTP client (reqwest-based).
//!
//! Every request is a basic-authenticated GET against the configured base URL.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::models::{Collaboration, CollaborationDetail, GroupDetail, Health, Organisation};

/// Connection settings for the source API.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL (e.g., "https://sbs.example.org").
    pub url: String,

    /// Basic-auth user.
    pub user: String,

    /// Basic-auth password.
    #[serde(skip_serializing)]
    pub password: String,

    /// Identity stamped on managed organizations; defaults to the URL host.
    #[serde(default)]
    pub host: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***REDACTED***")
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    30
}

impl SourceConfig {
    /// Create a config with the default timeout.
    pub fn new(url: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            password: password.into(),
            host: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Override the source identity.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Source identity: the explicit host, or the host part of the URL.
    pub fn source_host(&self) -> SourceResult<String> {
        if let Some(host) = self.host.as_ref().filter(|h| !h.is_empty()) {
            return Ok(host.clone());
        }
        let url = url::Url::parse(&self.url)
            .map_err(|e| SourceError::InvalidConfig(format!("invalid source URL: {e}")))?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| SourceError::InvalidConfig("source URL has no host".to_string()))
    }
}

/// Client for the source API.
#[derive(Debug, Clone)]
pub struct SourceClient {
    base_url: String,
    user: String,
    password: String,
    http_client: Client,
}

impl SourceClient {
    /// Create a new client.
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| SourceError::InvalidConfig(format!("invalid source URL: {e}")))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coldap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(config: &SourceConfig, http_client: Client) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            http_client,
        }
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the source reports `UP`.
    pub async fn check_health(&self) -> SourceResult<()> {
        let health: Health = self.get("/health").await?;
        if health.is_up() {
            Ok(())
        } else {
            Err(SourceError::Unhealthy {
                status: health.status,
            })
        }
    }

    /// All organisations.
    pub async fn organisations(&self) -> SourceResult<Vec<Organisation>> {
        self.get("/api/organisations/all").await
    }

    /// All collaborations.
    pub async fn collaborations(&self) -> SourceResult<Vec<Collaboration>> {
        self.get("/api/collaborations/all").await
    }

    /// One collaboration with memberships, groups and services.
    pub async fn collaboration(&self, id: i64) -> SourceResult<CollaborationDetail> {
        self.get(&format!("/api/collaborations/{id}")).await
    }

    /// One authorisation group with its memberships.
    pub async fn group(&self, id: i64) -> SourceResult<GroupDetail> {
        self.get(&format!("/api/groups/{id}")).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> SourceResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| SourceError::ParseError(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> SourceResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::AuthError(
                format!("Authentication failed ({}): {body}", status.as_u16()),
            )),
            _ => {
                let detail = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                Err(SourceError::Status {
                    status: status.as_u16(),
                    detail,
                })
            }
        }
    }
}
