//! HTTP plumbing shared by every provider adapter.
//!
//! Classifies responses the same way for all directories:
//! 401/403 clears the vault entry and yields `Unauthorized`, anything else
//! that is not a usable JSON body yields `Transient`.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::domain::ProviderKey;
use crate::error::ProviderError;
use crate::repository::TokenVault;

/// Longest upstream error body carried into a diagnostic
const MAX_ERROR_BODY: usize = 200;

/// Build the HTTP client shared by all adapters.
pub fn build_client(config: &SyncConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.fetch_timeout)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Per-provider HTTP helper.
#[derive(Clone)]
pub struct ProviderHttp {
    provider: ProviderKey,
    client: reqwest::Client,
    vault: Arc<dyn TokenVault>,
}

impl ProviderHttp {
    pub fn new(provider: ProviderKey, client: reqwest::Client, vault: Arc<dyn TokenVault>) -> Self {
        Self {
            provider,
            client,
            vault,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Reject blank tokens before anything goes on the wire.
    pub fn ensure_token<'a>(&self, token: &'a str) -> Result<&'a str, ProviderError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ProviderError::MissingToken {
                provider: self.provider,
            });
        }
        Ok(token)
    }

    /// Send the request and decode a JSON body, classifying failures.
    pub async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let response = request.send().await.map_err(|e| {
            let detail = if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            warn!(provider = %self.provider, "[Provider] {}", detail);
            ProviderError::transient(self.provider, detail)
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_token().await;
            return Err(ProviderError::Unauthorized {
                provider: self.provider,
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_body(status, &body);
            warn!(
                provider = %self.provider,
                status = status.as_u16(),
                "[Provider] Listing request failed: {}",
                detail
            );
            return Err(ProviderError::Transient {
                provider: self.provider,
                status: Some(status.as_u16()),
                detail,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            ProviderError::transient(self.provider, format!("invalid JSON in listing: {}", e))
        })?;

        debug!(provider = %self.provider, "[Provider] Listing received");
        Ok(body)
    }

    /// A rejected token must not be retried silently on the next sync.
    async fn invalidate_token(&self) {
        info!(
            provider = %self.provider,
            "[Provider] Token rejected, clearing it from the vault"
        );
        if let Err(e) = self.vault.clear(self.provider).await {
            warn!(
                provider = %self.provider,
                error = %e,
                "[Provider] Failed to clear rejected token"
            );
        }
    }
}

fn summarize_body(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("unexpected status");
    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }
    let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("{} ({})", reason, snippet)
}
