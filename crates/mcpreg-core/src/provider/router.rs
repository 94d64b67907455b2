//! Router-style directories (MCPRouter and 302ai).
//!
//! Both speak the same `list-servers` protocol: a POST with an empty JSON
//! object, answered by `{code: 0, data: {servers: [...]}}`. They differ only
//! in provider key and listing path.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{array_at, first_non_blank, non_blank, normalize_items, nullable};
use super::{ProviderAdapter, ProviderHttp, RawListing};
use crate::branding;
use crate::domain::{Endpoint, ProviderKey, ServerRecord, TransportType};
use crate::error::ProviderError;

const MCPROUTER_PATH: &str = "/v1/list-servers";
const AI302_PATH: &str = "/mcp/v1/list-servers";

#[derive(Debug, Deserialize)]
struct RouterServer {
    server_key: Option<String>,
    uuid: Option<String>,
    title: Option<String>,
    name: Option<String>,
    description: Option<String>,
    server_url: Option<String>,
    config_name: Option<String>,
    author_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    tags: Vec<String>,
    logo: Option<String>,
}

pub struct RouterAdapter {
    provider: ProviderKey,
    listing_path: &'static str,
    http: ProviderHttp,
    base_url: String,
}

impl RouterAdapter {
    pub fn mcprouter(http: ProviderHttp, base_url: String) -> Self {
        Self {
            provider: ProviderKey::McpRouter,
            listing_path: MCPROUTER_PATH,
            http,
            base_url,
        }
    }

    pub fn ai302(http: ProviderHttp, base_url: String) -> Self {
        Self {
            provider: ProviderKey::Ai302,
            listing_path: AI302_PATH,
            http,
            base_url,
        }
    }

    fn to_record(&self, server: RouterServer, bearer: &str) -> Option<ServerRecord> {
        let id = first_non_blank(&[server.server_key.as_deref(), server.uuid.as_deref()])?
            .to_string();
        let url = first_non_blank(&[server.server_url.as_deref()])?.to_string();
        let name = first_non_blank(&[
            server.title.as_deref(),
            server.name.as_deref(),
            server.config_name.as_deref(),
        ])
        .unwrap_or(&id)
        .to_string();

        let transport = TransportType::infer_from_url(&url);
        let endpoint = Endpoint::remote(url).with_header("Authorization", bearer);

        let mut tags = server.tags;
        if let Some(author) = non_blank(server.author_name) {
            if !tags.contains(&author) {
                tags.push(author);
            }
        }

        let mut record = ServerRecord::discovered(self.provider, &id, name, transport, endpoint)
            .with_provider_url(format!("{}/server/{}", self.provider.info().website, id))
            .with_tags(tags);
        record.description = non_blank(server.description);
        record.logo_url = non_blank(server.logo);
        Some(record)
    }
}

#[async_trait]
impl ProviderAdapter for RouterAdapter {
    fn key(&self) -> ProviderKey {
        self.provider
    }

    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError> {
        let token = self.http.ensure_token(token)?;
        let url = format!("{}{}", self.base_url, self.listing_path);
        info!(provider = %self.provider, "[Router] Listing servers from {}", url);

        let request = self
            .http
            .client()
            .post(&url)
            .bearer_auth(token)
            .header("HTTP-Referer", branding::CLIENT_REFERER)
            .header("X-Title", branding::CLIENT_TITLE)
            .json(&json!({}));
        let body = self.http.send_json(request).await?;

        match body.get("code").and_then(Value::as_i64) {
            Some(0) | None => {}
            Some(code) => {
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful");
                return Err(ProviderError::transient(
                    self.provider,
                    format!("code {}: {}", code, message),
                ));
            }
        }

        let items = array_at(&body, &["data", "servers"]).unwrap_or_default();
        Ok(RawListing::new(self.provider, items, token))
    }

    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord> {
        let bearer = listing.bearer();
        normalize_items(listing, |server| self.to_record(server, &bearer))
    }
}
