//! ModelScope MCP square.
//!
//! Operational URLs are per-user and already carry their auth, so no
//! header is injected.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{array_at, first_non_blank, native_id, non_blank, normalize_items, nullable};
use super::{ProviderAdapter, ProviderHttp, RawListing};
use crate::domain::{Endpoint, ProviderKey, ServerRecord, TransportType};
use crate::error::ProviderError;

const LISTING_PATH: &str = "/api/v1/mcp/services/operational";
const DETAIL_URL: &str = "https://www.modelscope.cn/mcp/servers";

#[derive(Debug, Deserialize)]
struct ModelScopeServer {
    id: Option<Value>,
    name: Option<String>,
    chinese_name: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    operational_urls: Vec<OperationalUrl>,
    url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    tags: Vec<String>,
    logo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationalUrl {
    url: Option<String>,
}

pub struct ModelScopeAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl ModelScopeAdapter {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn to_record(server: ModelScopeServer) -> Option<ServerRecord> {
        let id = native_id(&server.id)?;
        let url = first_non_blank(&[
            server
                .operational_urls
                .first()
                .and_then(|u| u.url.as_deref()),
            server.url.as_deref(),
        ])?
        .to_string();

        let name = first_non_blank(&[server.chinese_name.as_deref(), server.name.as_deref()])
            .unwrap_or(&id)
            .to_string();

        let transport = TransportType::infer_from_url(&url);
        let mut record =
            ServerRecord::discovered(ProviderKey::ModelScope, &id, name, transport, Endpoint::remote(url))
                .with_provider_url(format!("{}/{}", DETAIL_URL, id))
                .with_tags(server.tags);
        record.description = non_blank(server.description);
        record.logo_url = non_blank(server.logo_url);
        Some(record)
    }
}

#[async_trait]
impl ProviderAdapter for ModelScopeAdapter {
    fn key(&self) -> ProviderKey {
        ProviderKey::ModelScope
    }

    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError> {
        let token = self.http.ensure_token(token)?;
        let url = format!("{}{}", self.base_url, LISTING_PATH);
        info!("[ModelScope] Fetching operational servers from {}", url);

        let body = self
            .http
            .send_json(self.http.client().get(&url).bearer_auth(token))
            .await?;

        if body.get("Success").and_then(Value::as_bool) == Some(false) {
            let message = body
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            return Err(ProviderError::transient(self.key(), message));
        }

        let items = array_at(&body, &["Data", "Result"]).unwrap_or_default();
        Ok(RawListing::new(self.key(), items, token))
    }

    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord> {
        normalize_items(listing, Self::to_record)
    }
}
