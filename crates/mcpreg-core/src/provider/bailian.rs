//! Alibaba Cloud Bailian (DashScope) MCP servers enabled for the account.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{array_at, first_non_blank, native_id, non_blank, normalize_items, nullable};
use super::{ProviderAdapter, ProviderHttp, RawListing};
use crate::domain::{Endpoint, ProviderKey, ServerRecord, TransportType};
use crate::error::ProviderError;

const LISTING_PATH: &str = "/api/v1/mcps/user/list?pageNo=1&pageSize=100";
const DETAIL_URL: &str = "https://bailian.console.aliyun.com/?tab=mcp#/mcp-market/detail";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BailianServer {
    id: Option<Value>,
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    transport: Option<String>,
    base_url: Option<String>,
    url: Option<String>,
    logo_url: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default, deserialize_with = "nullable")]
    tags: Vec<String>,
}

fn default_active() -> bool {
    true
}

pub struct BailianAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl BailianAdapter {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn to_record(server: BailianServer, bearer: &str) -> Option<ServerRecord> {
        if !server.active {
            return None;
        }

        let id = native_id(&server.id)?;
        let url = first_non_blank(&[server.base_url.as_deref(), server.url.as_deref()])?.to_string();
        let name = first_non_blank(&[server.name.as_deref()])
            .unwrap_or(&id)
            .to_string();

        // Bailian names the transport itself; anything unrecognised falls
        // back to inference from the URL
        let transport = server
            .transport
            .as_deref()
            .and_then(TransportType::parse)
            .filter(TransportType::is_remote)
            .unwrap_or_else(|| TransportType::infer_from_url(&url));
        let endpoint = Endpoint::remote(url).with_header("Authorization", bearer);

        let mut record = ServerRecord::discovered(ProviderKey::Bailian, &id, name, transport, endpoint)
            .with_provider_url(format!("{}/{}", DETAIL_URL, id))
            .with_tags(server.tags);
        record.description = non_blank(server.description);
        record.logo_url = non_blank(server.logo_url);
        Some(record)
    }
}

#[async_trait]
impl ProviderAdapter for BailianAdapter {
    fn key(&self) -> ProviderKey {
        ProviderKey::Bailian
    }

    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError> {
        let token = self.http.ensure_token(token)?;
        let url = format!("{}{}", self.base_url, LISTING_PATH);
        info!("[Bailian] Fetching enabled MCP servers from {}", url);

        let body = self
            .http
            .send_json(self.http.client().get(&url).bearer_auth(token))
            .await?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            return Err(ProviderError::transient(self.key(), message));
        }

        let items = array_at(&body, &["data"])
            .or_else(|| array_at(&body, &["data", "list"]))
            .unwrap_or_default();
        Ok(RawListing::new(self.key(), items, token))
    }

    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord> {
        let bearer = listing.bearer();
        normalize_items(listing, |server| Self::to_record(server, &bearer))
    }
}
