//! LanYun MCP marketplace.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{array_at, first_non_blank, native_id, non_blank, normalize_items, nullable};
use super::{ProviderAdapter, ProviderHttp, RawListing};
use crate::domain::{Endpoint, ProviderKey, ServerRecord, TransportType};
use crate::error::ProviderError;

const LISTING_PATH: &str = "/api/mcp/user/list";
const DETAIL_URL: &str = "https://mcp.lanyun.net/#/mcp-detail";

/// LanYun reports success in-band with an HTTP-like code
const CODE_OK: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanYunServer {
    id: Option<Value>,
    name: Option<String>,
    chinese_name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    operational_urls: Vec<OperationalUrl>,
    logo_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OperationalUrl {
    url: Option<String>,
}

pub struct LanYunAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl LanYunAdapter {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn to_record(server: LanYunServer, bearer: &str) -> Option<ServerRecord> {
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
        let endpoint = Endpoint::remote(url).with_header("Authorization", bearer);

        let mut record = ServerRecord::discovered(ProviderKey::LanYun, &id, name, transport, endpoint)
            .with_provider_url(format!("{}?id={}", DETAIL_URL, id))
            .with_tags(server.tags);
        record.description = non_blank(server.description);
        record.logo_url = non_blank(server.logo_url);
        Some(record)
    }
}

#[async_trait]
impl ProviderAdapter for LanYunAdapter {
    fn key(&self) -> ProviderKey {
        ProviderKey::LanYun
    }

    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError> {
        let token = self.http.ensure_token(token)?;
        let url = format!("{}{}", self.base_url, LISTING_PATH);
        info!("[LanYun] Fetching user MCP servers from {}", url);

        let body = self
            .http
            .send_json(self.http.client().get(&url).bearer_auth(token))
            .await?;

        match body.get("code").and_then(Value::as_i64) {
            Some(CODE_OK) | None => {}
            Some(code) => {
                let message = body
                    .get("msg")
                    .or_else(|| body.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful");
                return Err(ProviderError::transient(
                    self.key(),
                    format!("code {}: {}", code, message),
                ));
            }
        }

        let items = array_at(&body, &["data", "list"]).unwrap_or_default();
        Ok(RawListing::new(self.key(), items, token))
    }

    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord> {
        let bearer = listing.bearer();
        normalize_items(listing, |server| Self::to_record(server, &bearer))
    }
}
