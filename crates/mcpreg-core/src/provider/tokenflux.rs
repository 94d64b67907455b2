//! TokenFlux hosted MCP servers.
//!
//! Servers are proxied through TokenFlux itself, addressed by slug, and
//! authenticated with the same token used for the listing.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{array_at, first_non_blank, non_blank, normalize_items, nullable};
use super::{ProviderAdapter, ProviderHttp, RawListing};
use crate::domain::{Endpoint, ProviderKey, ServerRecord, TransportType};
use crate::error::ProviderError;

const LISTING_PATH: &str = "/v1/mcps?enabled=true";
const DETAIL_URL: &str = "https://tokenflux.ai/mcps";

#[derive(Debug, Deserialize)]
struct TokenFluxServer {
    name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    logo: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    categories: Vec<String>,
}

pub struct TokenFluxAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl TokenFluxAdapter {
    pub fn new(http: ProviderHttp, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn to_record(&self, server: TokenFluxServer, bearer: &str) -> Option<ServerRecord> {
        // The slug doubles as the native id and the endpoint path
        let slug = first_non_blank(&[server.name.as_deref()])?.to_string();
        let name = first_non_blank(&[server.display_name.as_deref()])
            .unwrap_or(&slug)
            .to_string();

        let endpoint = Endpoint::remote(format!("{}/v1/mcps/{}", self.base_url, slug))
            .with_header("Authorization", bearer);

        let mut record = ServerRecord::discovered(
            ProviderKey::TokenFlux,
            &slug,
            name,
            TransportType::StreamableHttp,
            endpoint,
        )
        .with_provider_url(format!("{}/{}", DETAIL_URL, slug))
        .with_tags(server.categories);
        record.description = non_blank(server.description);
        record.logo_url = non_blank(server.logo);
        Some(record)
    }
}

#[async_trait]
impl ProviderAdapter for TokenFluxAdapter {
    fn key(&self) -> ProviderKey {
        ProviderKey::TokenFlux
    }

    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError> {
        let token = self.http.ensure_token(token)?;
        let url = format!("{}{}", self.base_url, LISTING_PATH);
        info!("[TokenFlux] Fetching MCP servers from {}", url);

        let body = self
            .http
            .send_json(self.http.client().get(&url).bearer_auth(token))
            .await?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ProviderError::transient(
                self.key(),
                "listing reported success=false",
            ));
        }

        // Older deployments answer with a bare array
        let items = body
            .as_array()
            .cloned()
            .or_else(|| array_at(&body, &["data"]))
            .unwrap_or_default();
        Ok(RawListing::new(self.key(), items, token))
    }

    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord> {
        let bearer = listing.bearer();
        normalize_items(listing, |server| self.to_record(server, &bearer))
    }
}
