//! Connectivity probe
//!
//! A cheap reachability check run before a server is marked active. A
//! probe never fails hard: timeouts and transport errors are an
//! unreachable verdict.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::SyncConfig;
use crate::domain::{ServerRecord, TransportType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeVerdict {
    pub reachable: bool,
    /// Why the server was judged unreachable
    pub detail: Option<String>,
}

impl ProbeVerdict {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            detail: None,
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            detail: Some(detail.into()),
        }
    }
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, record: &ServerRecord, timeout: Duration) -> ProbeVerdict;
}

/// Probe over HTTP for remote servers, `PATH` lookup for stdio ones.
pub struct HttpConnectivityProbe {
    client: reqwest::Client,
}

impl HttpConnectivityProbe {
    pub fn new(config: &SyncConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn probe_remote(&self, record: &ServerRecord, timeout: Duration) -> ProbeVerdict {
        let Some(url) = record.endpoint.base_url.as_deref() else {
            return ProbeVerdict::unreachable("no URL configured");
        };

        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in &record.endpoint.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if record.transport_type == TransportType::Sse {
            request = request.header(reqwest::header::ACCEPT, "text/event-stream");
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                // POST-only streamable endpoints answer GET with 405
                if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
                    ProbeVerdict::reachable()
                } else {
                    ProbeVerdict::unreachable(format!("HTTP {}", status.as_u16()))
                }
            }
            Err(e) if e.is_timeout() => {
                ProbeVerdict::unreachable(format!("timed out after {}s", timeout.as_secs()))
            }
            Err(e) => ProbeVerdict::unreachable(e.to_string()),
        }
    }

    fn probe_local(record: &ServerRecord) -> ProbeVerdict {
        let Some(command) = record.endpoint.command.as_deref() else {
            return ProbeVerdict::unreachable("no command configured");
        };

        match which::which(command) {
            Ok(path) => {
                debug!(server_id = %record.id, path = %path.display(), "[Probe] Command resolved");
                ProbeVerdict::reachable()
            }
            Err(_) => ProbeVerdict::unreachable(format!("command not found: {}", command)),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn probe(&self, record: &ServerRecord, timeout: Duration) -> ProbeVerdict {
        let verdict = if record.transport_type.is_remote() {
            self.probe_remote(record, timeout).await
        } else {
            Self::probe_local(record)
        };

        debug!(
            server_id = %record.id,
            reachable = verdict.reachable,
            "[Probe] Finished"
        );
        verdict
    }
}
