//! Sync configuration
//!
//! Timeouts and provider endpoints. Defaults point at the providers'
//! public hosts; every value can be overridden from the environment.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::branding;
use crate::domain::ProviderKey;

/// Default per-request timeout for provider fetches
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub mod env {
    pub const FETCH_TIMEOUT_SECS: &str = "MCPREG_FETCH_TIMEOUT_SECS";
    pub const PROBE_TIMEOUT_SECS: &str = "MCPREG_PROBE_TIMEOUT_SECS";
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub fetch_timeout: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
    base_urls: HashMap<ProviderKey, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            user_agent: branding::user_agent(),
            base_urls: HashMap::new(),
        }
    }
}

impl SyncConfig {
    /// Build from `MCPREG_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (used by `from_env` and tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(timeout) = parse_secs(&lookup, env::FETCH_TIMEOUT_SECS) {
            config.fetch_timeout = timeout;
        }
        if let Some(timeout) = parse_secs(&lookup, env::PROBE_TIMEOUT_SECS) {
            config.probe_timeout = timeout;
        }

        for provider in ProviderKey::ALL {
            if let Some(url) = lookup(&provider.base_url_env_var()) {
                let url = url.trim();
                if !url.is_empty() {
                    config.base_urls.insert(provider, url.to_string());
                }
            }
        }

        config
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Point a provider at a different host (mirrors, tests)
    pub fn with_base_url(mut self, provider: ProviderKey, url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, url.into());
        self
    }

    /// Base URL for a provider, without a trailing slash
    pub fn base_url(&self, provider: ProviderKey) -> String {
        self.base_urls
            .get(&provider)
            .map(String::as_str)
            .unwrap_or(provider.info().default_base_url)
            .trim_end_matches('/')
            .to_string()
    }
}

fn parse_secs<F>(lookup: &F, name: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!("[Config] Ignoring invalid {}='{}'", name, raw);
            None
        }
    }
}
