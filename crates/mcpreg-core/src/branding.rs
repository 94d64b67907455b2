//! Centralized branding constants
//!
//! All product naming comes from this module.

/// Human-readable product name
pub const DISPLAY_NAME: &str = "McpReg";

/// Short name used for directories, log files and the binary
pub const SHORT_NAME: &str = "mcpreg";

/// OS keychain service under which provider tokens are stored
pub const KEYCHAIN_SERVICE: &str = "com.mcpreg.registry";

/// Prefix for rolling log files (`mcpreg.2026-01-22.log`)
pub const LOG_PREFIX: &str = "mcpreg";

/// Sent as `X-Title` to providers that want to know who is calling
pub const CLIENT_TITLE: &str = "McpReg";

/// Sent as `HTTP-Referer` to providers that attribute traffic
pub const CLIENT_REFERER: &str = "https://github.com/mcpreg/mcpreg";

/// User agent for all outbound HTTP
pub fn user_agent() -> String {
    format!("{}/{}", DISPLAY_NAME, env!("CARGO_PKG_VERSION"))
}
