//! Provider directory identities

use serde::{Deserialize, Serialize};

/// External directory that publishes MCP server listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKey {
    #[serde(rename = "modelscope")]
    ModelScope,
    #[serde(rename = "tokenflux")]
    TokenFlux,
    #[serde(rename = "lanyun")]
    LanYun,
    #[serde(rename = "mcprouter")]
    McpRouter,
    #[serde(rename = "302ai")]
    Ai302,
    #[serde(rename = "bailian")]
    Bailian,
}

/// Static metadata about a provider, for presenting token prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    pub key: ProviderKey,
    pub display_name: &'static str,
    pub website: &'static str,
    /// Page where the user creates an API token
    pub token_url: &'static str,
    /// Public API host used unless configuration overrides it
    pub default_base_url: &'static str,
}

impl ProviderKey {
    /// All supported providers
    pub const ALL: [ProviderKey; 6] = [
        Self::ModelScope,
        Self::TokenFlux,
        Self::LanYun,
        Self::McpRouter,
        Self::Ai302,
        Self::Bailian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelScope => "modelscope",
            Self::TokenFlux => "tokenflux",
            Self::LanYun => "lanyun",
            Self::McpRouter => "mcprouter",
            Self::Ai302 => "302ai",
            Self::Bailian => "bailian",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    pub fn display_name(&self) -> &'static str {
        self.info().display_name
    }

    pub fn info(&self) -> ProviderInfo {
        match self {
            Self::ModelScope => ProviderInfo {
                key: *self,
                display_name: "ModelScope",
                website: "https://www.modelscope.cn/mcp",
                token_url: "https://modelscope.cn/my/myaccesstoken",
                default_base_url: "https://www.modelscope.cn",
            },
            Self::TokenFlux => ProviderInfo {
                key: *self,
                display_name: "TokenFlux",
                website: "https://tokenflux.ai",
                token_url: "https://tokenflux.ai/dashboard/api-keys",
                default_base_url: "https://tokenflux.ai",
            },
            Self::LanYun => ProviderInfo {
                key: *self,
                display_name: "LanYun",
                website: "https://mcp.lanyun.net",
                token_url: "https://maas.lanyun.net/#/system/apiKey",
                default_base_url: "https://mcp.lanyun.net",
            },
            Self::McpRouter => ProviderInfo {
                key: *self,
                display_name: "MCPRouter",
                website: "https://mcprouter.co",
                token_url: "https://mcprouter.co/settings/keys",
                default_base_url: "https://api.mcprouter.to",
            },
            Self::Ai302 => ProviderInfo {
                key: *self,
                display_name: "302.AI",
                website: "https://302.ai",
                token_url: "https://dash.302.ai/apis/list",
                default_base_url: "https://api.302.ai",
            },
            Self::Bailian => ProviderInfo {
                key: *self,
                display_name: "Bailian",
                website: "https://bailian.console.aliyun.com/?tab=mcp",
                token_url: "https://bailian.console.aliyun.com/?tab=app#/api-key",
                default_base_url: "https://dashscope.aliyuncs.com",
            },
        }
    }

    /// Registry id for a server this provider knows as `native_id`
    pub fn namespaced_id(&self, native_id: &str) -> String {
        format!("@{}/{}", self.as_str(), native_id)
    }

    /// Vault key under which this provider's token is kept
    pub fn token_key(&self) -> String {
        format!("{}_token", self.as_str())
    }

    /// Environment variable that overrides this provider's base URL
    pub fn base_url_env_var(&self) -> String {
        format!("MCPREG_{}_URL", self.as_str().to_ascii_uppercase())
    }
}

impl std::fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
            format!("unknown provider: {value} ({})", known.join("|"))
        })
    }
}
