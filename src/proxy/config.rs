use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8055";

/// Edge service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Allow LAN access
    /// - false: listen on 127.0.0.1 only (default)
    /// - true: listen on 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directus base URL, without trailing slash
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Static bearer token injected into every upstream request
    #[serde(default)]
    pub upstream_token: String,

    /// Shared secret for `POST /api/revalidate`. `None` rejects every call.
    #[serde(default)]
    pub revalidate_secret: Option<String>,

    /// Outbound request timeout (seconds). Unset means no timeout.
    #[serde(default)]
    pub request_timeout: Option<u64>,

    /// Outbound proxy configuration
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,

    /// Directory of built static assets served under `/static`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Render every SSG and ISR page into the cache at startup
    #[serde(default)]
    pub prerender_on_start: bool,
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    /// Proxy address (http://, https://, socks5://)
    pub url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: default_port(),
            upstream_url: default_upstream_url(),
            upstream_token: String::new(),
            revalidate_secret: None,
            request_timeout: None,
            upstream_proxy: UpstreamProxyConfig::default(),
            static_dir: None,
            prerender_on_start: false,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

impl ProxyConfig {
    /// Listen address
    /// - allow_lan_access = false: "127.0.0.1"
    /// - allow_lan_access = true: "0.0.0.0"
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Upstream base with any trailing slashes removed
    pub fn upstream_base(&self) -> &str {
        self.upstream_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }

    /// Exact-equality check against the configured secret
    pub fn secret_matches(&self, candidate: Option<&str>) -> bool {
        match (self.revalidate_secret.as_deref(), candidate) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }
}
