use crate::proxy::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for rolling log files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            log_dir: default_log_dir(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
