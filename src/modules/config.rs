use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

/// Environment variable pointing at an optional JSON config file
pub const CONFIG_FILE_ENV: &str = "EDGE_CONFIG";

/// Load application config: JSON file (if `EDGE_CONFIG` is set) overlaid by process environment
pub fn load_app_config() -> AppResult<AppConfig> {
    let lookup = |key: &str| std::env::var(key).ok();
    load_app_config_with(lookup)
}

/// Same as [`load_app_config`] with an injectable variable lookup
pub fn load_app_config_with<F>(lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_FILE_ENV) {
        Some(path) => load_config_file(Path::new(&path))?,
        None => AppConfig::new(),
    };
    apply_env_overrides(&mut config, &lookup)?;
    validate(&config)?;

    tracing::info!(
        upstream = %config.proxy.upstream_base(),
        port = config.proxy.port,
        lan = config.proxy.allow_lan_access,
        timeout_secs = ?config.proxy.request_timeout,
        secret_configured = config.proxy.revalidate_secret.is_some(),
        "configuration loaded"
    );

    Ok(config)
}

fn load_config_file(path: &Path) -> AppResult<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: &F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let proxy = &mut config.proxy;

    if let Some(url) = lookup("DIRECTUS_URL").filter(|v| !v.is_empty()) {
        proxy.upstream_url = url;
    }
    if let Some(token) = lookup("DIRECTUS_TOKEN") {
        proxy.upstream_token = token;
    }
    if let Some(secret) = lookup("REVALIDATE_SECRET") {
        proxy.revalidate_secret = Some(secret);
    }
    if let Some(port) = lookup("EDGE_PORT") {
        proxy.port = port
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid EDGE_PORT: {}", port)))?;
    }
    if let Some(lan) = lookup("EDGE_ALLOW_LAN") {
        proxy.allow_lan_access = parse_bool("EDGE_ALLOW_LAN", &lan)?;
    }
    if let Some(timeout) = lookup("EDGE_UPSTREAM_TIMEOUT_SECS") {
        let secs = timeout.parse().map_err(|_| {
            AppError::Config(format!("Invalid EDGE_UPSTREAM_TIMEOUT_SECS: {}", timeout))
        })?;
        proxy.request_timeout = Some(secs);
    }
    if let Some(url) = lookup("EDGE_UPSTREAM_PROXY").filter(|v| !v.is_empty()) {
        proxy.upstream_proxy.enabled = true;
        proxy.upstream_proxy.url = url;
    }
    if let Some(dir) = lookup("EDGE_STATIC_DIR").filter(|v| !v.is_empty()) {
        proxy.static_dir = Some(PathBuf::from(dir));
    }
    if let Some(prerender) = lookup("EDGE_PRERENDER") {
        proxy.prerender_on_start = parse_bool("EDGE_PRERENDER", &prerender)?;
    }
    if let Some(dir) = lookup("EDGE_LOG_DIR").filter(|v| !v.is_empty()) {
        config.log_dir = dir;
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!("Invalid {}: {}", key, other))),
    }
}

fn validate(config: &AppConfig) -> AppResult<()> {
    let base = url::Url::parse(config.proxy.upstream_base()).map_err(|e| {
        AppError::Config(format!(
            "Invalid DIRECTUS_URL {}: {}",
            config.proxy.upstream_url, e
        ))
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "DIRECTUS_URL must be http(s), got {}",
            base.scheme()
        )));
    }
    if config.proxy.upstream_token.is_empty() {
        tracing::warn!("DIRECTUS_TOKEN is empty, upstream requests will send an empty bearer");
    }
    Ok(())
}
