use crate::proxy::config::UpstreamProxyConfig;
use reqwest::{Client, Proxy};
use std::time::Duration;

/// Create an HTTP client with the given timeout and outbound proxy
///
/// `timeout = None` leaves requests unbounded, matching an upstream that is
/// trusted to answer.
pub fn create_client_with_proxy(
    timeout: Option<Duration>,
    proxy_config: Option<&UpstreamProxyConfig>,
) -> Client {
    let mut builder = Client::builder().user_agent(concat!(
        "directus-edge/",
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(config) = proxy_config {
        if config.enabled && !config.url.is_empty() {
            match Proxy::all(&config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP client upstream proxy enabled: {}", config.url);
                }
                Err(e) => {
                    tracing::error!("Invalid proxy address: {}, error: {}", config.url, e);
                }
            }
        }
    }

    builder.build().unwrap_or_else(|_| Client::new())
}
