// Upstream client for the Directus item API

use bytes::Bytes;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::proxy::config::ProxyConfig;

/// Request to be mirrored to the upstream
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path below the upstream base, without leading slash
    pub path: String,
    /// Raw query string, without `?`
    pub query: Option<String>,
    pub content_type: Option<header::HeaderValue>,
    pub body: Bytes,
}

/// Upstream answer, body fully read as text
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub content_type: Option<header::HeaderValue>,
    pub body: String,
}

pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        let http_client = crate::utils::http::create_client_with_proxy(
            config.request_timeout(),
            Some(&config.upstream_proxy),
        );

        Self {
            http_client,
            base_url: config.upstream_base().to_string(),
            token: config.upstream_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base + "/" + path + ("?" + query)`; an empty query adds nothing
    pub fn build_url(base: &str, path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(qs) => format!("{}/{}?{}", base, path, qs),
            None => format!("{}/{}", base, path),
        }
    }

    /// `/items/<collection>[/<id>]`
    pub fn items_url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => Self::build_url(&self.base_url, &format!("items/{}/{}", collection, id), None),
            None => Self::build_url(&self.base_url, &format!("items/{}", collection), None),
        }
    }

    /// `/items/<collection>?filter[<field>][_eq]=<value>` (no filter when `value` is `None`)
    pub fn filtered_items_url(&self, collection: &str, field: &str, value: Option<&str>) -> String {
        let query = value.map(|v| format!("filter[{}][_eq]={}", field, v));
        Self::build_url(
            &self.base_url,
            &format!("items/{}", collection),
            query.as_deref(),
        )
    }

    fn auth_header(&self) -> AppResult<header::HeaderValue> {
        header::HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| AppError::Config(format!("Invalid upstream token: {}", e)))
    }

    /// Mirror a request to the upstream
    ///
    /// The configured bearer always replaces any caller credential. Bodies
    /// travel only for verbs other than GET/HEAD. Transport errors are
    /// returned as-is; no retry.
    pub async fn forward(&self, request: ForwardRequest) -> AppResult<ForwardResponse> {
        let url = Self::build_url(&self.base_url, &request.path, request.query.as_deref());

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, self.auth_header()?);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(content_type) = request.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }

        let carries_body = request.method != Method::GET && request.method != Method::HEAD;

        tracing::debug!(
            method = %request.method,
            url = %url,
            body_bytes = if carries_body { request.body.len() } else { 0 },
            "forwarding upstream"
        );

        let mut builder = self
            .http_client
            .request(request.method, &url)
            .headers(headers);
        if carries_body {
            builder = builder.body(request.body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.text().await?;

        Ok(ForwardResponse {
            status,
            content_type,
            body,
        })
    }

    /// GET `url` and unwrap the `{ data: ... }` envelope
    pub async fn fetch_data(&self, url: &str) -> AppResult<Value> {
        let response = self
            .http_client
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header()?)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("API request failed: {} - Status: {}", url, status.as_u16());
            return Err(AppError::UpstreamStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let mut envelope: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::MalformedUpstreamBody(e.to_string()))?;

        Ok(envelope
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer) -> UpstreamClient {
        UpstreamClient::new(&ProxyConfig {
            upstream_url: server.uri(),
            upstream_token: "secret-token".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_build_url() {
        let url1 = UpstreamClient::build_url("http://cms", "items/pages", None);
        assert_eq!(url1, "http://cms/items/pages");

        let url2 = UpstreamClient::build_url("http://cms", "items/pages", Some("limit=1&sort=-id"));
        assert_eq!(url2, "http://cms/items/pages?limit=1&sort=-id");

        let url3 = UpstreamClient::build_url("http://cms", "items/pages", Some(""));
        assert_eq!(url3, "http://cms/items/pages");
    }

    #[test]
    fn test_items_urls() {
        let client = UpstreamClient::new(&ProxyConfig {
            upstream_url: "http://cms/".to_string(),
            ..Default::default()
        });
        assert_eq!(client.items_url("pages", Some("7")), "http://cms/items/pages/7");
        assert_eq!(client.items_url("pages", None), "http://cms/items/pages");
        assert_eq!(
            client.filtered_items_url("page_blocks", "page", Some("7")),
            "http://cms/items/page_blocks?filter[page][_eq]=7"
        );
        assert_eq!(
            client.filtered_items_url("ssr_section", "page_id", None),
            "http://cms/items/ssr_section"
        );
    }

    #[tokio::test]
    async fn test_forward_post_carries_body_and_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items/pages"))
            .and(query_param("fields", "*"))
            .and(header_eq("authorization", "Bearer secret-token"))
            .and(header_eq("accept", "application/json"))
            .and(header_eq("content-type", "text/plain"))
            .and(body_string("raw {not json"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("content-type", "application/vnd.api+json")
                    .set_body_raw("{\"data\":{}}", "application/vnd.api+json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .forward(ForwardRequest {
                method: Method::POST,
                path: "items/pages".to_string(),
                query: Some("fields=*".to_string()),
                content_type: Some(header::HeaderValue::from_static("text/plain")),
                body: Bytes::from_static(b"raw {not json"),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(
            response.content_type.unwrap(),
            "application/vnd.api+json"
        );
        assert_eq!(response.body, "{\"data\":{}}");
    }

    #[tokio::test]
    async fn test_forward_get_drops_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/pages/1"))
            .respond_with(|req: &Request| {
                // Echo the body length back
                ResponseTemplate::new(200).set_body_string(req.body.len().to_string())
            })
            .mount(&server)
            .await;

        let response = client_for(&server)
            .forward(ForwardRequest {
                method: Method::GET,
                path: "items/pages/1".to_string(),
                query: None,
                content_type: None,
                body: Bytes::from_static(b"should not travel"),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "0");
    }

    #[tokio::test]
    async fn test_fetch_data_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/pages/3"))
            .and(header_eq("authorization", "Bearer secret-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"id": 3, "title": "Home"}})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = client
            .fetch_data(&client.items_url("pages", Some("3")))
            .await
            .unwrap();
        assert_eq!(data["title"], "Home");
    }

    #[tokio::test]
    async fn test_fetch_data_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/items/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/items/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let missing = client
            .fetch_data(&client.items_url("missing", None))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::UpstreamStatus(404)));

        let garbled = client
            .fetch_data(&client.items_url("garbled", None))
            .await
            .unwrap_err();
        assert!(matches!(garbled, AppError::MalformedUpstreamBody(_)));
    }
}
