// Generic proxy handler: ANY /api/proxy/*path
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::proxy::server::AppState;
use crate::proxy::upstream::ForwardRequest;

/// Route prefix stripped before forwarding
pub const PROXY_PREFIX: &str = "/api/proxy/";

/// Split an inbound URI into the upstream path (raw, still percent-encoded)
/// and query string
pub fn proxy_target(uri: &Uri) -> (String, Option<String>) {
    let path = uri
        .path()
        .strip_prefix(PROXY_PREFIX)
        .unwrap_or_default()
        .to_string();
    let query = uri.query().filter(|q| !q.is_empty()).map(str::to_string);
    (path, query)
}

pub async fn handle_proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (path, query) = proxy_target(&uri);

    let request = ForwardRequest {
        method: method.clone(),
        path,
        query,
        content_type: headers.get(header::CONTENT_TYPE).cloned(),
        body,
    };

    match state.upstream.forward(request).await {
        Ok(upstream) => {
            let content_type = upstream
                .content_type
                .unwrap_or_else(|| HeaderValue::from_static("application/json"));
            (
                upstream.status,
                [(header::CONTENT_TYPE, content_type)],
                upstream.body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Proxy error: {} {}: {}", method, uri, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Proxy request failed" })),
            )
                .into_response()
        }
    }
}
