// Rendered page handlers, one per rendering strategy
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::models::render::ClientShell;
use crate::models::RenderStrategy;
use crate::proxy::render::{self, RenderError};
use crate::proxy::server::AppState;

/// Response header reporting how the render cache answered
pub const CACHE_STATUS_HEADER: &str = "x-edge-cache";

async fn render_response(state: &AppState, strategy: RenderStrategy, id: &str) -> Response {
    match render::render_route(state, strategy, id).await {
        Ok((document, status)) => {
            let mut response = Json(document.as_ref()).into_response();
            response.headers_mut().insert(
                CACHE_STATUS_HEADER,
                HeaderValue::from_static(status.as_str()),
            );
            if strategy == RenderStrategy::Ssr {
                response
                    .headers_mut()
                    .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            }
            response
        }
        Err(RenderError::NotFound(strategy)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("{} Page not found", strategy.label()) })),
        )
            .into_response(),
        Err(RenderError::Upstream(e)) => {
            tracing::error!("Error fetching {} data for {}: {}", strategy.label(), id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Failed to render {} page", strategy.label()) })),
            )
                .into_response()
        }
    }
}

/// GET /ssr_page/:id
pub async fn handle_ssr_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    render_response(&state, RenderStrategy::Ssr, &id).await
}

/// GET /ssg_page/:id
pub async fn handle_ssg_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    render_response(&state, RenderStrategy::Ssg, &id).await
}

/// GET /isr_page/:id
pub async fn handle_isr_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    render_response(&state, RenderStrategy::Isr, &id).await
}

/// GET /csr_page/:id
///
/// No server-side fetch; the client loads through the proxy.
pub async fn handle_csr_page(Path(id): Path<String>) -> impl IntoResponse {
    Json(ClientShell {
        mode: RenderStrategy::Csr,
        page_url: format!("/api/proxy/items/pages/{}", id),
        blocks_url: format!("/api/proxy/items/page_blocks?filter[page][_eq]={}", id),
        id,
    })
}
