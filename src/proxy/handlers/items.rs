// Item read handlers: fetch one collection from Directus and return its `data`
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::proxy::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SectionsQuery {
    pub page_id: Option<String>,
}

/// GET `url`, answer with the unwrapped `data` or a 500 carrying `failure`
async fn fetch_or_500(state: &AppState, url: &str, failure: &'static str) -> Response {
    match state.upstream.fetch_data(url).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => {
            tracing::error!("API Error: {} ({})", e, url);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": failure })),
            )
                .into_response()
        }
    }
}

/// GET /api/pages
pub async fn handle_list_pages(State(state): State<AppState>) -> Response {
    let url = state.upstream.items_url("pages", None);
    fetch_or_500(&state, &url, "Failed to fetch pages").await
}

/// GET /api/pages/:id
pub async fn handle_get_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let url = state.upstream.items_url("pages", Some(&id));
    fetch_or_500(&state, &url, "Failed to fetch page").await
}

/// GET /api/ssg_pages/:id
pub async fn handle_get_ssg_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let url = state.upstream.items_url("ssg_page", Some(&id));
    fetch_or_500(&state, &url, "Failed to fetch SSG page").await
}

/// GET /api/sections?page_id=
pub async fn handle_sections(
    State(state): State<AppState>,
    Query(query): Query<SectionsQuery>,
) -> Response {
    let page_id = query.page_id.as_deref().filter(|id| !id.is_empty());
    let url = state
        .upstream
        .filtered_items_url("page_blocks", "page", page_id);
    tracing::debug!("Fetching sections from URL: {}", url);
    fetch_or_500(&state, &url, "Failed to fetch sections").await
}

/// GET /api/ssr_sections?page_id=
pub async fn handle_ssr_sections(
    State(state): State<AppState>,
    Query(query): Query<SectionsQuery>,
) -> Response {
    let page_id = query.page_id.as_deref().filter(|id| !id.is_empty());
    let url = state
        .upstream
        .filtered_items_url("ssr_section", "page_id", page_id);
    fetch_or_500(&state, &url, "Failed to fetch SSR sections").await
}
