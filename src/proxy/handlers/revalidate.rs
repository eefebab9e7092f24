// Revalidation gateway: POST /api/revalidate?secret=<token>
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::{InvalidationScope, InvalidationTarget, RenderMode, ISR_PAGES_TAG, ISR_ROOT};
use crate::error::{AppError, AppResult};
use crate::proxy::server::AppState;

/// First `secret` value of the query string; later duplicates are ignored
pub fn query_secret(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == "secret")
        .map(|(_, value)| value.as_str())
}

/// Revalidation options from the request body. Every field is optional.
///
/// `path` and `tag` keep only truthy JSON values; a truthy value that is not a
/// string is kept too and rejected when the request is selected.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RevalidateRequest {
    pub path: Option<Value>,
    pub tag: Option<Value>,
    pub mode: RenderMode,
    pub revalidate_all: bool,
}

impl RevalidateRequest {
    /// Parse leniently: anything that is not a JSON object is an empty request.
    /// Empty strings count as absent and `revalidateAll` follows JSON truthiness.
    pub fn from_body(body: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return Self::default(),
        };
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        let revalidate_all = map.get("revalidateAll").is_some_and(is_truthy);
        let mode = RenderMode::from_type(map.get("type").and_then(Value::as_str));
        let mut selector = |key: &str| map.remove(key).filter(is_truthy);

        Self {
            path: selector("path"),
            tag: selector("tag"),
            mode,
            revalidate_all,
        }
    }

    /// First matching branch wins: path, tag, default broad tag, ISR subtree
    pub fn select(&self) -> AppResult<(InvalidationTarget, String)> {
        if let Some(path) = &self.path {
            let path = selector_str("path", path)?;
            return Ok((
                InvalidationTarget::path(path, self.mode),
                format!("Path revalidated: {}", path),
            ));
        }

        if let Some(tag) = &self.tag {
            let tag = selector_str("tag", tag)?;
            return Ok((
                InvalidationTarget::tag(tag, InvalidationScope::Max),
                format!("Tag revalidated: {}", tag),
            ));
        }

        if !self.revalidate_all {
            return Ok((
                InvalidationTarget::tag(ISR_PAGES_TAG, InvalidationScope::Max),
                format!("All ISR pages revalidated via tag: {}", ISR_PAGES_TAG),
            ));
        }

        Ok((
            InvalidationTarget::path(ISR_ROOT, RenderMode::Layout),
            format!("All ISR pages revalidated via path: {}", ISR_ROOT),
        ))
    }
}

fn selector_str<'a>(field: &str, value: &'a Value) -> AppResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| AppError::InvalidRequest(format!("{} must be a string, got {}", field, value)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Serialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub message: String,
    pub timestamp: String,
}

fn revalidation_failed(e: AppError) -> Response {
    tracing::error!("Revalidation error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "message": "Error during revalidation",
            "error": e.to_string(),
        })),
    )
        .into_response()
}

pub async fn handle_revalidate(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    if !state.config.secret_matches(query_secret(&query)) {
        tracing::warn!("Revalidation rejected: invalid secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid secret token" })),
        )
            .into_response();
    }

    let request = RevalidateRequest::from_body(&body);
    let (target, message) = match request.select() {
        Ok(selected) => selected,
        Err(e) => return revalidation_failed(e),
    };

    match state.invalidator.invalidate(target).await {
        Ok(()) => {
            tracing::info!("{}", message);
            Json(RevalidateResponse {
                revalidated: true,
                message,
                timestamp: crate::utils::timestamp(),
            })
            .into_response()
        }
        Err(e) => revalidation_failed(e),
    }
}
