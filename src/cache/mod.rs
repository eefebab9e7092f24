// cache module - invalidation surface
//
// The revalidation gateway only sees `CacheInvalidator`; the production
// implementation is `RenderCache`, which owns rendered routes and the
// tagged upstream fetches they were built from.

pub mod render_cache;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppResult;

pub use render_cache::{CachedFetch, CachedRoute, RenderCache};

/// Broad tag carried by every ISR fetch.
pub const ISR_PAGES_TAG: &str = "isr-pages";

/// Root of the ISR route family.
pub const ISR_ROOT: &str = "/isr_page";

/// Whether a path invalidation hits one page or a whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Page,
    Layout,
}

impl RenderMode {
    /// `"layout"` selects the subtree; anything else is a single page.
    pub fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("layout") => RenderMode::Layout,
            _ => RenderMode::Page,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Page => "page",
            RenderMode::Layout => "layout",
        }
    }
}

/// How far a tag invalidation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Tagged fetches and every rendered route derived from them.
    Max,
    /// Only the tagged fetch entries.
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    Path { path: String, mode: RenderMode },
    Tag { tag: String, scope: InvalidationScope },
}

impl InvalidationTarget {
    pub fn path(path: impl Into<String>, mode: RenderMode) -> Self {
        InvalidationTarget::Path {
            path: path.into(),
            mode,
        }
    }

    pub fn tag(tag: impl Into<String>, scope: InvalidationScope) -> Self {
        InvalidationTarget::Tag {
            tag: tag.into(),
            scope,
        }
    }
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, target: InvalidationTarget) -> AppResult<()>;
}

/// Normalize a route path: leading `/`, no trailing `/` except for the root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// True when `path` is `prefix` or nested below it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
