// Page rendering for the SSR / SSG / ISR strategies
//
// A page is its `pages` item plus the `page_blocks` filtered on it, fetched
// concurrently. SSG and ISR documents go through the render cache; SSR never
// touches it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::cache::{CachedFetch, CachedRoute, ISR_PAGES_TAG};
use crate::error::{AppError, AppResult};
use crate::models::{RenderDocument, RenderStrategy};
use crate::proxy::server::AppState;

/// ISR route revalidate interval
pub const ISR_REVALIDATE: Duration = Duration::from_secs(60);

/// ISR data fetch lifetime
pub const ISR_FETCH_TTL: Duration = Duration::from_secs(600);

const PAGES_COLLECTION: &str = "pages";
const BLOCKS_COLLECTION: &str = "page_blocks";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Stale,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Stale => "STALE",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug)]
pub enum RenderError {
    /// Page item missing (any non-2xx on the page fetch)
    NotFound(RenderStrategy),
    Upstream(AppError),
}

impl From<AppError> for RenderError {
    fn from(err: AppError) -> Self {
        RenderError::Upstream(err)
    }
}

/// Cache policy for one upstream fetch
struct FetchPolicy {
    tags: Vec<String>,
    ttl: Option<Duration>,
}

fn page_policy(strategy: RenderStrategy, id: &str) -> Option<FetchPolicy> {
    match strategy {
        RenderStrategy::Isr => Some(FetchPolicy {
            tags: vec![ISR_PAGES_TAG.to_string(), format!("isr-page-{}", id)],
            ttl: Some(ISR_FETCH_TTL),
        }),
        RenderStrategy::Ssg => Some(FetchPolicy {
            tags: Vec::new(),
            ttl: None,
        }),
        RenderStrategy::Ssr | RenderStrategy::Csr => None,
    }
}

fn blocks_policy(strategy: RenderStrategy, id: &str) -> Option<FetchPolicy> {
    match strategy {
        RenderStrategy::Isr => Some(FetchPolicy {
            tags: vec![
                ISR_PAGES_TAG.to_string(),
                "page-blocks".to_string(),
                format!("page-blocks-{}", id),
            ],
            ttl: Some(ISR_FETCH_TTL),
        }),
        RenderStrategy::Ssg => Some(FetchPolicy {
            tags: Vec::new(),
            ttl: None,
        }),
        RenderStrategy::Ssr | RenderStrategy::Csr => None,
    }
}

/// Fetch cache key; strategies keep separate entries for the same URL
fn fetch_key(strategy: RenderStrategy, url: &str) -> String {
    format!("{}:{}", strategy.label().to_lowercase(), url)
}

async fn fetch_with_policy(
    state: &AppState,
    strategy: RenderStrategy,
    id: &str,
    url: &str,
    policy: Option<&FetchPolicy>,
    since: u64,
) -> AppResult<Value> {
    let Some(policy) = policy else {
        return state.upstream.fetch_data(url).await;
    };

    let key = fetch_key(strategy, url);
    if let Some(data) = state.render_cache.get_fetch(&key).await {
        return Ok(data);
    }

    let data = state.upstream.fetch_data(url).await?;
    let entry = CachedFetch::new(data.clone(), &policy.tags, policy.ttl)
        .for_route(&strategy.page_path(id));
    state.render_cache.put_fetch(&key, entry, since).await;
    Ok(data)
}

/// Fetch page and blocks concurrently and assemble the document
///
/// `since` is the cache generation captured before the render started;
/// fetched data is only cached if nothing was invalidated since.
pub async fn load_page(
    state: &AppState,
    strategy: RenderStrategy,
    id: &str,
    since: u64,
) -> Result<RenderDocument, RenderError> {
    let page_url = state.upstream.items_url(PAGES_COLLECTION, Some(id));
    let blocks_url = state
        .upstream
        .filtered_items_url(BLOCKS_COLLECTION, "page", Some(id));
    let page_policy = page_policy(strategy, id);
    let blocks_policy = blocks_policy(strategy, id);

    let page_fut = async {
        fetch_with_policy(state, strategy, id, &page_url, page_policy.as_ref(), since)
            .await
            .map_err(|e| {
                if e.is_upstream_status() {
                    RenderError::NotFound(strategy)
                } else {
                    RenderError::Upstream(e)
                }
            })
    };
    let blocks_fut = async {
        let blocks = fetch_with_policy(
            state,
            strategy,
            id,
            &blocks_url,
            blocks_policy.as_ref(),
            since,
        )
        .await;
        match blocks {
            Err(e) if e.is_upstream_status() => {
                tracing::warn!("Blocks unavailable for {} page {}: {}", strategy.label(), id, e);
                Ok(Value::Null)
            }
            other => other.map_err(RenderError::Upstream),
        }
    };

    let (page, blocks) = tokio::try_join!(page_fut, blocks_fut)?;

    let blocks = match blocks {
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    Ok(RenderDocument {
        mode: strategy,
        page,
        blocks,
        rendered_at: crate::utils::timestamp(),
        revalidate_secs: match strategy {
            RenderStrategy::Isr => Some(ISR_REVALIDATE.as_secs()),
            _ => None,
        },
    })
}

/// Render a page, serving SSG/ISR from the route cache when fresh
pub async fn render_route(
    state: &AppState,
    strategy: RenderStrategy,
    id: &str,
) -> Result<(Arc<RenderDocument>, CacheStatus), RenderError> {
    let since = state.render_cache.generation();

    if !matches!(strategy, RenderStrategy::Ssg | RenderStrategy::Isr) {
        let document = load_page(state, strategy, id, since).await?;
        return Ok((Arc::new(document), CacheStatus::Bypass));
    }

    let path = strategy.page_path(id);
    let status = match state.render_cache.get_route(&path).await {
        Some(route) if route.is_fresh() => {
            tracing::debug!(path = %path, "route cache hit");
            return Ok((route.document, CacheStatus::Hit));
        }
        Some(_) => CacheStatus::Stale,
        None => CacheStatus::Miss,
    };

    tracing::debug!(path = %path, status = status.as_str(), "rendering route");
    let document = Arc::new(load_page(state, strategy, id, since).await?);

    let mut tags: Vec<String> = Vec::new();
    for policy in [page_policy(strategy, id), blocks_policy(strategy, id)] {
        for tag in policy.map(|p| p.tags).unwrap_or_default() {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    let revalidate = match strategy {
        RenderStrategy::Isr => Some(ISR_REVALIDATE),
        _ => None,
    };

    let route = CachedRoute {
        document: document.clone(),
        tags: tags.into(),
        rendered_at: Instant::now(),
        revalidate,
    };
    if !state.render_cache.put_route(&path, route, since).await {
        tracing::info!(path = %path, "revalidated while rendering; served uncached");
    }

    Ok((document, status))
}

/// Ids of every page in the CMS
pub async fn list_page_ids(state: &AppState) -> AppResult<Vec<String>> {
    let url = state.upstream.items_url(PAGES_COLLECTION, None);
    let data = state.upstream.fetch_data(&url).await?;

    let ids = data
        .as_array()
        .map(|pages| {
            pages
                .iter()
                .filter_map(|page| match page.get("id")? {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(ids)
}

/// Render every SSG and ISR page into the cache. Failures are logged and skipped.
pub async fn prerender_static_pages(state: &AppState) -> usize {
    let ids = match list_page_ids(state).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Error generating static params: {}", e);
            return 0;
        }
    };

    let jobs = ids.iter().flat_map(move |id| {
        [RenderStrategy::Ssg, RenderStrategy::Isr]
            .into_iter()
            .map(move |strategy| async move {
                let result = render_route(state, strategy, id).await;
                if let Err(e) = &result {
                    tracing::warn!("Prerender of {} failed: {:?}", strategy.page_path(id), e);
                }
                result.is_ok()
            })
    });

    let rendered = futures::future::join_all(jobs)
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count();

    tracing::info!(pages = ids.len(), rendered, "static pages prerendered");
    rendered
}
