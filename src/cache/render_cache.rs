// Render cache - in-process, backed by moka
//
// Two tiers:
// - fetches: upstream JSON keyed by request URL, each carrying cache tags,
//   an optional TTL and the route path it was fetched for.
// - routes: rendered documents keyed by route path, carrying the union of
//   their fetch tags.
//
// Every invalidation bumps a generation counter. Writers capture the
// generation before fetching and an entry is only kept if no invalidation
// ran in between, so an in-flight render cannot resurrect revalidated data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;

use super::{
    is_under, normalize_path, CacheInvalidator, InvalidationScope, InvalidationTarget, RenderMode,
};
use crate::error::AppResult;
use crate::models::RenderDocument;

/// Maximum number of cached upstream fetches.
const FETCH_CACHE_CAPACITY: u64 = 10_000;

/// Maximum number of cached rendered routes.
const ROUTE_CACHE_CAPACITY: u64 = 5_000;

#[derive(Clone, Debug)]
pub struct CachedFetch {
    pub data: Value,
    pub tags: Arc<[String]>,
    /// Normalized path of the route this fetch feeds, if any
    pub route: Option<String>,
    pub fetched_at: Instant,
    pub ttl: Option<Duration>,
}

impl CachedFetch {
    pub fn new(data: Value, tags: &[String], ttl: Option<Duration>) -> Self {
        Self {
            data,
            tags: tags.into(),
            route: None,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn for_route(mut self, path: &str) -> Self {
        self.route = Some(normalize_path(path));
        self
    }

    pub fn is_fresh(&self) -> bool {
        self.ttl.map_or(true, |ttl| self.fetched_at.elapsed() < ttl)
    }
}

#[derive(Clone, Debug)]
pub struct CachedRoute {
    pub document: Arc<RenderDocument>,
    pub tags: Arc<[String]>,
    pub rendered_at: Instant,
    /// `None` keeps the route until it is explicitly invalidated.
    pub revalidate: Option<Duration>,
}

impl CachedRoute {
    pub fn is_fresh(&self) -> bool {
        self.revalidate
            .map_or(true, |interval| self.rendered_at.elapsed() < interval)
    }
}

#[derive(Clone)]
pub struct RenderCache {
    fetches: Cache<String, CachedFetch>,
    routes: Cache<String, CachedRoute>,
    generation: Arc<AtomicU64>,
}

impl RenderCache {
    pub fn new() -> Self {
        let fetches = Cache::builder().max_capacity(FETCH_CACHE_CAPACITY).build();
        let routes = Cache::builder().max_capacity(ROUTE_CACHE_CAPACITY).build();

        tracing::info!(
            fetch_capacity = FETCH_CACHE_CAPACITY,
            route_capacity = ROUTE_CACHE_CAPACITY,
            "render cache initialized"
        );

        Self {
            fetches,
            routes,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Invalidation generation; capture before fetching, pass back on write.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fresh cached fetch for `key`, if any.
    pub async fn get_fetch(&self, key: &str) -> Option<Value> {
        let entry = self.fetches.get(key).await?;
        if entry.is_fresh() {
            tracing::debug!(key = %key, "fetch cache hit");
            Some(entry.data)
        } else {
            tracing::debug!(key = %key, "fetch cache stale");
            None
        }
    }

    /// Store a fetch read at generation `since`. Returns `false` (and keeps
    /// nothing) when an invalidation ran after `since`.
    pub async fn put_fetch(&self, key: &str, entry: CachedFetch, since: u64) -> bool {
        self.insert_since(&self.fetches, key.to_string(), entry, since)
            .await
    }

    /// Cached route at `path`, fresh or not.
    pub async fn get_route(&self, path: &str) -> Option<CachedRoute> {
        self.routes.get(&normalize_path(path)).await
    }

    /// Store a route rendered from data read at generation `since`.
    pub async fn put_route(&self, path: &str, route: CachedRoute, since: u64) -> bool {
        self.insert_since(&self.routes, normalize_path(path), route, since)
            .await
    }

    pub async fn contains_fetch(&self, key: &str) -> bool {
        self.fetches.get(key).await.is_some()
    }

    pub async fn contains_route(&self, path: &str) -> bool {
        self.get_route(path).await.is_some()
    }

    // Insert, then re-check: an invalidation that bumped the generation
    // before our check is caught here, one that bumps after it will find
    // the entry when it scans.
    async fn insert_since<V>(&self, cache: &Cache<String, V>, key: String, value: V, since: u64) -> bool
    where
        V: Clone + Send + Sync + 'static,
    {
        if self.generation() != since {
            tracing::debug!(key = %key, "invalidated during render, not cached");
            return false;
        }
        cache.insert(key.clone(), value).await;
        if self.generation() != since {
            cache.invalidate(&key).await;
            tracing::debug!(key = %key, "invalidated during render, dropped");
            return false;
        }
        true
    }

    /// Drop the route at `path` (or every route under it for `Layout`) together
    /// with the fetches made for those routes. Returns the number of routes
    /// removed.
    pub async fn invalidate_path(&self, path: &str, mode: RenderMode) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let path = normalize_path(path);
        let matches = |route: &str| match mode {
            RenderMode::Page => route == path,
            RenderMode::Layout => is_under(route, &path),
        };

        let route_keys: Vec<String> = self
            .routes
            .iter()
            .filter(|(key, _)| matches(key.as_str()))
            .map(|(key, _)| key.to_string())
            .collect();
        for key in &route_keys {
            self.routes.invalidate(key).await;
        }

        // Fetches are found by their own route path, so they go even when the
        // route entry was already evicted
        let fetch_keys: Vec<String> = self
            .fetches
            .iter()
            .filter(|(_, entry)| entry.route.as_deref().is_some_and(|r| matches(r)))
            .map(|(key, _)| key.to_string())
            .collect();
        for key in &fetch_keys {
            self.fetches.invalidate(key).await;
        }

        tracing::info!(
            path = %path,
            mode = mode.as_str(),
            routes = route_keys.len(),
            fetches = fetch_keys.len(),
            "path invalidated"
        );
        route_keys.len()
    }

    /// Drop fetches tagged `tag`; with `Max` also drop routes derived from them.
    /// Returns `(fetches, routes)` removed.
    pub async fn invalidate_tag(&self, tag: &str, scope: InvalidationScope) -> (usize, usize) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let fetch_keys: Vec<String> = self
            .fetches
            .iter()
            .filter(|(_, entry)| entry.tags.iter().any(|t| t == tag))
            .map(|(key, _)| key.to_string())
            .collect();
        for key in &fetch_keys {
            self.fetches.invalidate(key).await;
        }

        let mut route_count = 0;
        if scope == InvalidationScope::Max {
            let route_keys: Vec<String> = self
                .routes
                .iter()
                .filter(|(_, route)| route.tags.iter().any(|t| t == tag))
                .map(|(key, _)| key.to_string())
                .collect();
            for key in &route_keys {
                self.routes.invalidate(key).await;
            }
            route_count = route_keys.len();
        }

        tracing::info!(
            tag = %tag,
            scope = ?scope,
            fetches = fetch_keys.len(),
            routes = route_count,
            "tag invalidated"
        );
        (fetch_keys.len(), route_count)
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheInvalidator for RenderCache {
    async fn invalidate(&self, target: InvalidationTarget) -> AppResult<()> {
        match target {
            InvalidationTarget::Path { path, mode } => {
                self.invalidate_path(&path, mode).await;
            }
            InvalidationTarget::Tag { tag, scope } => {
                self.invalidate_tag(&tag, scope).await;
            }
        }
        Ok(())
    }
}
