// Route-level Cache-Control policy
use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

/// ISR route family: CDN caches 60s, may serve stale for another 120s
pub const ISR_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

/// Built static assets: content-hashed, cache for a year
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub const STATIC_PREFIX: &str = "/static";

/// Policy for a request path, if one applies
pub fn policy_for(path: &str) -> Option<&'static str> {
    if path.starts_with("/isr_page/") {
        Some(ISR_CACHE_CONTROL)
    } else if path.starts_with("/static/") {
        Some(STATIC_CACHE_CONTROL)
    } else {
        None
    }
}

pub async fn cache_control_middleware(request: Request, next: Next) -> Response {
    let policy = policy_for(request.uri().path());
    let mut response = next.run(request).await;

    if let Some(policy) = policy {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(policy));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for() {
        assert_eq!(policy_for("/isr_page/5"), Some(ISR_CACHE_CONTROL));
        assert_eq!(policy_for("/static/app.3f2a.js"), Some(STATIC_CACHE_CONTROL));
        assert_eq!(policy_for("/isr_pages/5"), None);
        assert_eq!(policy_for("/ssg_page/5"), None);
        assert_eq!(policy_for("/api/proxy/items"), None);
    }
}
