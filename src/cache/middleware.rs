//! Page cache middleware.
//!
//! Serves GET requests from the page cache and stores successful responses.
//! Mounted only on the routes whose output is identical for every viewer.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{
    keys::PageKey,
    store::{CachedResponse, PageCache},
};

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<Arc<PageCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config().enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::from_uri(request.uri());

    if let Some(cached) = cache.get(&key) {
        debug!(cache = "page", outcome = "hit", key = %key, "serving cached page");
        return build_response(cached);
    }

    debug!(cache = "page", outcome = "miss", key = %key, "rendering page");
    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let limit = cache.config().body_limit_bytes;
    let (parts, body) = response.into_parts();
    if body.size_hint().lower() > limit as u64 {
        debug!(cache = "page", outcome = "oversized", key = %key, limit, "page not cached");
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "page", key = %key, error = %err, "page body could not be buffered");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if bytes.len() > limit {
        debug!(cache = "page", outcome = "oversized", key = %key, limit, "page not cached");
        return Response::from_parts(parts, Body::from(bytes));
    }

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter(|(name, _)| *name != header::SET_COOKIE)
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.put(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{ManualClock, PageCacheConfig};

    fn counting_router(cache: Arc<PageCache>, status: StatusCode) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new()
            .route(
                "/",
                get(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        (status, format!("render {n}"))
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(cache, page_cache_layer));
        (router, calls)
    }

    async fn body_of(router: &Router, uri: &str) -> String {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn cache(clock: Arc<ManualClock>) -> Arc<PageCache> {
        Arc::new(PageCache::new(
            PageCacheConfig {
                ttl: Duration::from_secs(20),
                ..Default::default()
            },
            clock,
        ))
    }

    #[tokio::test]
    async fn repeated_get_is_served_from_cache() {
        let clock = Arc::new(ManualClock::new());
        let (router, calls) = counting_router(cache(clock.clone()), StatusCode::OK);

        assert_eq!(body_of(&router, "/").await, "render 1");
        assert_eq!(body_of(&router, "/").await, "render 1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(20));
        assert_eq!(body_of(&router, "/").await, "render 2");
    }

    #[tokio::test]
    async fn query_string_gets_its_own_entry() {
        let clock = Arc::new(ManualClock::new());
        let (router, calls) = counting_router(cache(clock), StatusCode::OK);

        assert_eq!(body_of(&router, "/?page=1").await, "render 1");
        assert_eq!(body_of(&router, "/?page=2").await, "render 2");
        assert_eq!(body_of(&router, "/?page=1").await, "render 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_ok_responses_are_not_stored() {
        let clock = Arc::new(ManualClock::new());
        let page_cache = cache(clock);
        let (router, calls) = counting_router(page_cache.clone(), StatusCode::NOT_FOUND);

        body_of(&router, "/").await;
        body_of(&router, "/").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(page_cache.is_empty());
    }

    #[tokio::test]
    async fn oversized_page_is_served_but_not_stored() {
        let page_cache = Arc::new(PageCache::new(
            PageCacheConfig {
                body_limit_bytes: 4,
                ..Default::default()
            },
            Arc::new(ManualClock::new()),
        ));
        let (router, calls) = counting_router(page_cache.clone(), StatusCode::OK);

        assert_eq!(body_of(&router, "/").await, "render 1");
        assert_eq!(body_of(&router, "/").await, "render 2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(page_cache.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_passes_through() {
        let page_cache = Arc::new(PageCache::new(
            PageCacheConfig {
                enabled: false,
                ..Default::default()
            },
            Arc::new(ManualClock::new()),
        ));
        let (router, calls) = counting_router(page_cache, StatusCode::OK);

        body_of(&router, "/").await;
        body_of(&router, "/").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
