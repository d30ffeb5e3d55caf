//! Rendered-page cache middleware.
//!
//! Serves cached bodies for GET requests and stores freshly rendered 200
//! responses. Requests with query strings bypass the cache: stale-marks are
//! keyed by bare paths, and a query-keyed entry could never be invalidated.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::store::{CachedPage, PageCache};

const CACHE_STATUS_HEADER: &str = "x-balera-cache";

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub pages: Arc<PageCache>,
}

/// Middleware caching rendered page responses.
///
/// Only GET requests without query strings are considered, and only 200
/// responses are stored.
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }

    if request.method() != Method::GET || request.uri().query().is_some() {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();

    if let Some(page) = cache.pages.get(&path) {
        debug!(path = %path, "serving cached page");
        return cached_response(&page, "hit");
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(path = %path, error = %err, "failed to buffer response body; not caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if bytes.len() <= cache.config.max_body_bytes
        && let Some(content_type) = content_type
    {
        cache
            .pages
            .store(&path, CachedPage::new(bytes.clone(), content_type));
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    set_cache_status(&mut response, "miss");
    response
}

fn cached_response(page: &CachedPage, status: &'static str) -> Response {
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, page.content_type.clone())],
        page.body.clone(),
    )
        .into_response();
    set_cache_status(&mut response, status);
    response
}

fn set_cache_status(response: &mut Response, status: &'static str) {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, header::HeaderValue::from_static(status));
}
