//! Invalidation endpoint.
//!
//! `POST /api/revalidate` turns a change event into stale-marks against the
//! render tier: authenticate, validate, classify, mark each derived path
//! independently, acknowledge. Only total rejection (bad auth, malformed
//! body, unknown change type) produces an error status; a path that fails to
//! mark is logged and the request still acknowledges with the best-effort
//! outcome. The endpoint is stateless across requests.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::{counter, histogram};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::error::ErrorBody;
use crate::cache::StaleMarker;
use crate::infra::http::auth::{bearer_token, normalize_token, token_matches};
use crate::util::time::format_rfc3339;

use super::event::{ChangeEvent, ChangePayload};
use super::paths::affected_paths;

const METRIC_MARKED: &str = "balera_revalidate_marked_total";
const METRIC_REVALIDATE_MS: &str = "balera_revalidate_ms";

const USAGE: &str = "\
Balera invalidation endpoint.

POST /api/revalidate
  Authorization: Bearer <token>
  Body: {\"type\": \"event-created\" | \"event-updated\" | \"event-deleted\" | \"revalidate-all\",
         \"eventId\"?: string, \"eventSlug\"?: string}

Marks the page paths affected by the described change as stale so the next
request regenerates them. Mutation kinds require at least one identifier;
revalidate-all flushes the listing and home pages unconditionally.
";

/// State for the revalidation routes.
#[derive(Clone)]
pub struct RevalidateState {
    token: Option<Arc<str>>,
    marker: Arc<dyn StaleMarker>,
}

impl RevalidateState {
    pub fn new(token: Option<String>, marker: Arc<dyn StaleMarker>) -> Self {
        Self {
            token: normalize_token(token),
            marker,
        }
    }
}

/// Outcome of one accepted invalidation request.
#[derive(Debug, Clone)]
pub struct InvalidationResult {
    pub acknowledged: bool,
    pub paths_marked: Vec<String>,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
struct RevalidateResponse {
    message: String,
    paths: Vec<String>,
    timestamp: String,
}

/// Routes for the invalidation endpoint and its usage text.
pub fn revalidate_router(state: RevalidateState) -> Router {
    Router::new()
        .route("/api/revalidate", get(usage).post(revalidate))
        .with_state(state)
}

async fn usage() -> &'static str {
    USAGE
}

async fn revalidate(
    State(state): State<RevalidateState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Fail closed: without a configured secret, nothing gets through.
    let Some(secret) = state.token.as_deref() else {
        warn!("revalidation request rejected: no token configured");
        return unauthorized();
    };

    match bearer_token(&headers) {
        Some(presented) if token_matches(secret, presented) => {}
        _ => return unauthorized(),
    }

    let payload: ChangePayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "revalidation request rejected: malformed change payload");
            return bad_request(format!("malformed change payload: {err}"));
        }
    };

    let event = match ChangeEvent::try_from(payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "revalidation request rejected: invalid change event");
            return bad_request(err.to_string());
        }
    };

    let result = apply(state.marker.as_ref(), &event).await;
    let marked = result.paths_marked.len();
    (
        StatusCode::OK,
        Json(RevalidateResponse {
            message: format!("Marked {marked} path(s) stale"),
            paths: result.paths_marked,
            timestamp: format_rfc3339(result.timestamp),
        }),
    )
        .into_response()
}

/// Derive and stale-mark the affected paths for one validated event.
///
/// Paths are attempted independently; a failed mark is logged and skipped
/// so the remaining paths still get their chance.
pub async fn apply(marker: &dyn StaleMarker, event: &ChangeEvent) -> InvalidationResult {
    let started = Instant::now();
    let paths = affected_paths(event);
    let mut marked = Vec::with_capacity(paths.len());
    let mut failed = 0usize;

    for path in paths {
        match marker.mark_stale(&path).await {
            Ok(()) => {
                counter!(METRIC_MARKED).increment(1);
                marked.push(path);
            }
            Err(err) => {
                failed += 1;
                warn!(
                    change_id = %event.id,
                    path = %path,
                    error = %err,
                    "stale-mark failed; continuing with remaining paths"
                );
            }
        }
    }

    histogram!(METRIC_REVALIDATE_MS).record(started.elapsed().as_secs_f64() * 1000.0);
    info!(
        change_id = %event.id,
        kind = event.kind.wire_name(),
        marked = marked.len(),
        failed,
        "revalidation applied"
    );

    InvalidationResult {
        acknowledged: true,
        paths_marked: marked,
        timestamp: OffsetDateTime::now_utc(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("Unauthorized")),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}
