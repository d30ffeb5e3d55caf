//! Admin JSON API for managing event records.
//!
//! Bears the same fail-closed policy as the invalidation endpoint: without a
//! configured admin token every request is rejected. Handlers return once the
//! record store has committed; cache revalidation runs behind them through
//! the change notifier and never affects these responses.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;
use uuid::Uuid;

use crate::application::error::{AppError, ErrorBody};
use crate::application::events::{EventService, NewEvent};
use crate::domain::entities::{EventPatch, EventRecord};
use crate::util::time::format_rfc3339;

use super::auth::{bearer_token, normalize_token, token_matches};

const ADMIN_LIST_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct AdminState {
    pub events: Arc<EventService>,
    token: Option<Arc<str>>,
}

impl AdminState {
    pub fn new(events: Arc<EventService>, token: Option<String>) -> Self {
        Self {
            events,
            token: normalize_token(token),
        }
    }
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/api/events", get(list_events).post(create_event))
        .route(
            "/admin/api/events/{id}",
            put(update_event).delete(delete_event),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}

async fn admin_auth(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(secret) = state.token.as_deref() else {
        warn!("admin request rejected: no admin token configured");
        return unauthorized();
    };

    match bearer_token(request.headers()) {
        Some(presented) if token_matches(secret, presented) => next.run(request).await,
        _ => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("Unauthorized")),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateEventBody {
    pub title: String,
    pub venue: String,
    pub city: String,
    /// RFC 3339, e.g. `2026-09-01T20:00:00Z`.
    pub starts_at: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateEventBody {
    pub title: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub starts_at: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventBody {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub venue: String,
    pub city: String,
    pub starts_at: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<EventRecord> for EventBody {
    fn from(record: EventRecord) -> Self {
        Self {
            id: record.id,
            slug: record.slug,
            title: record.title,
            venue: record.venue,
            city: record.city,
            starts_at: format_rfc3339(record.starts_at),
            description: record.description,
            created_at: format_rfc3339(record.created_at),
            updated_at: format_rfc3339(record.updated_at),
        }
    }
}

fn parse_starts_at(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| AppError::validation(format!("invalid starts_at: {err}")))
}

async fn create_event(
    State(state): State<AdminState>,
    Json(body): Json<CreateEventBody>,
) -> Result<(StatusCode, Json<EventBody>), AppError> {
    let record = state
        .events
        .create(NewEvent {
            title: body.title,
            venue: body.venue,
            city: body.city,
            starts_at: parse_starts_at(&body.starts_at)?,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(EventBody::from(record))))
}

async fn list_events(State(state): State<AdminState>) -> Result<Json<Vec<EventBody>>, AppError> {
    let records = state.events.list(ADMIN_LIST_LIMIT).await?;
    Ok(Json(records.into_iter().map(EventBody::from).collect()))
}

async fn update_event(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEventBody>,
) -> Result<Json<EventBody>, AppError> {
    let starts_at = body.starts_at.as_deref().map(parse_starts_at).transpose()?;
    let record = state
        .events
        .update(
            id,
            EventPatch {
                title: body.title,
                venue: body.venue,
                city: body.city,
                starts_at,
                description: body.description,
            },
        )
        .await?;
    Ok(Json(EventBody::from(record)))
}

async fn delete_event(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventBody>, AppError> {
    let record = state.events.delete(id).await?;
    Ok(Json(EventBody::from(record)))
}
