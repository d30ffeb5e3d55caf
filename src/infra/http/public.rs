//! Public site routes.
//!
//! Server-rendered listing and detail pages. The rendered bodies are what
//! the page cache stores, so these handlers only run on cache misses and
//! after stale-marks.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    response::Html,
    routing::get,
};
use time::macros::format_description;

use crate::application::error::AppError;
use crate::application::events::EventService;
use crate::domain::entities::EventRecord;

const HOME_LIMIT: u32 = 5;
const LISTING_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct PublicState {
    pub events: Arc<EventService>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/events", get(listing))
        .route("/events/{key}", get(event_detail))
        .with_state(state)
}

async fn home(State(state): State<PublicState>) -> Result<Html<String>, AppError> {
    let events = state.events.list(HOME_LIMIT).await?;
    Ok(Html(render_page(
        "Balera",
        &format!(
            "<h1>Balera</h1><p>Upcoming dance events</p>{}",
            render_event_list(&events)
        ),
    )))
}

async fn listing(State(state): State<PublicState>) -> Result<Html<String>, AppError> {
    let events = state.events.list(LISTING_LIMIT).await?;
    Ok(Html(render_page(
        "Events — Balera",
        &format!("<h1>Events</h1>{}", render_event_list(&events)),
    )))
}

async fn event_detail(
    State(state): State<PublicState>,
    Path(key): Path<String>,
) -> Result<Html<String>, AppError> {
    let record = state.events.find_by_key(&key).await?;
    Ok(Html(render_page(
        &format!("{} — Balera", record.title),
        &render_event_detail(&record),
    )))
}

fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title></head><body>{body}</body></html>",
        escape(title)
    )
}

fn render_event_list(events: &[EventRecord]) -> String {
    if events.is_empty() {
        return "<p>No events scheduled.</p>".to_string();
    }

    let items: String = events
        .iter()
        .map(|event| {
            format!(
                "<li><a href=\"/events/{}\">{}</a> — {} — {}, {}</li>",
                escape(&event.slug),
                escape(&event.title),
                format_start(event),
                escape(&event.venue),
                escape(&event.city),
            )
        })
        .collect();
    format!("<ul class=\"events\">{items}</ul>")
}

fn render_event_detail(event: &EventRecord) -> String {
    format!(
        "<article><h1>{}</h1><p>{} — {}, {}</p><p>{}</p></article>",
        escape(&event.title),
        format_start(event),
        escape(&event.venue),
        escape(&event.city),
        escape(&event.description),
    )
}

fn format_start(event: &EventRecord) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    event
        .starts_at
        .format(format)
        .unwrap_or_else(|_| event.starts_at.to_string())
}

fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}
