//! Change notifier: best-effort delivery of change events.
//!
//! One event is produced per committed mutation and pushed onto a bounded
//! queue; a detached dispatcher task delivers them over HTTP. The queue is
//! the structural guarantee that notification can never block or fail the
//! mutation path: `notify` only ever does a non-blocking send. Delivery
//! failures (timeout, refused connection, non-2xx) are logged and dropped —
//! the render cache's freshness window bounds the resulting staleness.

use std::time::Instant;

use metrics::{counter, histogram};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::domain::entities::EventRecord;

use super::config::RevalidationConfig;
use super::event::{ChangeEvent, Operation};

const METRIC_NOTIFY_DROPPED: &str = "balera_notify_dropped_total";
const METRIC_NOTIFY_MS: &str = "balera_notify_ms";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build notifier http client: {0}")]
    Client(String),
}

/// Handle for publishing change events after record mutations.
pub struct ChangeNotifier {
    tx: Option<mpsc::Sender<ChangeEvent>>,
}

impl ChangeNotifier {
    /// Build a notifier from configuration, spawning the dispatcher task.
    ///
    /// Without a configured token the notifier is disabled: it never calls
    /// the endpoint unauthenticated, and each skipped notification is logged.
    pub fn from_config(config: &RevalidationConfig) -> Result<Self, NotifyError> {
        let Some(token) = config.token.clone() else {
            warn!("revalidation token not configured; change notifications disabled");
            return Ok(Self::disabled());
        };

        let client = Client::builder()
            .user_agent(concat!("balera/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| NotifyError::Client(err.to_string()))?;

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_dispatcher(
            rx,
            client,
            config.endpoint_url.clone(),
            token,
        ));

        Ok(Self { tx: Some(tx) })
    }

    /// A notifier that drops every event. Used when no token is configured
    /// and in tests that must not perform network calls.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    #[cfg(test)]
    pub(crate) fn with_sender(tx: mpsc::Sender<ChangeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Publish the change event for a committed mutation.
    ///
    /// Infallible from the caller's perspective: the mutation has already
    /// committed, so every failure mode here ends in a log line, not an error.
    pub fn notify(&self, record: &EventRecord, op: Operation) {
        self.dispatch(ChangeEvent::for_record(op, record));
    }

    fn dispatch(&self, event: ChangeEvent) {
        let Some(tx) = &self.tx else {
            warn!(
                kind = event.kind.wire_name(),
                "change notification skipped: no revalidation token configured"
            );
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                counter!(METRIC_NOTIFY_DROPPED).increment(1);
                warn!(
                    change_id = %event.id,
                    kind = event.kind.wire_name(),
                    "outbound queue full; change event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                counter!(METRIC_NOTIFY_DROPPED).increment(1);
                warn!(
                    change_id = %event.id,
                    kind = event.kind.wire_name(),
                    "dispatcher stopped; change event dropped"
                );
            }
        }
    }
}

async fn run_dispatcher(
    mut rx: mpsc::Receiver<ChangeEvent>,
    client: Client,
    endpoint: Url,
    token: String,
) {
    while let Some(event) = rx.recv().await {
        deliver(&client, &endpoint, &token, &event).await;
    }
}

/// One delivery attempt per event: bounded by the client timeout, logged
/// either way, never retried.
async fn deliver(client: &Client, endpoint: &Url, token: &str, event: &ChangeEvent) {
    let started = Instant::now();
    let outcome = client
        .post(endpoint.clone())
        .bearer_auth(token)
        .json(&event.payload())
        .send()
        .await;
    histogram!(METRIC_NOTIFY_MS).record(started.elapsed().as_secs_f64() * 1000.0);

    match outcome {
        Ok(response) if response.status().is_success() => {
            debug!(
                change_id = %event.id,
                kind = event.kind.wire_name(),
                status = %response.status(),
                "change event delivered"
            );
        }
        Ok(response) => {
            warn!(
                change_id = %event.id,
                kind = event.kind.wire_name(),
                status = %response.status(),
                "invalidation endpoint rejected change event"
            );
        }
        Err(err) => {
            warn!(
                change_id = %event.id,
                kind = event.kind.wire_name(),
                error = %err,
                "failed to reach invalidation endpoint"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::revalidate::event::ChangeKind;

    fn sample_record() -> EventRecord {
        let now = OffsetDateTime::now_utc();
        EventRecord {
            id: Uuid::new_v4(),
            slug: "salsa-night".to_string(),
            title: "Salsa Night".to_string(),
            venue: "Rialto".to_string(),
            city: "Montreal".to_string(),
            starts_at: now,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn disabled_notifier_swallows_events() {
        let notifier = ChangeNotifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.notify(&sample_record(), Operation::Create);
    }

    #[tokio::test]
    async fn notify_builds_one_event_per_mutation() {
        let (tx, mut rx) = mpsc::channel(8);
        let notifier = ChangeNotifier::with_sender(tx);
        let record = sample_record();

        notifier.notify(&record, Operation::Create);
        notifier.notify(&record, Operation::Delete);

        let created = rx.try_recv().expect("first event");
        assert_eq!(created.kind, ChangeKind::Created);
        assert_eq!(created.event_id.as_deref(), Some(record.id.to_string().as_str()));
        assert_eq!(created.event_slug.as_deref(), Some("salsa-night"));

        let deleted = rx.try_recv().expect("second event");
        assert_eq!(deleted.kind, ChangeKind::Deleted);
        assert_ne!(created.id, deleted.id);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ChangeNotifier::with_sender(tx);
        let record = sample_record();

        notifier.notify(&record, Operation::Update);
        notifier.notify(&record, Operation::Update);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
