//! Event catalog application service.
//!
//! All admin mutations flow through here: the record store commits first,
//! then the change notifier hook fires on the committed record. The service
//! result reflects only the repo outcome; notification is fire-and-forget
//! and can neither fail nor delay the mutation.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{EventDraft, EventPatch, EventRecord};
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};
use crate::revalidate::{ChangeNotifier, Operation};

use super::error::AppError;
use super::repos::{EventsRepo, RepoError};

const LIST_LIMIT_MAX: u32 = 500;

/// Incoming create request, before slug derivation.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub venue: String,
    pub city: String,
    pub starts_at: OffsetDateTime,
    pub description: String,
}

pub struct EventService {
    repo: Arc<dyn EventsRepo>,
    notifier: Arc<ChangeNotifier>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventsRepo>, notifier: Arc<ChangeNotifier>) -> Self {
        Self { repo, notifier }
    }

    /// Create an event, deriving a unique slug from the title.
    pub async fn create(&self, event: NewEvent) -> Result<EventRecord, AppError> {
        let slug = generate_unique_slug_async(&event.title, |candidate| {
            let repo = self.repo.clone();
            let candidate = candidate.to_string();
            async move { Ok::<bool, RepoError>(!repo.slug_exists(&candidate).await?) }
        })
        .await
        .map_err(flatten_slug_error)?;

        let record = self
            .repo
            .create(EventDraft {
                slug,
                title: event.title,
                venue: event.venue,
                city: event.city,
                starts_at: event.starts_at,
                description: event.description,
            })
            .await?;

        self.notifier.notify(&record, Operation::Create);
        Ok(record)
    }

    /// Apply a partial update. An empty patch is a read, not a mutation, so
    /// it produces no change event.
    pub async fn update(&self, id: Uuid, patch: EventPatch) -> Result<EventRecord, AppError> {
        if patch.is_empty() {
            return Ok(self.repo.get(id).await?);
        }

        let record = self.repo.update(id, patch).await?;
        self.notifier.notify(&record, Operation::Update);
        Ok(record)
    }

    /// Delete an event; returns the removed record.
    pub async fn delete(&self, id: Uuid) -> Result<EventRecord, AppError> {
        let record = self.repo.delete(id).await?;
        self.notifier.notify(&record, Operation::Delete);
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<EventRecord, AppError> {
        Ok(self.repo.get(id).await?)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<EventRecord, AppError> {
        Ok(self.repo.get_by_slug(slug).await?)
    }

    /// Resolve a detail-page key: a UUID looks up by id, anything else by
    /// slug. Both path shapes stay valid independently.
    pub async fn find_by_key(&self, key: &str) -> Result<EventRecord, AppError> {
        match Uuid::parse_str(key) {
            Ok(id) => self.get(id).await,
            Err(_) => self.get_by_slug(key).await,
        }
    }

    pub async fn list(&self, limit: u32) -> Result<Vec<EventRecord>, AppError> {
        Ok(self.repo.list(limit.min(LIST_LIMIT_MAX)).await?)
    }
}

fn flatten_slug_error(err: SlugAsyncError<RepoError>) -> AppError {
    match err {
        SlugAsyncError::Slug(err) => AppError::from(err),
        SlugAsyncError::Predicate(err) => AppError::from(err),
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::infra::db::MemoryEventsRepo;
    use crate::revalidate::{ChangeEvent, ChangeKind};

    fn service_with_capture() -> (EventService, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let service = EventService::new(
            Arc::new(MemoryEventsRepo::new()),
            Arc::new(ChangeNotifier::with_sender(tx)),
        );
        (service, rx)
    }

    fn new_event(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            venue: "Rialto".to_string(),
            city: "Montreal".to_string(),
            starts_at: OffsetDateTime::now_utc(),
            description: "Open social".to_string(),
        }
    }

    #[tokio::test]
    async fn create_derives_unique_slugs() {
        let (service, _rx) = service_with_capture();

        let first = service.create(new_event("Salsa Night")).await.expect("create");
        let second = service.create(new_event("Salsa Night")).await.expect("create");

        assert_eq!(first.slug, "salsa-night");
        assert_eq!(second.slug, "salsa-night-2");
    }

    #[tokio::test]
    async fn mutations_emit_exactly_one_event_each() {
        let (service, mut rx) = service_with_capture();

        let record = service.create(new_event("Tango Noche")).await.expect("create");
        let created = rx.try_recv().expect("created event");
        assert_eq!(created.kind, ChangeKind::Created);
        assert_eq!(created.event_slug.as_deref(), Some("tango-noche"));

        let patch = EventPatch {
            venue: Some("Sala Grande".to_string()),
            ..Default::default()
        };
        service.update(record.id, patch).await.expect("update");
        let updated = rx.try_recv().expect("updated event");
        assert_eq!(updated.kind, ChangeKind::Updated);

        service.delete(record.id).await.expect("delete");
        let deleted = rx.try_recv().expect("deleted event");
        assert_eq!(deleted.kind, ChangeKind::Deleted);
        assert_eq!(
            deleted.event_id.as_deref(),
            Some(record.id.to_string().as_str())
        );

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_patch_is_a_read_and_emits_nothing() {
        let (service, mut rx) = service_with_capture();

        let record = service.create(new_event("Kizomba Social")).await.expect("create");
        let _ = rx.try_recv().expect("created event");

        let unchanged = service
            .update(record.id, EventPatch::default())
            .await
            .expect("no-op update");

        assert_eq!(unchanged, record);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn find_by_key_resolves_both_identifiers() {
        let (service, _rx) = service_with_capture();
        let record = service.create(new_event("Swing Ball")).await.expect("create");

        let by_id = service
            .find_by_key(&record.id.to_string())
            .await
            .expect("lookup by id");
        let by_slug = service.find_by_key("swing-ball").await.expect("lookup by slug");

        assert_eq!(by_id, record);
        assert_eq!(by_slug, record);
    }

    #[tokio::test]
    async fn delete_of_missing_record_is_not_found() {
        let (service, mut rx) = service_with_capture();

        let err = service.delete(Uuid::new_v4()).await.expect_err("missing");
        assert!(matches!(err, AppError::Repo(RepoError::NotFound)));
        assert!(rx.try_recv().is_err());
    }
}
