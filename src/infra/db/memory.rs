//! In-memory record store.
//!
//! Backs tests and development runs without a configured database URL.
//! Mutations are atomic under a single RwLock, matching the commit-then-
//! notify contract of the Postgres store.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{EventsRepo, RepoError};
use crate::domain::entities::{EventDraft, EventPatch, EventRecord};

#[derive(Default)]
pub struct MemoryEventsRepo {
    events: RwLock<HashMap<Uuid, EventRecord>>,
}

impl MemoryEventsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventsRepo for MemoryEventsRepo {
    async fn create(&self, draft: EventDraft) -> Result<EventRecord, RepoError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);

        if events.values().any(|record| record.slug == draft.slug) {
            return Err(RepoError::DuplicateSlug { slug: draft.slug });
        }

        let now = OffsetDateTime::now_utc();
        let record = EventRecord {
            id: Uuid::new_v4(),
            slug: draft.slug,
            title: draft.title,
            venue: draft.venue,
            city: draft.city,
            starts_at: draft.starts_at,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        events.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<EventRecord, RepoError> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<EventRecord, RepoError> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|record| record.slug == slug)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, limit: u32) -> Result<Vec<EventRecord>, RepoError> {
        let mut records: Vec<EventRecord> = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.starts_at
                .cmp(&b.starts_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|record| record.slug == slug))
    }

    async fn update(&self, id: Uuid, patch: EventPatch) -> Result<EventRecord, RepoError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let record = events.get_mut(&id).ok_or(RepoError::NotFound)?;

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(venue) = patch.venue {
            record.venue = venue;
        }
        if let Some(city) = patch.city {
            record.city = city;
        }
        if let Some(starts_at) = patch.starts_at {
            record.starts_at = starts_at;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        record.updated_at = OffsetDateTime::now_utc();

        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<EventRecord, RepoError> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(RepoError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn draft(slug: &str, starts_at: OffsetDateTime) -> EventDraft {
        EventDraft {
            slug: slug.to_string(),
            title: slug.to_string(),
            venue: "Rialto".to_string(),
            city: "Montreal".to_string(),
            starts_at,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn create_and_lookup() {
        let repo = MemoryEventsRepo::new();
        let record = repo
            .create(draft("salsa-night", datetime!(2026-09-01 20:00:00 UTC)))
            .await
            .expect("create");

        assert_eq!(repo.get(record.id).await.expect("by id"), record);
        assert_eq!(repo.get_by_slug("salsa-night").await.expect("by slug"), record);
        assert!(repo.slug_exists("salsa-night").await.expect("exists"));
        assert!(!repo.slug_exists("other").await.expect("exists"));
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected() {
        let repo = MemoryEventsRepo::new();
        let starts_at = datetime!(2026-09-01 20:00:00 UTC);
        repo.create(draft("salsa-night", starts_at)).await.expect("create");

        let err = repo
            .create(draft("salsa-night", starts_at))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::DuplicateSlug { .. }));
    }

    #[tokio::test]
    async fn list_orders_by_start_time() {
        let repo = MemoryEventsRepo::new();
        repo.create(draft("later", datetime!(2026-09-02 20:00:00 UTC)))
            .await
            .expect("create");
        repo.create(draft("earlier", datetime!(2026-09-01 20:00:00 UTC)))
            .await
            .expect("create");

        let listed = repo.list(10).await.expect("list");
        let slugs: Vec<&str> = listed.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, ["earlier", "later"]);

        assert_eq!(repo.list(1).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn update_patches_fields_and_bumps_updated_at() {
        let repo = MemoryEventsRepo::new();
        let record = repo
            .create(draft("salsa-night", datetime!(2026-09-01 20:00:00 UTC)))
            .await
            .expect("create");

        let updated = repo
            .update(
                record.id,
                EventPatch {
                    venue: Some("Sala Grande".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.venue, "Sala Grande");
        assert_eq!(updated.slug, "salsa-night");
        assert!(updated.updated_at >= record.updated_at);
    }

    #[tokio::test]
    async fn delete_returns_the_removed_record() {
        let repo = MemoryEventsRepo::new();
        let record = repo
            .create(draft("salsa-night", datetime!(2026-09-01 20:00:00 UTC)))
            .await
            .expect("create");

        let removed = repo.delete(record.id).await.expect("delete");
        assert_eq!(removed, record);
        assert!(repo.is_empty());
        assert!(matches!(
            repo.delete(record.id).await,
            Err(RepoError::NotFound)
        ));
    }
}
