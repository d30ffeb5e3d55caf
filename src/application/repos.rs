//! Repository abstractions over the record store.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{EventDraft, EventPatch, EventRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate slug `{slug}`")]
    DuplicateSlug { slug: String },
    #[error("database error: {message}")]
    Database { message: String },
}

impl RepoError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}

/// Durable storage for event records.
///
/// Mutations commit before the caller regains control; the change notifier
/// hook fires only on records this trait has already persisted.
#[async_trait]
pub trait EventsRepo: Send + Sync {
    async fn create(&self, draft: EventDraft) -> Result<EventRecord, RepoError>;

    async fn get(&self, id: Uuid) -> Result<EventRecord, RepoError>;

    async fn get_by_slug(&self, slug: &str) -> Result<EventRecord, RepoError>;

    /// Events ordered by start time, earliest first.
    async fn list(&self, limit: u32) -> Result<Vec<EventRecord>, RepoError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Apply a partial update; returns the post-mutation record.
    async fn update(&self, id: Uuid, patch: EventPatch) -> Result<EventRecord, RepoError>;

    /// Remove a record; returns the removed record so callers can still
    /// reference its identifiers after deletion.
    async fn delete(&self, id: Uuid) -> Result<EventRecord, RepoError>;
}
