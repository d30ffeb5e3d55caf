//! Record store implementations.
//!
//! Postgres for production; an in-memory store for tests and for running
//! without a configured database URL.

mod memory;

pub use memory::MemoryEventsRepo;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{EventsRepo, RepoError};
use crate::domain::entities::{EventDraft, EventPatch, EventRecord};

const EVENT_COLUMNS: &str =
    "id, slug, title, venue, city, starts_at, description, created_at, updated_at";

/// Postgres-backed record store.
pub struct PostgresEventsRepo {
    pool: PgPool,
}

impl PostgresEventsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    slug: String,
    title: String,
    venue: String,
    city: String,
    starts_at: OffsetDateTime,
    description: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EventRow> for EventRecord {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            venue: row.venue,
            city: row.city,
            starts_at: row.starts_at,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_db_error(err: sqlx::Error, slug: Option<&str>) -> RepoError {
    if let Some(slug) = slug
        && err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation())
    {
        return RepoError::DuplicateSlug {
            slug: slug.to_string(),
        };
    }
    RepoError::database(err.to_string())
}

#[async_trait]
impl EventsRepo for PostgresEventsRepo {
    async fn create(&self, draft: EventDraft) -> Result<EventRecord, RepoError> {
        let query = format!(
            "INSERT INTO events (id, slug, title, venue, city, starts_at, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&draft.slug)
            .bind(&draft.title)
            .bind(&draft.venue)
            .bind(&draft.city)
            .bind(draft.starts_at)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await
            .map(EventRecord::from)
            .map_err(|err| map_db_error(err, Some(&draft.slug)))
    }

    async fn get(&self, id: Uuid) -> Result<EventRecord, RepoError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))?
            .map(EventRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<EventRecord, RepoError> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))?
            .map(EventRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn list(&self, limit: u32) -> Result<Vec<EventRecord>, RepoError> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at ASC, slug ASC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, EventRow>(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))?;
        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))
    }

    async fn update(&self, id: Uuid, patch: EventPatch) -> Result<EventRecord, RepoError> {
        let query = format!(
            "UPDATE events SET \
             title = COALESCE($2, title), \
             venue = COALESCE($3, venue), \
             city = COALESCE($4, city), \
             starts_at = COALESCE($5, starts_at), \
             description = COALESCE($6, description), \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .bind(patch.title)
            .bind(patch.venue)
            .bind(patch.city)
            .bind(patch.starts_at)
            .bind(patch.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))?
            .map(EventRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<EventRecord, RepoError> {
        let query = format!("DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(err, None))?
            .map(EventRecord::from)
            .ok_or(RepoError::NotFound)
    }
}
