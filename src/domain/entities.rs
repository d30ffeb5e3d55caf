//! Core domain entities for the event catalog.

use time::OffsetDateTime;
use uuid::Uuid;

/// A dance event as stored in the record store.
///
/// The `slug` is derived once at creation time through [`crate::domain::slug`]
/// and stays stable across updates, so cached detail paths keyed by slug
/// remain valid for the lifetime of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub venue: String,
    pub city: String,
    pub starts_at: OffsetDateTime,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Writable fields for creating an event. The slug has already been derived
/// and uniqueness-checked by the application layer.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub slug: String,
    pub title: String,
    pub venue: String,
    pub city: String,
    pub starts_at: OffsetDateTime,
    pub description: String,
}

/// Partial update of an event. `None` fields are left untouched.
///
/// The slug is deliberately absent: it is a stable identifier.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub starts_at: Option<OffsetDateTime>,
    pub description: Option<String>,
}

impl EventPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.venue.is_none()
            && self.city.is_none()
            && self.starts_at.is_none()
            && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_is_detected() {
        assert!(EventPatch::default().is_empty());

        let patch = EventPatch {
            title: Some("Tango Noche".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
