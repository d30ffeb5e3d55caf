//! Change events describing record mutations.
//!
//! A [`ChangeEvent`] is constructed fresh per mutation, transmitted once, and
//! discarded; it is never persisted or replayed. Wire payloads pass through a
//! fallible conversion so an event violating the identifier invariant cannot
//! exist past the deserialization boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::EventRecord;

/// The operation a repository performed on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Closed set of change kinds understood by the invalidation endpoint.
///
/// Unknown wire values fail deserialization and are rejected before any
/// path is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "event-created")]
    Created,
    #[serde(rename = "event-updated")]
    Updated,
    #[serde(rename = "event-deleted")]
    Deleted,
    /// Operator override: flush the derived listing pages unconditionally.
    /// Not emitted by the change notifier's normal flow.
    #[serde(rename = "revalidate-all")]
    InvalidateAll,
}

impl ChangeKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            ChangeKind::Created => "event-created",
            ChangeKind::Updated => "event-updated",
            ChangeKind::Deleted => "event-deleted",
            ChangeKind::InvalidateAll => "revalidate-all",
        }
    }
}

impl From<Operation> for ChangeKind {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Create => ChangeKind::Created,
            Operation::Update => ChangeKind::Updated,
            Operation::Delete => ChangeKind::Deleted,
        }
    }
}

/// Wire body of `POST /api/revalidate`.
///
/// `changeId` is an idempotency key carried for log correlation across the
/// notifier and the endpoint; the endpoint itself is stateless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(rename = "changeId", default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<Uuid>,
    #[serde(rename = "eventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(rename = "eventSlug", default, skip_serializing_if = "Option::is_none")]
    pub event_slug: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangeEventError {
    #[error("`{0}` requires at least one of `eventId`/`eventSlug`")]
    MissingIdentifier(&'static str),
    #[error("identifier fields must not be blank")]
    BlankIdentifier,
}

/// A validated change event.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Idempotency key, fresh per mutation (UUIDv4).
    pub id: Uuid,
    pub kind: ChangeKind,
    pub event_id: Option<String>,
    pub event_slug: Option<String>,
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    /// Construct a validated event. Every kind except `InvalidateAll`
    /// requires at least one identifier; blank identifiers are rejected.
    pub fn new(
        kind: ChangeKind,
        event_id: Option<String>,
        event_slug: Option<String>,
    ) -> Result<Self, ChangeEventError> {
        if event_id.as_deref().is_some_and(|id| id.trim().is_empty())
            || event_slug.as_deref().is_some_and(|slug| slug.trim().is_empty())
        {
            return Err(ChangeEventError::BlankIdentifier);
        }

        if kind != ChangeKind::InvalidateAll && event_id.is_none() && event_slug.is_none() {
            return Err(ChangeEventError::MissingIdentifier(kind.wire_name()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            event_id,
            event_slug,
            timestamp: OffsetDateTime::now_utc(),
        })
    }

    /// The operator override event.
    pub fn invalidate_all() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ChangeKind::InvalidateAll,
            event_id: None,
            event_slug: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Build the event for a committed record mutation. Records always carry
    /// both identifiers, so this cannot violate the invariant.
    pub fn for_record(op: Operation, record: &EventRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ChangeKind::from(op),
            event_id: Some(record.id.to_string()),
            event_slug: Some(record.slug.clone()),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// The wire representation sent by the notifier.
    pub fn payload(&self) -> ChangePayload {
        ChangePayload {
            kind: self.kind,
            change_id: Some(self.id),
            event_id: self.event_id.clone(),
            event_slug: self.event_slug.clone(),
        }
    }
}

impl TryFrom<ChangePayload> for ChangeEvent {
    type Error = ChangeEventError;

    fn try_from(payload: ChangePayload) -> Result<Self, Self::Error> {
        let mut event = Self::new(payload.kind, payload.event_id, payload.event_slug)?;
        if let Some(change_id) = payload.change_id {
            event.id = change_id;
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            ChangeKind::Created,
            ChangeKind::Updated,
            ChangeKind::Deleted,
            ChangeKind::InvalidateAll,
        ] {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.wire_name()));
            let parsed: ChangeKind = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_wire_kind_is_rejected() {
        let result = serde_json::from_str::<ChangePayload>(r#"{"type": "bogus-type"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn payload_field_names_follow_the_wire_contract() {
        let payload: ChangePayload = serde_json::from_str(
            r#"{"type": "event-created", "eventId": "42", "eventSlug": "salsa-night"}"#,
        )
        .expect("payload");

        assert_eq!(payload.kind, ChangeKind::Created);
        assert_eq!(payload.event_id.as_deref(), Some("42"));
        assert_eq!(payload.event_slug.as_deref(), Some("salsa-night"));
    }

    #[test]
    fn mutation_kinds_require_an_identifier() {
        let err = ChangeEvent::new(ChangeKind::Updated, None, None).expect_err("invariant");
        assert_eq!(err, ChangeEventError::MissingIdentifier("event-updated"));

        ChangeEvent::new(ChangeKind::Updated, Some("42".to_string()), None).expect("id suffices");
        ChangeEvent::new(ChangeKind::Updated, None, Some("salsa-night".to_string()))
            .expect("slug suffices");
    }

    #[test]
    fn invalidate_all_needs_no_identifier() {
        ChangeEvent::new(ChangeKind::InvalidateAll, None, None).expect("no identifier needed");
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        let err = ChangeEvent::new(ChangeKind::Created, Some("  ".to_string()), None)
            .expect_err("blank id");
        assert_eq!(err, ChangeEventError::BlankIdentifier);
    }

    #[test]
    fn payload_carries_the_idempotency_key() {
        let event = ChangeEvent::invalidate_all();
        let payload = event.payload();
        assert_eq!(payload.change_id, Some(event.id));

        let rebuilt = ChangeEvent::try_from(payload).expect("valid payload");
        assert_eq!(rebuilt.id, event.id);
    }

    #[test]
    fn operation_maps_to_change_kind() {
        assert_eq!(ChangeKind::from(Operation::Create), ChangeKind::Created);
        assert_eq!(ChangeKind::from(Operation::Update), ChangeKind::Updated);
        assert_eq!(ChangeKind::from(Operation::Delete), ChangeKind::Deleted);
    }
}
