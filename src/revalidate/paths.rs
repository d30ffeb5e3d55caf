//! Affected-path derivation.
//!
//! A pure function of the change event alone: no hidden state and no
//! dependency on what the render cache currently holds. Stale-marking an
//! uncached path downstream is a no-op, so over-approximation is safe while
//! under-approximation never is.

use super::event::{ChangeEvent, ChangeKind};

const LISTING_PATH: &str = "/events";
const ROOT_PATH: &str = "/";

/// Derive the page paths invalidated by one change event.
///
/// - `Created`/`Updated`: the slug detail path when a slug is present, the id
///   detail path when an id is present (legacy id-based links resolve
///   independently of the slug), and always the listing.
/// - `Deleted`: the listing and the home page only. The detail paths of a
///   deleted record are never marked; regenerating a page for a record that
///   no longer exists is undefined downstream.
/// - `InvalidateAll`: the listing and the home page.
pub fn affected_paths(event: &ChangeEvent) -> Vec<String> {
    match event.kind {
        ChangeKind::Created | ChangeKind::Updated => {
            let mut paths = Vec::with_capacity(3);
            if let Some(slug) = event.event_slug.as_deref() {
                paths.push(detail_path(slug));
            }
            if let Some(id) = event.event_id.as_deref() {
                let path = detail_path(id);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            paths.push(LISTING_PATH.to_string());
            paths
        }
        ChangeKind::Deleted | ChangeKind::InvalidateAll => {
            vec![LISTING_PATH.to_string(), ROOT_PATH.to_string()]
        }
    }
}

fn detail_path(key: &str) -> String {
    format!("{LISTING_PATH}/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revalidate::event::ChangeEventError;

    fn event(kind: ChangeKind, id: Option<&str>, slug: Option<&str>) -> ChangeEvent {
        ChangeEvent::new(
            kind,
            id.map(|v| v.to_string()),
            slug.map(|v| v.to_string()),
        )
        .expect("valid event")
    }

    #[test]
    fn created_with_both_identifiers() {
        let paths = affected_paths(&event(ChangeKind::Created, Some("42"), Some("salsa-night")));
        assert_eq!(paths, ["/events/salsa-night", "/events/42", "/events"]);
    }

    #[test]
    fn updated_with_id_only() {
        let paths = affected_paths(&event(ChangeKind::Updated, Some("42"), None));
        assert_eq!(paths, ["/events/42", "/events"]);
    }

    #[test]
    fn updated_with_slug_only() {
        let paths = affected_paths(&event(ChangeKind::Updated, None, Some("salsa-night")));
        assert_eq!(paths, ["/events/salsa-night", "/events"]);
    }

    #[test]
    fn deleted_never_touches_detail_paths() {
        let paths = affected_paths(&event(ChangeKind::Deleted, Some("42"), Some("salsa-night")));
        assert_eq!(paths, ["/events", "/"]);
    }

    #[test]
    fn invalidate_all_flushes_listing_and_home() {
        let paths = affected_paths(&ChangeEvent::invalidate_all());
        assert_eq!(paths, ["/events", "/"]);
    }

    #[test]
    fn identical_identifiers_do_not_duplicate_paths() {
        let paths = affected_paths(&event(ChangeKind::Created, Some("same"), Some("same")));
        assert_eq!(paths, ["/events/same", "/events"]);
    }

    /// Derivation is total and non-empty over every constructible event.
    #[test]
    fn derivation_is_total_and_deterministic() {
        let kinds = [
            ChangeKind::Created,
            ChangeKind::Updated,
            ChangeKind::Deleted,
            ChangeKind::InvalidateAll,
        ];
        let identifiers = [
            (None, None),
            (Some("42"), None),
            (None, Some("salsa-night")),
            (Some("42"), Some("salsa-night")),
        ];

        for kind in kinds {
            for (id, slug) in identifiers {
                let constructed = ChangeEvent::new(
                    kind,
                    id.map(|v| v.to_string()),
                    slug.map(|v| v.to_string()),
                );
                match constructed {
                    Ok(event) => {
                        let first = affected_paths(&event);
                        let second = affected_paths(&event);
                        assert!(!first.is_empty());
                        assert_eq!(first, second);
                    }
                    Err(err) => {
                        // The only unconstructible combination: a mutation
                        // kind with no identifier at all.
                        assert_ne!(kind, ChangeKind::InvalidateAll);
                        assert_eq!(err, ChangeEventError::MissingIdentifier(kind.wire_name()));
                    }
                }
            }
        }
    }
}
