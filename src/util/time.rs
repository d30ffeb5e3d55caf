//! Timestamp formatting helpers.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// RFC 3339 rendering with a `Display` fallback for the degenerate case
/// where the well-known format cannot represent the value.
pub fn format_rfc3339(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn formats_utc_timestamps() {
        let formatted = format_rfc3339(datetime!(2026-08-06 21:30:00 UTC));
        assert_eq!(formatted, "2026-08-06T21:30:00Z");
    }
}
