//! Timestamp helpers.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use scanflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Formats a timestamp the same way as [`iso_timestamp`].
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T12:30:05.000000+00:00");
    }

    #[test]
    fn test_iso_timestamp_parses_back() {
        let ts = iso_timestamp();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
