//! Ordered-format date parsing shared by the adapters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

/// Try each format in order. Formats without a time component get midnight.
pub fn parse_event_time(raw: &str, formats: &[&str]) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

/// Parse with fall-back to now. Policy: an event with a slightly wrong
/// timestamp beats a dropped event, so unparseable dates degrade to the
/// moment of discovery rather than killing the record.
pub fn parse_or_now(source_id: &str, native_id: &str, raw: &str, formats: &[&str]) -> DateTime<Utc> {
    match parse_event_time(raw, formats) {
        Some(ts) => ts,
        None => {
            debug!(
                source_id,
                native_id,
                raw,
                "Unparseable date, falling back to discovery time"
            );
            Utc::now()
        }
    }
}
