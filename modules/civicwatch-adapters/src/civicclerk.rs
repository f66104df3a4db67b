//! CivicClerk meeting-portal adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use civicwatch_common::extract::{derive_tags, extract_entities};
use civicwatch_common::{CivicEvent, Document, EventType, GeoLocation};

use crate::dates::{parse_event_time, parse_or_now};
use crate::SourceAdapter;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y"];

/// Raw shape of one scraped CivicClerk meeting row. Every field is optional at
/// the boundary; what the adapter requires, it checks itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicClerkMeeting {
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub agenda_url: Option<String>,
    #[serde(default)]
    pub event_url: Option<String>,
}

/// Board names are free text; these fragments become tags when present.
const BOARD_TAGS: &[&str] = &[
    "commission",
    "council",
    "planning",
    "zoning",
    "school",
    "utility",
    "airport",
    "historic",
];

pub struct CivicClerkAdapter {
    source_id: String,
    county: String,
}

impl CivicClerkAdapter {
    /// One instance per portal site, e.g. `CivicClerkAdapter::new("alachua")`
    /// produces events under `civicclerk-alachua`.
    pub fn new(site: &str) -> Self {
        Self {
            source_id: format!("civicclerk-{site}"),
            county: "Alachua".to_string(),
        }
    }

    pub fn with_county(mut self, county: &str) -> Self {
        self.county = county.to_string();
        self
    }

    fn adapt_one(&self, meeting: &CivicClerkMeeting) -> Option<CivicEvent> {
        let native_id = meeting.meeting_id.as_deref().map(str::trim)?;
        if native_id.is_empty() {
            return None;
        }

        let event_id = format!("{}-{}", self.source_id, native_id);
        let timestamp = self.parse_timestamp(meeting, native_id);
        let title = meeting
            .title
            .clone()
            .or_else(|| meeting.board.as_ref().map(|b| format!("{b} Meeting")))
            .unwrap_or_else(|| "Untitled Meeting".to_string());

        let mut event = CivicEvent::new(
            event_id.clone(),
            EventType::Meeting,
            self.source_id.clone(),
            timestamp,
            title,
        )
        .with_location(GeoLocation::county_level(self.county.clone()))
        .with_tag("meeting")
        .with_tag(format!("{}-county", self.county.to_lowercase()));

        if let Some(board) = &meeting.board {
            let board_lower = board.to_lowercase();
            for fragment in BOARD_TAGS {
                if board_lower.contains(fragment) {
                    event.add_tag(*fragment);
                }
            }
            event = event.with_metadata("board", board.clone());
        }
        if let Some(status) = &meeting.status {
            event = event.with_metadata("status", status.clone());
        }
        if let Some(url) = &meeting.event_url {
            event = event.with_metadata("event_url", url.clone());
        }

        for tag in derive_tags(&event.title) {
            event.add_tag(tag);
        }
        for entity in extract_entities(&self.source_id, &event.title) {
            event.add_entity(entity);
        }

        if let Some(url) = &meeting.agenda_url {
            event.add_document(
                Document::new(format!("{event_id}-agenda"), "Meeting Agenda", "agenda")
                    .with_url(url.clone()),
            );
        }

        if let Ok(serde_json::Value::Object(raw)) = serde_json::to_value(meeting) {
            event = event.with_raw_data(raw);
        }

        Some(event)
    }

    fn parse_timestamp(&self, meeting: &CivicClerkMeeting, native_id: &str) -> DateTime<Utc> {
        let date = meeting.date.as_deref().unwrap_or("").trim();
        match meeting.time.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(time) => {
                let combined = format!("{date} {time}");
                parse_event_time(&combined, DATE_TIME_FORMATS)
                    .or_else(|| parse_event_time(date, DATE_FORMATS))
                    .unwrap_or_else(|| {
                        parse_or_now(&self.source_id, native_id, &combined, DATE_FORMATS)
                    })
            }
            None => parse_or_now(&self.source_id, native_id, date, DATE_FORMATS),
        }
    }
}

impl SourceAdapter for CivicClerkAdapter {
    type Record = CivicClerkMeeting;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn adapt(&self, records: &[CivicClerkMeeting]) -> Vec<CivicEvent> {
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            match self.adapt_one(record) {
                Some(event) => events.push(event),
                None => {
                    debug!(
                        source_id = %self.source_id,
                        "Skipping meeting record without a meeting_id"
                    );
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn sample() -> CivicClerkMeeting {
        CivicClerkMeeting {
            meeting_id: Some("123".to_string()),
            title: Some("City Commission Meeting".to_string()),
            date: Some("2026-02-01".to_string()),
            time: Some("5:00 PM".to_string()),
            board: Some("City Commission".to_string()),
            status: Some("Scheduled".to_string()),
            agenda_url: Some("https://x/a.pdf".to_string()),
            event_url: None,
        }
    }

    #[test]
    fn adapts_meeting_with_agenda() {
        let adapter = CivicClerkAdapter::new("alachua");
        let events = adapter.adapt(&[sample()]);
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.event_id, "civicclerk-alachua-123");
        assert_eq!(event.event_type, EventType::Meeting);
        assert_eq!(event.timestamp.hour(), 17);
        assert!(event.matches_tags(&["meeting", "alachua-county", "commission"]));
        assert_eq!(event.documents.len(), 1);
        assert_eq!(event.documents[0].document_type, "agenda");
        assert_eq!(event.documents[0].url.as_deref(), Some("https://x/a.pdf"));
    }

    #[test]
    fn record_without_id_is_dropped() {
        let adapter = CivicClerkAdapter::new("alachua");
        let mut no_id = sample();
        no_id.meeting_id = None;
        let events = adapter.adapt(&[no_id, sample()]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn bad_date_falls_back_to_now() {
        let adapter = CivicClerkAdapter::new("alachua");
        let mut record = sample();
        record.date = Some("sometime soon".to_string());
        record.time = None;
        let events = adapter.adapt(&[record]);
        assert_eq!(events.len(), 1);
        assert!((Utc::now() - events[0].timestamp).num_seconds() < 5);
    }

    #[test]
    fn adapt_values_drops_malformed_input() {
        let adapter = CivicClerkAdapter::new("alachua");
        let values = vec![
            serde_json::to_value(sample()).unwrap(),
            serde_json::json!("not an object"),
        ];
        let events = adapter.adapt_values(&values);
        assert_eq!(events.len(), 1);
    }
}
