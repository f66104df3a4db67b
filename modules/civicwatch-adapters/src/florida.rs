//! Florida statewide public-notice site adapter.

use serde::{Deserialize, Serialize};
use tracing::debug;

use civicwatch_common::extract::{derive_tags, extract_entities};
use civicwatch_common::{slugify, CivicEvent, Document, EventType, GeoLocation};

use crate::dates::parse_or_now;
use crate::SourceAdapter;

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%B %d, %Y"];

/// One scraped public-notice listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloridaNotice {
    #[serde(default)]
    pub notice_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub newspaper: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
}

pub struct FloridaNoticeAdapter {
    source_id: String,
}

impl Default for FloridaNoticeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FloridaNoticeAdapter {
    pub fn new() -> Self {
        Self {
            source_id: "florida-public-notices".to_string(),
        }
    }

    fn adapt_one(&self, notice: &FloridaNotice) -> Option<CivicEvent> {
        let native_id = notice
            .notice_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())?;

        let event_id = format!("{}-{}", self.source_id, slugify(native_id));
        let timestamp = parse_or_now(
            &self.source_id,
            native_id,
            notice.publication_date.as_deref().unwrap_or(""),
            DATE_FORMATS,
        );
        let title = notice
            .title
            .clone()
            .unwrap_or_else(|| format!("Public Notice {native_id}"));

        let mut event = CivicEvent::new(
            event_id.clone(),
            EventType::PublicNotice,
            self.source_id.clone(),
            timestamp,
            title,
        )
        .with_tag("public-notice");

        if let Some(content) = notice
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            event.set_description(content);
        }

        if let Some(county) = notice.county.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            event = event.with_location(GeoLocation::county_level(county));
            let slug = slugify(county);
            if slug.ends_with("-county") {
                event.add_tag(slug);
            } else {
                event.add_tag(format!("{slug}-county"));
            }
        }

        if let Some(category) = notice.category.as_deref().filter(|c| !c.trim().is_empty()) {
            event.add_tag(slugify(category));
        }
        for keyword in &notice.keywords {
            event.add_tag(slugify(keyword));
        }

        let text = match &event.description {
            Some(description) => format!("{} {}", event.title, description),
            None => event.title.clone(),
        };
        for tag in derive_tags(&text) {
            event.add_tag(tag);
        }
        for entity in extract_entities(&self.source_id, &text) {
            event.add_entity(entity);
        }

        if let Some(newspaper) = &notice.newspaper {
            event = event.with_metadata("newspaper", newspaper.clone());
        }
        if let Some(url) = &notice.detail_url {
            event = event.with_metadata("detail_url", url.clone());
        }
        if let Some(url) = &notice.pdf_url {
            event.add_document(
                Document::new(format!("{event_id}-pdf"), "Notice PDF", "pdf").with_url(url.clone()),
            );
        }

        if let Ok(serde_json::Value::Object(raw)) = serde_json::to_value(notice) {
            event = event.with_raw_data(raw);
        }

        Some(event)
    }
}

impl SourceAdapter for FloridaNoticeAdapter {
    type Record = FloridaNotice;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn adapt(&self, records: &[FloridaNotice]) -> Vec<CivicEvent> {
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            match self.adapt_one(record) {
                Some(event) => events.push(event),
                None => {
                    debug!(source_id = %self.source_id, "Skipping notice without a notice_id");
                }
            }
        }
        events
    }
}
