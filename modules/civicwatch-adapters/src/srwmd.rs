//! Suwannee River Water Management District permit-registry adapter.
//!
//! SRWMD publishes a lightweight notice list; per-permit detail pages carry
//! the applicant/owner/consultant and attached documents. The list scrape and
//! the detail scrape arrive separately, so this adapter has both a plain
//! `adapt` and an enrichment path that merges details into adapted events.

use serde::{Deserialize, Serialize};
use tracing::debug;

use civicwatch_common::extract::{derive_tags, extract_entities};
use civicwatch_common::{slugify, CivicEvent, Document, Entity, EntityType, EventType, GeoLocation};

use crate::dates::parse_or_now;
use crate::SourceAdapter;

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%B %d, %Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermitKind {
    Applications,
    Issuances,
}

impl PermitKind {
    fn as_str(self) -> &'static str {
        match self {
            PermitKind::Applications => "applications",
            PermitKind::Issuances => "issuances",
        }
    }

    fn event_type(self) -> EventType {
        match self {
            PermitKind::Applications => EventType::PermitApplication,
            PermitKind::Issuances => EventType::PermitIssued,
        }
    }
}

/// One row of the public notice list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrwmdNotice {
    #[serde(default)]
    pub notice_id: Option<String>,
    #[serde(default)]
    pub notice_type: Option<String>,
    #[serde(default)]
    pub permit_number: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub rule_type: Option<String>,
    #[serde(default)]
    pub permit_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub permit_url: Option<String>,
}

/// Detail-page payload joined onto a notice after the heavier per-item scrape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SrwmdPermitDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub applicant: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub consultant: Option<String>,
    #[serde(default)]
    pub documents: Vec<SrwmdDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrwmdDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
}

pub struct SrwmdPermitAdapter {
    kind: PermitKind,
    source_id: String,
}

impl SrwmdPermitAdapter {
    pub fn applications() -> Self {
        Self::new(PermitKind::Applications)
    }

    pub fn issuances() -> Self {
        Self::new(PermitKind::Issuances)
    }

    fn new(kind: PermitKind) -> Self {
        Self {
            kind,
            source_id: format!("srwmd-{}", kind.as_str()),
        }
    }

    /// List scrape joined with optional detail scrapes. Enriched fields merge
    /// into the adapted event and the content hash is recomputed as part of
    /// the merge.
    pub fn adapt_with_details(
        &self,
        records: &[(SrwmdNotice, Option<SrwmdPermitDetail>)],
    ) -> Vec<CivicEvent> {
        let mut events = Vec::with_capacity(records.len());
        for (notice, detail) in records {
            let Some(mut event) = self.adapt_one(notice) else {
                debug!(source_id = %self.source_id, "Skipping notice without an identifier");
                continue;
            };
            if let Some(detail) = detail {
                self.enrich(&mut event, detail);
            }
            events.push(event);
        }
        events
    }

    /// Merge detail-page fields into an already-adapted event.
    pub fn enrich(&self, event: &mut CivicEvent, detail: &SrwmdPermitDetail) {
        if let Some(description) = detail
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            event.set_description(description);
            for tag in derive_tags(description) {
                event.add_tag(tag);
            }
            for entity in extract_entities(&self.source_id, description) {
                event.add_entity(entity);
            }
        }

        for (role, name) in [
            ("applicant", &detail.applicant),
            ("owner", &detail.owner),
            ("consultant", &detail.consultant),
        ] {
            let Some(name) = name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            event.add_entity(
                Entity::new(
                    format!("{}-org-{}", self.source_id, slugify(name)),
                    EntityType::Organization,
                    name,
                )
                .with_metadata("role", role),
            );
        }

        for (i, doc) in detail.documents.iter().enumerate() {
            let Some(url) = doc.url.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            let title = doc
                .title
                .clone()
                .unwrap_or_else(|| format!("Permit document {}", i + 1));
            let document_type = doc
                .document_type
                .clone()
                .unwrap_or_else(|| "permit".to_string());
            event.add_document(
                Document::new(
                    format!("{}-doc-{}", event.event_id, i + 1),
                    title,
                    document_type,
                )
                .with_url(url),
            );
        }
    }

    fn adapt_one(&self, notice: &SrwmdNotice) -> Option<CivicEvent> {
        let native_id = notice
            .notice_id
            .as_deref()
            .or(notice.permit_number.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())?;

        let event_id = format!("{}-{}", self.source_id, slugify(native_id));
        let timestamp = parse_or_now(
            &self.source_id,
            native_id,
            notice.date.as_deref().unwrap_or(""),
            DATE_FORMATS,
        );

        let title = match (&notice.project_name, &notice.permit_number) {
            (Some(project), Some(permit)) => format!("{project} ({permit})"),
            (Some(project), None) => project.clone(),
            (None, Some(permit)) => format!("Permit {permit}"),
            (None, None) => notice
                .notice_type
                .clone()
                .unwrap_or_else(|| "Permit Notice".to_string()),
        };

        let mut event = CivicEvent::new(
            event_id,
            self.kind.event_type(),
            self.source_id.clone(),
            timestamp,
            title,
        )
        .with_tag("permit");

        if let Some(county) = notice.county.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            event = event.with_location(GeoLocation::county_level(county));
            event.add_tag(county_tag(county));
        }

        for field in [&notice.rule_type, &notice.permit_type, &notice.notice_type] {
            if let Some(text) = field {
                for tag in permit_type_tags(text) {
                    event.add_tag(tag);
                }
            }
        }
        for tag in derive_tags(&event.title) {
            event.add_tag(tag);
        }
        for entity in extract_entities(&self.source_id, &event.title) {
            event.add_entity(entity);
        }

        if let Some(url) = &notice.permit_url {
            event.add_document(
                Document::new(
                    format!("{}-notice", event.event_id),
                    "Permit Notice",
                    "permit",
                )
                .with_url(url.clone()),
            );
        }

        if let Ok(serde_json::Value::Object(raw)) = serde_json::to_value(notice) {
            event = event.with_raw_data(raw);
        }

        Some(event)
    }
}

/// `"Alachua"` -> `alachua-county`; already-suffixed names pass through.
fn county_tag(county: &str) -> String {
    let slug = slugify(county);
    if slug.ends_with("-county") {
        slug
    } else {
        format!("{slug}-county")
    }
}

/// District permit categories to tags. ERP and WUP are the common cases.
fn permit_type_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tags = Vec::new();
    if lower.contains("environmental resource") || lower.contains("erp") {
        tags.push("erp".to_string());
    }
    if lower.contains("water use") || lower.contains("wup") {
        tags.push("wup".to_string());
    }
    if lower.contains("well") {
        tags.push("well".to_string());
    }
    if lower.contains("works of the district") {
        tags.push("wod".to_string());
    }
    tags
}

impl SourceAdapter for SrwmdPermitAdapter {
    type Record = SrwmdNotice;

    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn adapt(&self, records: &[SrwmdNotice]) -> Vec<CivicEvent> {
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            match self.adapt_one(record) {
                Some(event) => events.push(event),
                None => {
                    debug!(source_id = %self.source_id, "Skipping notice without an identifier");
                }
            }
        }
        events
    }
}
