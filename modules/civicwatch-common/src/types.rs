use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// --- Enums ---

/// The closed set of civic occurrence kinds the pipeline normalizes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Meeting,
    PermitApplication,
    PermitIssued,
    PublicNotice,
    AgendaPosted,
    DocumentAdded,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Meeting => write!(f, "meeting"),
            EventType::PermitApplication => write!(f, "permit_application"),
            EventType::PermitIssued => write!(f, "permit_issued"),
            EventType::PublicNotice => write!(f, "public_notice"),
            EventType::AgendaPosted => write!(f, "agenda_posted"),
            EventType::DocumentAdded => write!(f, "document_added"),
        }
    }
}

impl EventType {
    /// Lenient parse for config files and CLI flags. Accepts snake_case,
    /// kebab-case, and uppercase spellings; returns None for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "meeting" => Some(Self::Meeting),
            "permit_application" => Some(Self::PermitApplication),
            "permit_issued" => Some(Self::PermitIssued),
            "public_notice" => Some(Self::PublicNotice),
            "agenda_posted" => Some(Self::AgendaPosted),
            "document_added" => Some(Self::DocumentAdded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Address,
    GovernmentBody,
    Parcel,
    Project,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Person => write!(f, "person"),
            EntityType::Organization => write!(f, "organization"),
            EntityType::Address => write!(f, "address"),
            EntityType::GovernmentBody => write!(f, "government_body"),
            EntityType::Parcel => write!(f, "parcel"),
            EntityType::Project => write!(f, "project"),
        }
    }
}

// --- Value objects ---

/// A named real-world thing extracted from event text. Owned by its event;
/// there is no cross-event identity beyond fuzzy matching by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub name: String,
    /// Derived from `name` at construction unless explicitly overridden.
    pub normalized_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Lowercase, strip commas and periods, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace([',', '.'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase slug for stable identifiers: non-alphanumerics become dashes.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

impl Entity {
    pub fn new(
        entity_id: impl Into<String>,
        entity_type: EntityType,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let normalized_name = normalize_name(&name);
        Self {
            entity_id: entity_id.into(),
            entity_type,
            name,
            normalized_name,
            aliases: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl AsRef<str>) -> Self {
        let alias = normalize_name(alias.as_ref());
        if !alias.is_empty() && alias != self.normalized_name && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// Two entities refer to the same real-world thing iff they share a type
    /// and either the same normalized name or an alias hit in either direction.
    pub fn matches(&self, other: &Entity) -> bool {
        if self.entity_type != other.entity_type {
            return false;
        }
        self.normalized_name == other.normalized_name
            || other.aliases.contains(&self.normalized_name)
            || self.aliases.contains(&other.normalized_name)
    }
}

/// A reference to a retrievable artifact (agenda PDF, permit document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form tag: "agenda", "permit", "pdf".
    pub document_type: String,
    /// Populated once the document body has actually been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl Document {
    pub fn new(
        document_id: impl Into<String>,
        title: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            url: None,
            document_type: document_type.into(),
            content_hash: None,
            extracted_text: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// County-level granularity is the common case; 0.0/0.0 is the placeholder
/// when true coordinates are unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

impl GeoLocation {
    pub fn county_level(county: impl Into<String>) -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            address: None,
            county: Some(county.into()),
        }
    }
}

// --- CivicEvent ---

/// The central normalized record. `event_id` is
/// `{source_type}-{source_sub_id}-{source_native_id}`, so re-scraping the same
/// underlying record always yields the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivicEvent {
    pub event_id: String,
    pub event_type: EventType,
    /// Which adapter/source produced this event.
    pub source_id: String,
    /// Semantic event time (meeting date, permit date) — not discovery time.
    pub timestamp: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When this event_id was first seen by the store. Immutable once set.
    pub discovered_at: DateTime<Utc>,
    /// Advances only when content actually changed.
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub raw_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CivicEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: EventType,
        source_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let mut event = Self {
            event_id: event_id.into(),
            event_type,
            source_id: source_id.into(),
            timestamp,
            title: title.into(),
            description: None,
            discovered_at: now,
            updated_at: now,
            location: None,
            entities: Vec::new(),
            documents: Vec::new(),
            tags: Vec::new(),
            content_hash: String::new(),
            raw_data: serde_json::Map::new(),
            metadata: serde_json::Map::new(),
        };
        event.content_hash = event.compute_content_hash();
        event
    }

    /// Coarse fingerprint over title, description, and document/entity counts.
    /// Catches the edits that matter for re-alerting (title/summary/item-count
    /// changes); an edit inside a document's text alone will not register —
    /// document-level change detection uses `Document::content_hash` instead.
    pub fn compute_content_hash(&self) -> String {
        let material = format!(
            "{}|{}|{}|{}",
            self.title,
            self.description.as_deref().unwrap_or(""),
            self.documents.len(),
            self.entities.len(),
        );
        hex::encode(Sha256::digest(material.as_bytes()))
    }

    fn refresh_content_hash(&mut self) {
        self.content_hash = self.compute_content_hash();
    }

    /// True iff the coarse content fingerprints differ.
    pub fn has_changed(&self, other: &CivicEvent) -> bool {
        self.content_hash != other.content_hash
    }

    /// Idempotent, case-insensitive tag insertion.
    pub fn add_tag(&mut self, tag: impl AsRef<str>) {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Append an entity, or merge alias lists into an existing entity that
    /// `matches()` the incoming one.
    pub fn add_entity(&mut self, entity: Entity) {
        if let Some(existing) = self.entities.iter_mut().find(|e| e.matches(&entity)) {
            let mut incoming = entity.aliases;
            incoming.push(entity.normalized_name);
            for alias in incoming {
                if alias != existing.normalized_name && !existing.aliases.contains(&alias) {
                    existing.aliases.push(alias);
                }
            }
        } else {
            self.entities.push(entity);
        }
        self.refresh_content_hash();
    }

    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
        self.refresh_content_hash();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
        self.refresh_content_hash();
    }

    /// ALL of `required` present (case-insensitive).
    pub fn matches_tags<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|t| self.tags.contains(&t.as_ref().to_lowercase()))
    }

    /// AT LEAST ONE of `any_of` present (case-insensitive).
    pub fn matches_any_tag<S: AsRef<str>>(&self, any_of: &[S]) -> bool {
        any_of
            .iter()
            .any(|t| self.tags.contains(&t.as_ref().to_lowercase()))
    }

    // Builder-style helpers for adapters. Each refreshes the content hash so
    // the invariant (hash always derived from current content) holds.

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_tag(mut self, tag: impl AsRef<str>) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.add_document(document);
        self
    }

    pub fn with_raw_data(mut self, raw: serde_json::Map<String, serde_json::Value>) -> Self {
        self.raw_data = raw;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_event() -> CivicEvent {
        CivicEvent::new(
            "civicclerk-alachua-123",
            EventType::Meeting,
            "civicclerk-alachua",
            Utc.with_ymd_and_hms(2026, 2, 1, 17, 0, 0).unwrap(),
            "City Commission Meeting",
        )
    }

    #[test]
    fn content_hash_ignores_id_and_timestamp() {
        let a = base_event();
        let b = CivicEvent::new(
            "other-id",
            EventType::PublicNotice,
            "florida-public-notices",
            Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap(),
            "City Commission Meeting",
        );
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn content_hash_changes_with_title() {
        let a = base_event();
        let mut b = base_event();
        b.title = "City Commission Meeting - Amended".to_string();
        b.content_hash = b.compute_content_hash();
        assert!(a.has_changed(&b));
    }

    #[test]
    fn content_hash_changes_with_document_count() {
        let a = base_event();
        let b = base_event().with_document(Document::new("d1", "Agenda", "agenda"));
        assert!(a.has_changed(&b));
    }

    #[test]
    fn normalize_strips_commas_and_periods() {
        assert_eq!(
            normalize_name("ABC Development, LLC."),
            "abc development llc"
        );
        assert_eq!(normalize_name("ABC Development LLC"), "abc development llc");
    }

    #[test]
    fn entities_match_across_punctuation_variants() {
        let a = Entity::new("e1", EntityType::Organization, "ABC Development LLC");
        let b = Entity::new("e2", EntityType::Organization, "ABC Development, LLC.");
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn entities_of_different_types_never_match() {
        let a = Entity::new("e1", EntityType::Organization, "ABC Development LLC");
        let b = Entity::new("e2", EntityType::Project, "ABC Development LLC");
        assert!(!a.matches(&b));
    }

    #[test]
    fn entities_match_via_alias() {
        let a = Entity::new("e1", EntityType::Organization, "Suwannee Farms")
            .with_alias("Suwannee Farms of Florida");
        let b = Entity::new("e2", EntityType::Organization, "Suwannee Farms of Florida");
        assert!(a.matches(&b));
        assert!(b.matches(&a));
    }

    #[test]
    fn add_entity_merges_instead_of_duplicating() {
        let mut event = base_event();
        event.add_entity(Entity::new(
            "e1",
            EntityType::Organization,
            "ABC Development LLC",
        ));
        event.add_entity(
            Entity::new("e2", EntityType::Organization, "ABC Development, LLC.")
                .with_alias("ABC Dev"),
        );
        assert_eq!(event.entities.len(), 1);
        assert!(event.entities[0].aliases.contains(&"abc dev".to_string()));
    }

    #[test]
    fn add_tag_dedups_case_insensitively() {
        let mut event = base_event();
        event.add_tag("Meeting");
        event.add_tag("meeting");
        event.add_tag("  MEETING ");
        assert_eq!(event.tags, vec!["meeting"]);
    }

    #[test]
    fn tag_matching_all_vs_any() {
        let mut event = base_event();
        for t in ["permit", "alachua-county", "erp"] {
            event.add_tag(t);
        }
        assert!(event.matches_tags(&["permit", "alachua-county"]));
        assert!(!event.matches_tags(&["permit", "columbia-county"]));
        assert!(event.matches_any_tag(&["columbia-county", "alachua-county"]));
        assert!(!event.matches_any_tag(&["columbia-county", "dixie-county"]));
    }

    #[test]
    fn serde_round_trip_is_lossless() {
        let event = base_event()
            .with_description("Regular meeting of the City Commission")
            .with_location(GeoLocation {
                latitude: 29.6516,
                longitude: -82.3248,
                address: Some("200 E University Ave".to_string()),
                county: Some("Alachua".to_string()),
            })
            .with_entity(
                Entity::new("e1", EntityType::Organization, "ABC Development LLC")
                    .with_alias("ABC Dev")
                    .with_metadata("role", "applicant"),
            )
            .with_document(
                Document::new("d1", "Meeting Agenda", "agenda").with_url("https://x/a.pdf"),
            )
            .with_tag("meeting")
            .with_metadata("board", "City Commission");

        let value = serde_json::to_value(&event).unwrap();
        let back: CivicEvent = serde_json::from_value(value).unwrap();

        assert_eq!(back.event_id, event.event_id);
        assert_eq!(back.event_type, event.event_type);
        assert_eq!(back.timestamp, event.timestamp);
        assert_eq!(back.discovered_at, event.discovered_at);
        assert_eq!(back.updated_at, event.updated_at);
        assert_eq!(back.description, event.description);
        assert_eq!(back.content_hash, event.content_hash);
        assert_eq!(back.tags, event.tags);
        assert_eq!(back.entities.len(), 1);
        assert_eq!(back.entities[0].aliases, event.entities[0].aliases);
        assert_eq!(back.entities[0].metadata, event.entities[0].metadata);
        assert_eq!(back.documents[0].url, event.documents[0].url);
        let loc = back.location.unwrap();
        assert_eq!(loc.county.as_deref(), Some("Alachua"));
        assert_eq!(loc.latitude, 29.6516);
        assert_eq!(back.metadata, event.metadata);
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::PermitApplication).unwrap();
        assert_eq!(json, "\"permit_application\"");
        assert_eq!(EventType::parse("permit-application"), Some(EventType::PermitApplication));
        assert_eq!(EventType::parse("MEETING"), Some(EventType::Meeting));
        assert_eq!(EventType::parse("nonsense"), None);
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("ABC Development, LLC."), "abc-development-llc");
        assert_eq!(slugify("  NW 13th St  "), "nw-13th-st");
    }
}
