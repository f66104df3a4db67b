use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::warn;

use civicwatch_common::error::Result;
use civicwatch_common::{CivicEvent, CivicError, EventType};

use crate::alert::{Alert, AlertSeverity};

/// Placeholders the message template may use. Anything else is a
/// configuration error caught at rule-load time, not alert-generation time.
const TEMPLATE_FIELDS: &[&str] = &["title", "source", "event_type", "timestamp", "county"];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_]+)\}").unwrap());

/// A rule definition as it appears in the YAML file, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: String,
    pub message_template: String,
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub any_tags: Vec<String>,
    #[serde(default)]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub counties: Vec<String>,
    #[serde(default)]
    pub title_contains: Vec<String>,
    #[serde(default)]
    pub title_regex: Option<String>,
    #[serde(default)]
    pub upcoming_within_hours: Option<i64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A validated watch rule. All configured conditions AND together; empty
/// conditions are vacuously true. All text matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub message_template: String,
    pub event_types: Vec<EventType>,
    pub required_tags: Vec<String>,
    pub any_tags: Vec<String>,
    pub source_ids: Vec<String>,
    pub counties: Vec<String>,
    pub title_contains: Vec<String>,
    pub title_regex: Option<Regex>,
    pub upcoming_within_hours: Option<i64>,
    pub enabled: bool,
}

impl Rule {
    /// Minimal rule; conditions attach via the with_* builders. Used by the
    /// built-in default set and tests.
    pub fn new(name: &str, severity: AlertSeverity, message_template: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            severity,
            message_template: message_template.to_string(),
            event_types: Vec::new(),
            required_tags: Vec::new(),
            any_tags: Vec::new(),
            source_ids: Vec::new(),
            counties: Vec::new(),
            title_contains: Vec::new(),
            title_regex: None,
            upcoming_within_hours: None,
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_event_types(mut self, event_types: &[EventType]) -> Self {
        self.event_types = event_types.to_vec();
        self
    }

    pub fn with_required_tags(mut self, tags: &[&str]) -> Self {
        self.required_tags = tags.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    pub fn with_any_tags(mut self, tags: &[&str]) -> Self {
        self.any_tags = tags.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    pub fn with_source_ids(mut self, source_ids: &[&str]) -> Self {
        self.source_ids = source_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_counties(mut self, counties: &[&str]) -> Self {
        self.counties = counties.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_title_contains(mut self, terms: &[&str]) -> Self {
        self.title_contains = terms.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    pub fn with_upcoming_within_hours(mut self, hours: i64) -> Self {
        self.upcoming_within_hours = Some(hours);
        self
    }

    /// Validate and compile a parsed definition. Unknown event-type strings
    /// are logged and skipped; an unknown severity, an invalid regex, or an
    /// unknown template placeholder rejects the whole rule.
    pub fn compile(def: RuleDef) -> Result<Rule> {
        let severity = AlertSeverity::parse(&def.severity).ok_or_else(|| {
            CivicError::RuleConfig(format!(
                "rule '{}': unknown severity '{}'",
                def.name, def.severity
            ))
        })?;

        for capture in PLACEHOLDER_RE.captures_iter(&def.message_template) {
            let field = &capture[1];
            if !TEMPLATE_FIELDS.contains(&field) {
                return Err(CivicError::RuleConfig(format!(
                    "rule '{}': unknown template placeholder '{{{field}}}'",
                    def.name
                )));
            }
        }

        let mut event_types = Vec::new();
        for raw in &def.event_types {
            match EventType::parse(raw) {
                Some(event_type) => event_types.push(event_type),
                None => {
                    warn!(rule = %def.name, value = %raw, "Unknown event type in rule, skipping value");
                }
            }
        }

        let title_regex = match &def.title_regex {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        CivicError::RuleConfig(format!(
                            "rule '{}': invalid title_regex: {e}",
                            def.name
                        ))
                    })?,
            ),
            None => None,
        };

        Ok(Rule {
            name: def.name,
            description: def.description,
            severity,
            message_template: def.message_template,
            event_types,
            required_tags: def.required_tags.iter().map(|t| t.to_lowercase()).collect(),
            any_tags: def.any_tags.iter().map(|t| t.to_lowercase()).collect(),
            source_ids: def.source_ids,
            counties: def.counties,
            title_contains: def.title_contains.iter().map(|t| t.to_lowercase()).collect(),
            title_regex,
            upcoming_within_hours: def.upcoming_within_hours,
            enabled: def.enabled,
        })
    }

    /// Wall-clock entry point. Time-windowed conditions see "now" at call
    /// time, which is what makes repeated evaluation non-idempotent for them.
    pub fn matches(&self, event: &CivicEvent) -> bool {
        self.matches_at(event, Utc::now())
    }

    /// Deterministic seam: all conditions evaluated against an explicit
    /// `now`. Short-circuit AND over everything configured.
    pub fn matches_at(&self, event: &CivicEvent, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if !self.required_tags.is_empty() && !event.matches_tags(&self.required_tags) {
            return false;
        }
        if !self.any_tags.is_empty() && !event.matches_any_tag(&self.any_tags) {
            return false;
        }
        if !self.source_ids.is_empty() && !self.source_ids.iter().any(|s| s == &event.source_id) {
            return false;
        }
        if !self.counties.is_empty() && !self.matches_county(event) {
            return false;
        }
        if !self.title_contains.is_empty() {
            let title = event.title.to_lowercase();
            if !self.title_contains.iter().any(|term| title.contains(term)) {
                return false;
            }
        }
        if let Some(regex) = &self.title_regex {
            if !regex.is_match(&event.title) {
                return false;
            }
        }
        if let Some(hours) = self.upcoming_within_hours {
            let window_end = now + Duration::hours(hours);
            if event.timestamp < now || event.timestamp > window_end {
                return false;
            }
        }
        true
    }

    /// County condition: `location.county` match, or the county-derived tags
    /// (`alachua` / `alachua-county`). Case-insensitive.
    fn matches_county(&self, event: &CivicEvent) -> bool {
        let location_county = event
            .location
            .as_ref()
            .and_then(|l| l.county.as_deref())
            .map(str::to_lowercase);
        self.counties.iter().any(|county| {
            let lower = county.to_lowercase();
            if location_county.as_deref() == Some(lower.as_str()) {
                return true;
            }
            let tag = format!("{lower}-county");
            event.tags.contains(&lower) || event.tags.contains(&tag)
        })
    }

    /// Render the message template and wrap the event in an Alert. Rendering
    /// is infallible here because placeholders were validated at load time.
    pub fn generate_alert(&self, event: &CivicEvent) -> Alert {
        let county = event
            .location
            .as_ref()
            .and_then(|l| l.county.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        let message = self
            .message_template
            .replace("{title}", &event.title)
            .replace("{source}", &event.source_id)
            .replace("{event_type}", &event.event_type.to_string())
            .replace(
                "{timestamp}",
                &event.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            )
            .replace("{county}", &county);
        Alert::new(&self.name, self.severity, message, event.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use civicwatch_common::GeoLocation;

    fn permit_event() -> CivicEvent {
        CivicEvent::new(
            "srwmd-applications-n-1",
            EventType::PermitApplication,
            "srwmd-applications",
            Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap(),
            "Millhopper Commerce Park (ERP-001-234567)",
        )
        .with_location(GeoLocation::county_level("Alachua"))
        .with_tag("permit")
        .with_tag("alachua-county")
    }

    #[test]
    fn and_composition_requires_every_condition() {
        let rule = Rule::new("r", AlertSeverity::Warning, "{title}")
            .with_event_types(&[EventType::PermitApplication])
            .with_counties(&["Alachua"]);
        assert!(rule.matches(&permit_event()));

        // Wrong type: no match even though the county holds.
        let mut wrong_type = permit_event();
        wrong_type.event_type = EventType::Meeting;
        assert!(!rule.matches(&wrong_type));

        // Wrong county: no match even though the type holds.
        let other_county = Rule::new("r", AlertSeverity::Warning, "{title}")
            .with_event_types(&[EventType::PermitApplication])
            .with_counties(&["Columbia"]);
        assert!(!other_county.matches(&permit_event()));
    }

    #[test]
    fn county_matches_via_tag_without_location() {
        let mut event = permit_event();
        event.location = None;
        let rule = Rule::new("r", AlertSeverity::Info, "{title}").with_counties(&["ALACHUA"]);
        assert!(rule.matches(&event));
    }

    #[test]
    fn empty_conditions_are_vacuous() {
        let rule = Rule::new("r", AlertSeverity::Info, "{title}");
        assert!(rule.matches(&permit_event()));
    }

    #[test]
    fn disabled_rule_never_matches() {
        let mut rule = Rule::new("r", AlertSeverity::Info, "{title}");
        rule.enabled = false;
        assert!(!rule.matches(&permit_event()));
    }

    #[test]
    fn title_contains_is_case_insensitive_any() {
        let rule = Rule::new("r", AlertSeverity::Info, "{title}")
            .with_title_contains(&["commerce park", "landfill"]);
        assert!(rule.matches(&permit_event()));

        let miss = Rule::new("r", AlertSeverity::Info, "{title}")
            .with_title_contains(&["landfill"]);
        assert!(!miss.matches(&permit_event()));
    }

    #[test]
    fn time_window_depends_on_now() {
        let rule = Rule::new("r", AlertSeverity::Info, "{title}").with_upcoming_within_hours(48);
        let event = permit_event();

        let day_before = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        assert!(rule.matches_at(&event, day_before));

        // The same event stops matching once it is in the past.
        let day_after = Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap();
        assert!(!rule.matches_at(&event, day_after));

        // And never matched when it was still beyond the window.
        let week_before = Utc.with_ymd_and_hms(2026, 1, 25, 0, 0, 0).unwrap();
        assert!(!rule.matches_at(&event, week_before));
    }

    #[test]
    fn template_renders_fixed_placeholders() {
        let rule = Rule::new(
            "permit-watch",
            AlertSeverity::Warning,
            "{event_type} in {county}: {title} ({source}, {timestamp})",
        );
        let alert = rule.generate_alert(&permit_event());
        assert_eq!(
            alert.message,
            "permit_application in Alachua: Millhopper Commerce Park (ERP-001-234567) (srwmd-applications, 2026-02-03 00:00)"
        );
        assert_eq!(alert.alert_id, "permit-watch-srwmd-applications-n-1");
    }

    #[test]
    fn missing_county_renders_unknown() {
        let mut event = permit_event();
        event.location = None;
        let rule = Rule::new("r", AlertSeverity::Info, "{county}");
        assert_eq!(rule.generate_alert(&event).message, "Unknown");
    }

    #[test]
    fn compile_rejects_unknown_placeholder() {
        let def = RuleDef {
            name: "bad".to_string(),
            description: String::new(),
            severity: "info".to_string(),
            message_template: "{title} {nonsense}".to_string(),
            event_types: vec![],
            required_tags: vec![],
            any_tags: vec![],
            source_ids: vec![],
            counties: vec![],
            title_contains: vec![],
            title_regex: None,
            upcoming_within_hours: None,
            enabled: true,
        };
        assert!(Rule::compile(def).is_err());
    }

    #[test]
    fn compile_rejects_unknown_severity_and_bad_regex() {
        let base = RuleDef {
            name: "r".to_string(),
            description: String::new(),
            severity: "info".to_string(),
            message_template: "{title}".to_string(),
            event_types: vec![],
            required_tags: vec![],
            any_tags: vec![],
            source_ids: vec![],
            counties: vec![],
            title_contains: vec![],
            title_regex: None,
            upcoming_within_hours: None,
            enabled: true,
        };

        let mut bad_severity = base.clone();
        bad_severity.severity = "catastrophic".to_string();
        assert!(Rule::compile(bad_severity).is_err());

        let mut bad_regex = base.clone();
        bad_regex.title_regex = Some("[unclosed".to_string());
        assert!(Rule::compile(bad_regex).is_err());
    }

    #[test]
    fn compile_skips_unknown_event_types_but_keeps_known() {
        let def = RuleDef {
            name: "r".to_string(),
            description: String::new(),
            severity: "notable".to_string(),
            message_template: "{title}".to_string(),
            event_types: vec!["meeting".to_string(), "gala".to_string()],
            required_tags: vec![],
            any_tags: vec![],
            source_ids: vec![],
            counties: vec![],
            title_contains: vec![],
            title_regex: None,
            upcoming_within_hours: None,
            enabled: true,
        };
        let rule = Rule::compile(def).unwrap();
        assert_eq!(rule.event_types, vec![EventType::Meeting]);
    }

    #[test]
    fn title_regex_is_case_insensitive() {
        let def = RuleDef {
            name: "r".to_string(),
            description: String::new(),
            severity: "info".to_string(),
            message_template: "{title}".to_string(),
            event_types: vec![],
            required_tags: vec![],
            any_tags: vec![],
            source_ids: vec![],
            counties: vec![],
            title_contains: vec![],
            title_regex: Some(r"commerce\s+park".to_string()),
            upcoming_within_hours: None,
            enabled: true,
        };
        let rule = Rule::compile(def).unwrap();
        assert!(rule.matches(&permit_event()));
    }
}
