//! Built-in fallback rule set, used when the configured rule file is missing
//! or unusable.

use civicwatch_common::EventType;

use crate::alert::AlertSeverity;
use crate::rule::Rule;

pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "alachua-permit-applications",
            AlertSeverity::Warning,
            "New permit application in {county}: {title}",
        )
        .with_description("Any water-management permit application in Alachua County")
        .with_event_types(&[EventType::PermitApplication])
        .with_counties(&["Alachua"]),
        Rule::new(
            "zoning-activity",
            AlertSeverity::Notable,
            "Zoning activity: {title} ({source})",
        )
        .with_description("Rezonings, variances, and special exceptions anywhere we watch")
        .with_any_tags(&["rezoning", "zoning", "variance", "special-exception"]),
        Rule::new(
            "upcoming-meetings",
            AlertSeverity::Info,
            "Meeting within 48 hours: {title} at {timestamp}",
        )
        .with_description("Government meetings starting in the next two days")
        .with_event_types(&[EventType::Meeting])
        .with_upcoming_within_hours(48),
        Rule::new(
            "wetland-permits",
            AlertSeverity::Notable,
            "Wetland-related permit activity: {title} ({event_type})",
        )
        .with_description("ERP and wetland/dredge-fill permit traffic district-wide")
        .with_event_types(&[EventType::PermitApplication, EventType::PermitIssued])
        .with_any_tags(&["wetland", "erp", "dredge-fill", "stormwater"]),
    ]
}
