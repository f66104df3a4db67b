//! Integration tests for rule loading and batch evaluation.

use std::io::Write;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use civicwatch_common::{CivicEvent, EventType, GeoLocation};
use civicwatch_rules::RulesEngine;

fn write_rules(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("rules.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

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
    .with_tag("erp")
}

#[test]
fn loads_rules_from_yaml() {
    let dir = TempDir::new().unwrap();
    let path = write_rules(
        &dir,
        r#"
rules:
  - name: erp-watch
    description: ERP permits anywhere
    severity: notable
    message_template: "ERP activity: {title}"
    event_types: [permit_application, permit_issued]
    any_tags: [erp]
  - name: disabled-rule
    severity: info
    message_template: "{title}"
    enabled: false
"#,
    );

    let engine = RulesEngine::from_path(&path);
    assert_eq!(engine.rules().len(), 2);

    let alerts = engine.evaluate(&permit_event());
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule_name, "erp-watch");
    assert_eq!(
        alerts[0].message,
        "ERP activity: Millhopper Commerce Park (ERP-001-234567)"
    );
}

#[test]
fn invalid_rules_are_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_rules(
        &dir,
        r#"
rules:
  - name: good-rule
    severity: warning
    message_template: "{title}"
    counties: [Alachua]
  - name: bad-severity
    severity: catastrophic
    message_template: "{title}"
  - name: bad-placeholder
    severity: info
    message_template: "{title} {who}"
  - severity: info
    message_template: "missing name"
"#,
    );

    let engine = RulesEngine::from_path(&path);
    assert_eq!(engine.rules().len(), 1);
    assert_eq!(engine.rules()[0].name, "good-rule");
}

#[test]
fn nonexistent_path_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let engine = RulesEngine::from_path(&dir.path().join("does-not-exist.yaml"));

    assert!(!engine.rules().is_empty());
    // The fallback set must watch Alachua County permit applications.
    assert!(engine.rules().iter().any(|r| {
        r.event_types.contains(&EventType::PermitApplication)
            && r.counties.iter().any(|c| c.eq_ignore_ascii_case("alachua"))
    }));

    // And that rule actually fires on a matching event.
    let alerts = engine.evaluate(&permit_event());
    assert!(alerts
        .iter()
        .any(|a| a.rule_name == "alachua-permit-applications"));
}

#[test]
fn unparseable_yaml_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_rules(&dir, ":: definitely not yaml {{{");
    let engine = RulesEngine::from_path(&path);
    assert!(!engine.rules().is_empty());
}

#[test]
fn one_event_can_trigger_many_rules() {
    let dir = TempDir::new().unwrap();
    let engine = RulesEngine::from_path(&dir.path().join("missing.yaml"));

    // Matches both the Alachua permit rule and the wetland/ERP rule.
    let alerts = engine.evaluate(&permit_event());
    assert!(alerts.len() >= 2);

    let names: Vec<_> = alerts.iter().map(|a| a.rule_name.as_str()).collect();
    assert!(names.contains(&"alachua-permit-applications"));
    assert!(names.contains(&"wetland-permits"));
}

#[test]
fn evaluate_batch_concatenates_in_event_order() {
    let dir = TempDir::new().unwrap();
    let path = write_rules(
        &dir,
        r#"
rules:
  - name: all-permits
    severity: info
    message_template: "{title}"
    event_types: [permit_application]
"#,
    );
    let engine = RulesEngine::from_path(&path);

    let mut second = permit_event();
    second.event_id = "srwmd-applications-n-2".to_string();
    second.title = "Second".to_string();

    let alerts = engine.evaluate_batch(&[permit_event(), second]);
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].event.event_id, "srwmd-applications-n-1");
    assert_eq!(alerts[1].event.event_id, "srwmd-applications-n-2");
}
