use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civicwatch_common::CivicEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Notable,
    Warning,
    Urgent,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Notable => write!(f, "notable"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Urgent => write!(f, "urgent"),
        }
    }
}

impl AlertSeverity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "notable" => Some(Self::Notable),
            "warning" => Some(Self::Warning),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Output of rule evaluation. `alert_id` is derived from the rule name and
/// the event id, so evaluating the same event against the same rule twice
/// produces the same id — callers can dedup at their discretion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub rule_name: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub event: CivicEvent,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
}

impl Alert {
    pub fn new(
        rule_name: &str,
        severity: AlertSeverity,
        message: String,
        event: CivicEvent,
    ) -> Self {
        Self {
            alert_id: format!("{rule_name}-{}", event.event_id),
            rule_name: rule_name.to_string(),
            severity,
            message,
            event,
            created_at: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
        }
    }

    pub fn acknowledge(&mut self, by: impl Into<String>) {
        self.acknowledged = true;
        self.acknowledged_at = Some(Utc::now());
        self.acknowledged_by = Some(by.into());
    }
}
