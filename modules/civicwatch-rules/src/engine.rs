use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use civicwatch_common::CivicEvent;

use crate::alert::Alert;
use crate::defaults::default_rules;
use crate::rule::{Rule, RuleDef};

/// Evaluates events against the loaded rule set.
///
/// Construct one engine at process startup and pass it where needed; the rule
/// set is immutable for the engine's lifetime.
pub struct RulesEngine {
    rules: Vec<Rule>,
}

impl RulesEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Load the YAML rule file at `path`. Any config problem that would leave
    /// the engine rule-less — unreadable file, unparseable YAML, every rule
    /// invalid — falls back to the built-in default set. The system never
    /// runs silently without rules because of a config problem.
    pub fn from_path(path: &Path) -> Self {
        let rules = load_rules(path);
        info!(rule_count = rules.len(), "Rules engine ready");
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every enabled rule, in load order. An event can trigger several
    /// alerts across different rules.
    pub fn evaluate(&self, event: &CivicEvent) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            if rule.matches(event) {
                debug!(rule = %rule.name, event_id = %event.event_id, "Rule matched");
                alerts.push(rule.generate_alert(event));
            }
        }
        alerts
    }

    /// Flat concatenation of `evaluate` over all events, in event order.
    pub fn evaluate_batch(&self, events: &[CivicEvent]) -> Vec<Alert> {
        events.iter().flat_map(|e| self.evaluate(e)).collect()
    }
}

/// Parse the rule file, isolating per-rule failures: a rule that fails to
/// deserialize or validate is logged and skipped, the rest still load.
fn load_rules(path: &Path) -> Vec<Rule> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Cannot read rule file, falling back to built-in default rules"
            );
            return default_rules();
        }
    };

    let doc: serde_yaml::Value = match serde_yaml::from_str(&text) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Cannot parse rule file, falling back to built-in default rules"
            );
            return default_rules();
        }
    };

    // Accept either a top-level list or a `rules:` key holding one.
    let items = match doc.get("rules").and_then(|v| v.as_sequence()).or_else(|| doc.as_sequence()) {
        Some(items) => items.clone(),
        None => {
            warn!(
                path = %path.display(),
                "Rule file has no rule list, falling back to built-in default rules"
            );
            return default_rules();
        }
    };

    let mut rules = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let def: RuleDef = match serde_yaml::from_value(item) {
            Ok(def) => def,
            Err(e) => {
                warn!(index = i, error = %e, "Skipping malformed rule definition");
                continue;
            }
        };
        let name = def.name.clone();
        match Rule::compile(def) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!(rule = %name, error = %e, "Skipping invalid rule"),
        }
    }

    if rules.is_empty() {
        warn!(
            path = %path.display(),
            "No usable rules in file, falling back to built-in default rules"
        );
        return default_rules();
    }
    rules
}
