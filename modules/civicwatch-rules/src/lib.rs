//! Watch rules: declarative predicates over CivicEvents that produce
//! human-facing alerts.
//!
//! Content-based conditions are deterministic; `upcoming_within_hours`
//! evaluates against wall-clock now, so time-windowed rules can start or stop
//! matching a stored event purely through elapsed time. That is how "meeting
//! in the next 48 hours" alerts work — it is the one deliberately
//! non-idempotent corner of the core.

mod alert;
mod defaults;
mod engine;
mod rule;

pub use alert::{Alert, AlertSeverity};
pub use defaults::default_rules;
pub use engine::RulesEngine;
pub use rule::{Rule, RuleDef};
