//! EventStore — durable keyed storage of CivicEvents with change detection.
//!
//! The idempotence guarantee lives here: re-running discovery against
//! unchanged upstream content never mutates stored state. `discovered_at` is
//! immutable once set; `updated_at` advances only on real content changes.

mod store;

pub use store::{EventFilter, EventStore, SaveCounts, SaveStatus};
