//! Source adapters: pure converters from one source's raw records into
//! normalized [`CivicEvent`]s.
//!
//! Per-item data problems (missing native id, malformed date) are logged and
//! the record is skipped — one bad record never aborts a batch. Systemic
//! misuse (wiring a source to the wrong adapter) is the caller's bug and is
//! not silently absorbed here.

pub mod civicclerk;
pub mod dates;
pub mod florida;
pub mod srwmd;

pub use civicclerk::{CivicClerkAdapter, CivicClerkMeeting};
pub use florida::{FloridaNotice, FloridaNoticeAdapter};
pub use srwmd::{SrwmdDocument, SrwmdNotice, SrwmdPermitAdapter, SrwmdPermitDetail};

use civicwatch_common::CivicEvent;
use serde::de::DeserializeOwned;
use tracing::warn;

/// The polymorphic adapter contract. Each variant owns a concrete raw-record
/// shape; loose key-value input is normalized into that shape once, at the
/// boundary, so adapter bodies only ever handle one form.
pub trait SourceAdapter {
    type Record: DeserializeOwned;

    /// Constant identity of this adapter instance, e.g. `civicclerk-alachua`.
    fn source_id(&self) -> &str;

    /// Convert a batch of raw records. Never fails on per-item data issues.
    fn adapt(&self, records: &[Self::Record]) -> Vec<CivicEvent>;

    /// Normalize loose JSON values into this adapter's record shape, then
    /// adapt. Values that do not fit the shape are logged and dropped.
    fn adapt_values(&self, values: &[serde_json::Value]) -> Vec<CivicEvent> {
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<Self::Record>(value.clone()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        source_id = %self.source_id(),
                        error = %e,
                        "Dropping raw record that does not match the source shape"
                    );
                }
            }
        }
        self.adapt(&records)
    }
}
