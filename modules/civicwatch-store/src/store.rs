use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use civicwatch_common::error::Result;
use civicwatch_common::{CivicEvent, CivicError, EventType};

// ---------------------------------------------------------------------------
// Save results
// ---------------------------------------------------------------------------

/// Outcome of a single `save_event` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    New,
    Updated,
    Unchanged,
}

impl SaveStatus {
    pub fn is_new(self) -> bool {
        matches!(self, SaveStatus::New)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaveStatus::New => "new",
            SaveStatus::Updated => "updated",
            SaveStatus::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate tally from `save_events`. `failed` counts persist errors that
/// were isolated so the rest of the batch could proceed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveCounts {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Snapshot — the on-disk container
// ---------------------------------------------------------------------------

/// On-disk representation. Round-trips exactly; events are kept sorted by
/// event_id so re-serializing a loaded snapshot is stable.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    last_updated: DateTime<Utc>,
    event_count: usize,
    events: Vec<CivicEvent>,
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

/// Filter for `get_events`/`count_events`. Empty/unset fields are vacuous.
/// Tag filtering is ALL-match; `get_whats_new` is the ANY-match path.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub source_id: Option<String>,
    pub event_type: Option<EventType>,
    pub tags: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn accepts(&self, event: &CivicEvent) -> bool {
        if let Some(source_id) = &self.source_id {
            if &event.source_id != source_id {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if !self.tags.is_empty() && !event.matches_tags(&self.tags) {
            return false;
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// Keyed store over CivicEvents, backed by a single JSON snapshot file.
///
/// One coarse lock guards load/mutate/persist as a single critical section —
/// writers are serialized, readers share, and nobody observes a mid-write
/// state. Every mutating call persists durably before returning: the snapshot
/// is written to a temp file in the same directory and renamed into place, so
/// a failed persist leaves the previous snapshot (and, after rollback, the
/// previous in-memory state) intact.
pub struct EventStore {
    path: PathBuf,
    inner: RwLock<HashMap<String, CivicEvent>>,
}

impl EventStore {
    /// Open the store at `path`, loading the existing snapshot if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let events = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&text)?;
            info!(
                path = %path.display(),
                event_count = snapshot.events.len(),
                "Loaded event store snapshot"
            );
            snapshot
                .events
                .into_iter()
                .map(|e| (e.event_id.clone(), e))
                .collect()
        } else {
            debug!(path = %path.display(), "No snapshot yet, starting empty");
            HashMap::new()
        };

        Ok(Self {
            path,
            inner: RwLock::new(events),
        })
    }

    /// Insert or merge one event.
    ///
    /// New id: insert and persist. Known id with a changed content hash:
    /// carry the stored `discovered_at` forward (discovery time is immutable),
    /// stamp `updated_at`, replace, persist. Known id, same hash: no write at
    /// all — this is what makes re-scraping idempotent.
    pub fn save_event(&self, mut event: CivicEvent) -> Result<SaveStatus> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let event_id = event.event_id.clone();

        match map.get(&event_id) {
            None => {
                map.insert(event_id.clone(), event);
                if let Err(e) = Self::persist(&self.path, &map) {
                    map.remove(&event_id);
                    return Err(e);
                }
                Ok(SaveStatus::New)
            }
            Some(existing) if event.has_changed(existing) => {
                event.discovered_at = existing.discovered_at;
                event.updated_at = Utc::now();
                let previous = map.insert(event_id.clone(), event);
                if let Err(e) = Self::persist(&self.path, &map) {
                    if let Some(previous) = previous {
                        map.insert(event_id, previous);
                    }
                    return Err(e);
                }
                Ok(SaveStatus::Updated)
            }
            Some(_) => Ok(SaveStatus::Unchanged),
        }
    }

    /// Save a batch in list order. A failed persist is counted and logged;
    /// the remaining items still get their chance.
    pub fn save_events(&self, events: Vec<CivicEvent>) -> SaveCounts {
        let mut counts = SaveCounts::default();
        for event in events {
            let event_id = event.event_id.clone();
            match self.save_event(event) {
                Ok(SaveStatus::New) => counts.new += 1,
                Ok(SaveStatus::Updated) => counts.updated += 1,
                Ok(SaveStatus::Unchanged) => counts.unchanged += 1,
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "Failed to save event");
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    pub fn get_event(&self, event_id: &str) -> Option<CivicEvent> {
        self.read_map().get(event_id).cloned()
    }

    /// Filtered query sorted by event time, newest first.
    pub fn get_events(&self, filter: &EventFilter) -> Vec<CivicEvent> {
        let map = self.read_map();
        let mut events: Vec<CivicEvent> = map.values().filter(|e| filter.accepts(e)).cloned().collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        events
    }

    /// "What did we learn about recently" — filters and orders on discovery
    /// time, not event time. Tag filtering here is ANY-match.
    pub fn get_whats_new(
        &self,
        hours: i64,
        source_id: Option<&str>,
        any_tags: Option<&[String]>,
    ) -> Vec<CivicEvent> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let map = self.read_map();
        let mut events: Vec<CivicEvent> = map
            .values()
            .filter(|e| e.discovered_at >= cutoff)
            .filter(|e| source_id.is_none_or(|s| e.source_id == s))
            .filter(|e| match any_tags {
                Some(tags) if !tags.is_empty() => e.matches_any_tag(tags),
                _ => true,
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.discovered_at.cmp(&a.discovered_at));
        events
    }

    /// "What is happening soon" — event time inside `[now, now + days]`,
    /// soonest first.
    pub fn get_upcoming(&self, days: i64, event_type: Option<EventType>) -> Vec<CivicEvent> {
        let now = Utc::now();
        let until = now + Duration::days(days);
        let map = self.read_map();
        let mut events: Vec<CivicEvent> = map
            .values()
            .filter(|e| e.timestamp >= now && e.timestamp <= until)
            .filter(|e| event_type.is_none_or(|t| e.event_type == t))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        events
    }

    /// Substring match against each event's entities' normalized names.
    pub fn get_by_entity(&self, name: &str) -> Vec<CivicEvent> {
        let needle = civicwatch_common::normalize_name(name);
        if needle.is_empty() {
            return Vec::new();
        }
        let map = self.read_map();
        let mut events: Vec<CivicEvent> = map
            .values()
            .filter(|e| {
                e.entities
                    .iter()
                    .any(|entity| entity.normalized_name.contains(&needle))
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }

    /// Match on `location.county` (case-insensitive) or the county-derived
    /// tags (`alachua` / `alachua-county`).
    pub fn get_by_county(&self, county: &str) -> Vec<CivicEvent> {
        let lower = county.trim().to_lowercase();
        let slug = civicwatch_common::slugify(&lower);
        let tag = if slug.ends_with("-county") {
            slug.clone()
        } else {
            format!("{slug}-county")
        };
        let map = self.read_map();
        let mut events: Vec<CivicEvent> = map
            .values()
            .filter(|e| {
                let by_location = e
                    .location
                    .as_ref()
                    .and_then(|l| l.county.as_deref())
                    .is_some_and(|c| c.to_lowercase() == lower);
                by_location || e.tags.contains(&slug) || e.tags.contains(&tag)
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }

    pub fn count_events(&self, filter: &EventFilter) -> usize {
        self.read_map().values().filter(|e| filter.accepts(e)).count()
    }

    /// Distinct source ids, sorted.
    pub fn get_sources(&self) -> Vec<String> {
        let map = self.read_map();
        let mut sources: Vec<String> = map.values().map(|e| e.source_id.clone()).collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Distinct tags across all events, sorted.
    pub fn get_all_tags(&self) -> Vec<String> {
        let map = self.read_map();
        let mut tags: Vec<String> = map.values().flat_map(|e| e.tags.iter().cloned()).collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Remove one event. Returns whether it existed. Persists on removal.
    pub fn delete_event(&self, event_id: &str) -> Result<bool> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.remove(event_id) {
            Some(removed) => {
                if let Err(e) = Self::persist(&self.path, &map) {
                    map.insert(event_id.to_string(), removed);
                    return Err(e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Wipe all state, in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::take(&mut *map);
        if let Err(e) = Self::persist(&self.path, &map) {
            *map = previous;
            return Err(e);
        }
        Ok(())
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CivicEvent>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the snapshot via temp-file-and-rename so the commit is atomic:
    /// either the new snapshot fully lands or the old one survives.
    fn persist(path: &Path, map: &HashMap<String, CivicEvent>) -> Result<()> {
        let mut events: Vec<CivicEvent> = map.values().cloned().collect();
        events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
        let snapshot = Snapshot {
            last_updated: Utc::now(),
            event_count: events.len(),
            events,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path).map_err(|e| {
            CivicError::Store(format!(
                "failed to commit snapshot {}: {e}",
                path.display()
            ))
        })?;
        Ok(())
    }
}
