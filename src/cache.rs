//! Local durable cache: the key/value seam and its typed entries.
//!
//! DESIGN
//! ======
//! The cache is best-effort. Readers never fail: a missing key, a value that
//! is not JSON, or an entry that does not decode is treated as absent, entry
//! by entry, so one corrupt coordinate does not throw away a whole page.
//! Writers return `CacheError` so callers can report the failure without
//! rolling back in-memory state.
//!
//! Keys: `buttonPositions:<page>`, `buttonSizes:<page>`,
//! `buttonColor:<button>`, and a single `buttonTimerLocks` map.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::consts::{COLOR_KEY_PREFIX, POSITIONS_KEY_PREFIX, SIZES_KEY_PREFIX, TIMER_LOCKS_KEY};
use crate::model::{ButtonId, PageId, Position, PositionMap, Size, SizeMap};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache write failed for {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("cache encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value storage scoped to one browser session.
pub trait LocalCache {
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Write` when the backing storage refuses the write.
    fn set(&mut self, key: &str, value: String) -> Result<(), CacheError>;

    fn remove(&mut self, key: &str);

    fn keys(&self) -> Vec<String>;
}

/// Cache held in process memory. Used by tests and the demo host.
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// =============================================================================
// KEYS
// =============================================================================

#[must_use]
pub fn positions_key(page_id: &PageId) -> String {
    format!("{POSITIONS_KEY_PREFIX}{page_id}")
}

#[must_use]
pub fn sizes_key(page_id: &PageId) -> String {
    format!("{SIZES_KEY_PREFIX}{page_id}")
}

#[must_use]
pub fn color_key(button_id: &ButtonId) -> String {
    format!("{COLOR_KEY_PREFIX}{button_id}")
}

// =============================================================================
// TYPED ENTRIES
// =============================================================================

/// Read an id-keyed JSON map, keeping only entries that decode and pass `valid`.
fn read_map<V, F>(cache: &impl LocalCache, key: &str, valid: F) -> BTreeMap<ButtonId, V>
where
    V: DeserializeOwned,
    F: Fn(&V) -> bool,
{
    let Some(raw) = cache.get(key) else {
        return BTreeMap::new();
    };
    let parsed: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            debug!(key, error = %e, "cache entry is not json; treating as empty");
            return BTreeMap::new();
        }
    };
    let Some(object) = parsed.as_object() else {
        debug!(key, "cache entry is not a map; treating as empty");
        return BTreeMap::new();
    };

    let mut out = BTreeMap::new();
    for (raw_id, raw_value) in object {
        let Ok(id) = raw_id.parse::<ButtonId>() else {
            debug!(key, entry = %raw_id, "skipping cache entry with malformed id");
            continue;
        };
        match serde_json::from_value::<V>(raw_value.clone()) {
            Ok(value) if valid(&value) => {
                out.insert(id, value);
            }
            _ => debug!(key, %id, "skipping malformed cache entry"),
        }
    }
    out
}

fn write_json<T: Serialize>(cache: &mut impl LocalCache, key: &str, value: &T) -> Result<(), CacheError> {
    let encoded = serde_json::to_string(value)?;
    cache.set(key, encoded)
}

/// Cached positions for a page. Non-finite coordinates count as missing.
#[must_use]
pub fn read_positions(cache: &impl LocalCache, page_id: &PageId) -> PositionMap {
    read_map(cache, &positions_key(page_id), Position::is_finite)
}

/// Replace the cached position map for a page.
///
/// # Errors
///
/// Propagates the cache's write failure.
pub fn write_positions(cache: &mut impl LocalCache, page_id: &PageId, positions: &PositionMap) -> Result<(), CacheError> {
    write_json(cache, &positions_key(page_id), positions)
}

/// Cached sizes for a page. Non-positive or non-finite sizes count as missing.
#[must_use]
pub fn read_sizes(cache: &impl LocalCache, page_id: &PageId) -> SizeMap {
    read_map(cache, &sizes_key(page_id), Size::is_valid)
}

/// Replace the cached size map for a page.
///
/// # Errors
///
/// Propagates the cache's write failure.
pub fn write_sizes(cache: &mut impl LocalCache, page_id: &PageId, sizes: &SizeMap) -> Result<(), CacheError> {
    write_json(cache, &sizes_key(page_id), sizes)
}

/// Cached background color override for a button.
#[must_use]
pub fn read_color(cache: &impl LocalCache, button_id: &ButtonId) -> Option<String> {
    cache.get(&color_key(button_id)).filter(|c| !c.trim().is_empty())
}

/// Store a background color override for a button.
///
/// # Errors
///
/// Propagates the cache's write failure.
pub fn write_color(cache: &mut impl LocalCache, button_id: &ButtonId, color: &str) -> Result<(), CacheError> {
    cache.set(&color_key(button_id), color.to_string())
}

/// Absolute unlock timestamps (ms since epoch) keyed by button id.
#[must_use]
pub fn read_locks(cache: &impl LocalCache) -> BTreeMap<ButtonId, i64> {
    read_map(cache, TIMER_LOCKS_KEY, |_: &i64| true)
}

/// Replace the cached lock table.
///
/// # Errors
///
/// Propagates the cache's write failure.
pub fn write_locks(cache: &mut impl LocalCache, locks: &BTreeMap<ButtonId, i64>) -> Result<(), CacheError> {
    write_json(cache, TIMER_LOCKS_KEY, locks)
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Counts of what a reconciliation pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub removed_keys: usize,
    pub removed_entries: usize,
}

/// Drop cached entries that reference buttons or pages no longer loaded.
///
/// Position and size maps of unknown pages are deleted outright. Maps of
/// known pages are rewritten without ids missing from `button_ids`. Color
/// keys and lock entries of missing buttons are removed.
///
/// # Errors
///
/// Returns the first write failure; entries already cleaned stay cleaned.
pub fn reconcile(
    cache: &mut impl LocalCache,
    page_ids: &HashSet<PageId>,
    button_ids: &HashSet<ButtonId>,
) -> Result<Reconciled, CacheError> {
    let mut summary = Reconciled::default();

    for key in cache.keys() {
        if let Some(raw_page) = key.strip_prefix(POSITIONS_KEY_PREFIX) {
            let Some(page) = known_page(raw_page, page_ids) else {
                cache.remove(&key);
                summary.removed_keys += 1;
                continue;
            };
            let mut map = read_positions(cache, &page);
            let removed = retain_known(&mut map, button_ids);
            if removed > 0 {
                summary.removed_entries += removed;
                write_positions(cache, &page, &map)?;
            }
        } else if let Some(raw_page) = key.strip_prefix(SIZES_KEY_PREFIX) {
            let Some(page) = known_page(raw_page, page_ids) else {
                cache.remove(&key);
                summary.removed_keys += 1;
                continue;
            };
            let mut map = read_sizes(cache, &page);
            let removed = retain_known(&mut map, button_ids);
            if removed > 0 {
                summary.removed_entries += removed;
                write_sizes(cache, &page, &map)?;
            }
        } else if let Some(raw_button) = key.strip_prefix(COLOR_KEY_PREFIX) {
            let known = raw_button.parse::<ButtonId>().is_ok_and(|id| button_ids.contains(&id));
            if !known {
                cache.remove(&key);
                summary.removed_keys += 1;
            }
        }
    }

    let mut locks = read_locks(cache);
    let removed = retain_known(&mut locks, button_ids);
    if removed > 0 {
        summary.removed_entries += removed;
        write_locks(cache, &locks)?;
    }

    Ok(summary)
}

fn known_page(raw: &str, page_ids: &HashSet<PageId>) -> Option<PageId> {
    raw.parse::<PageId>().into_iter().find(|page| page_ids.contains(page))
}

fn retain_known<V>(map: &mut BTreeMap<ButtonId, V>, button_ids: &HashSet<ButtonId>) -> usize {
    let before = map.len();
    map.retain(|id, _| button_ids.contains(id));
    before - map.len()
}

/// Remove every cached entry belonging to a deleted page and its buttons.
///
/// # Errors
///
/// Returns the write failure if the lock table could not be rewritten.
pub fn forget_page(cache: &mut impl LocalCache, page_id: &PageId, button_ids: &[ButtonId]) -> Result<(), CacheError> {
    cache.remove(&positions_key(page_id));
    cache.remove(&sizes_key(page_id));
    for id in button_ids {
        cache.remove(&color_key(id));
    }
    let mut locks = read_locks(cache);
    let before = locks.len();
    locks.retain(|id, _| !button_ids.contains(id));
    if locks.len() != before {
        write_locks(cache, &locks)?;
    }
    Ok(())
}
