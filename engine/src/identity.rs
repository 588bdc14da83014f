//! Identity Mapper: stable synthetic IDs for the legacy protocol, where events arrive keyed
//! only by `(ModeSCode, TrackNumber, Facility)` rather than a GUFI.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Silence window after which a tuple is evicted (spec: 5 minutes).
pub const EVICTION_SECS: i64 = 300;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct TrackKey {
    mode_s: String,
    track_num: i64,
    facility: String,
}

struct Entry {
    id: u64,
    last_seen: DateTime<Utc>,
}

/// Maps `(ModeSCode, TrackNumber, Facility)` tuples to stable synthetic IDs, evicting entries
/// silent for longer than [`EVICTION_SECS`].
pub struct IdentityMapper {
    next_id: AtomicU64,
    entries: Mutex<HashMap<TrackKey, Entry>>,
}

impl Default for IdentityMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityMapper {
    pub fn new() -> Self {
        IdentityMapper { next_id: AtomicU64::new(1), entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the stable id for this tuple, minting a fresh one on first sighting. Lazily
    /// evicts the looked-up entry itself if it has gone silent past the eviction window.
    pub fn resolve(&self, mode_s: &str, track_num: i64, facility: &str, now: DateTime<Utc>) -> u64 {
        let key = TrackKey { mode_s: mode_s.to_string(), track_num, facility: facility.to_string() };
        let mut entries = self.entries.lock().expect("identity map mutex poisoned");

        if let Some(entry) = entries.get(&key) {
            if now - entry.last_seen <= Duration::seconds(EVICTION_SECS) {
                let id = entry.id;
                entries.insert(key, Entry { id, last_seen: now });
                return id;
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(key, Entry { id, last_seen: now });
        id
    }

    /// Sweeps every tuple silent past the eviction window. Called from the same periodic
    /// sweeper as the flight-state store's staleness pass.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("identity map mutex poisoned");
        entries.retain(|_, entry| now - entry.last_seen <= Duration::seconds(EVICTION_SECS));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("identity map mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tuple_returns_same_id() {
        let mapper = IdentityMapper::new();
        let now = Utc::now();
        let a = mapper.resolve("ABC123", 42, "BOS", now);
        let b = mapper.resolve("ABC123", 42, "BOS", now + Duration::seconds(10));
        assert_eq!(a, b);
    }

    #[test]
    fn silence_past_eviction_mints_a_fresh_id() {
        let mapper = IdentityMapper::new();
        let t0 = Utc::now();
        let a = mapper.resolve("ABC123", 42, "BOS", t0);
        let b = mapper.resolve("ABC123", 42, "BOS", t0 + Duration::seconds(EVICTION_SECS + 1));
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_evicts_silent_tuples() {
        let mapper = IdentityMapper::new();
        let t0 = Utc::now();
        mapper.resolve("ABC123", 42, "BOS", t0);
        assert_eq!(mapper.len(), 1);
        mapper.sweep(t0 + Duration::seconds(EVICTION_SECS + 1));
        assert!(mapper.is_empty());
    }
}
