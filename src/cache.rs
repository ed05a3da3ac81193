//! Geographic result cache
//!
//! Sits in front of slow or rate-limited categories (notably weather).
//! Entries are keyed by approximate coordinates: two points within
//! `epsilon` degrees of Euclidean distance are the same place. This is a
//! deliberate coarse approximation, not geodesic distance.
//!
//! Expiry is lazy: `lookup` drops entries past their TTL before matching.
//! When the entry cap is hit, the oldest entry by store time is evicted —
//! oldest-first, not LRU, matching the small expected entry count.

use crate::types::Payload;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    latitude: f64,
    longitude: f64,
    payload: Payload,
    stored_at: Instant,
}

/// Coordinate-keyed payload cache with TTL and proximity matching
///
/// The single mutex is sufficient: the expected entry count is at most a few
/// hundred and every operation is a short linear scan.
pub struct GeoCache {
    ttl: Duration,
    epsilon: f64,
    max_entries: usize,
    entries: Mutex<Vec<CacheEntry>>,
}

impl GeoCache {
    pub fn new(ttl: Duration, epsilon: f64, max_entries: usize) -> Self {
        Self {
            ttl,
            epsilon,
            max_entries: max_entries.max(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Look up a payload for a location, evicting expired entries first
    pub fn lookup(&self, latitude: f64, longitude: f64) -> Option<Payload> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        entries.retain(|entry| now.duration_since(entry.stored_at) <= self.ttl);

        let hit = entries
            .iter()
            .find(|entry| self.is_close(entry, latitude, longitude))
            .map(|entry| entry.payload.clone());

        if hit.is_some() {
            debug!(latitude, longitude, "Cache hit");
        }
        hit
    }

    /// Store a payload, replacing any entry within epsilon of the location
    pub fn store(&self, latitude: f64, longitude: f64, payload: Payload) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        entries.retain(|entry| !self.is_close(entry, latitude, longitude));

        if entries.len() >= self.max_entries {
            // Evict the oldest entry by store time
            if let Some(oldest) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(i, _)| i)
            {
                entries.remove(oldest);
            }
        }

        entries.push(CacheEntry {
            latitude,
            longitude,
            payload,
            stored_at: Instant::now(),
        });
        debug!(latitude, longitude, entries = entries.len(), "Cache store");
    }

    /// Entry count (expired entries included until the next lookup)
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_close(&self, entry: &CacheEntry, latitude: f64, longitude: f64) -> bool {
        let dlat = entry.latitude - latitude;
        let dlon = entry.longitude - longitude;
        (dlat * dlat + dlon * dlon).sqrt() < self.epsilon
    }
}
