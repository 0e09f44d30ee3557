//! Honest response cache.
//!
//! Entries are validated on every read and deleted in the same critical
//! section when they fail, so a stale, low-confidence or corrupted entry is
//! never handed out. Reused responses carry explicit cache metadata.
//!
//! Concurrent misses for the same key are serialised with per-key leases.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::response::{DetailLevel, ResponseOrigin, SynthesizedResponse};
use crate::text;

/// Hash of a normalised query and detail level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key for a query and level.
    #[must_use]
    pub fn new(query: &str, level: DetailLevel) -> Self {
        Self::from_normalized(&text::normalize(query), level)
    }

    fn from_normalized(normalized: &str, level: DetailLevel) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(normalized.as_bytes());
        hasher.update(&[0x1f]);
        hasher.update(level.as_str().as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Entry key.
    pub key: CacheKey,
    /// Normalised query the entry was written for.
    pub query: String,
    /// Detail level the entry was written for.
    pub detail_level: DetailLevel,
    /// The live response as first computed.
    pub response: SynthesizedResponse,
    /// When written.
    pub created_at: DateTime<Utc>,
    /// When last validated on a read.
    pub last_validated_at: DateTime<Utc>,
    /// Reads served plus the original write.
    pub hit_count: u64,
}

/// Why an entry was dropped on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Older than the TTL.
    Expired,
    /// Confidence below the floor.
    BelowFloor,
    /// Stored query empty or not matching its key.
    Corrupted,
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::BelowFloor => write!(f, "below confidence floor"),
            Self::Corrupted => write!(f, "corrupted"),
        }
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Valid entries served.
    pub hits: u64,
    /// Reads that found nothing usable.
    pub misses: u64,
    /// Entries removed to respect capacity.
    pub evictions: u64,
    /// Entries removed because validation failed.
    pub invalidations: u64,
    /// Entries currently stored.
    pub entries: usize,
}

type LeaseMap = HashMap<CacheKey, Arc<AsyncMutex<()>>>;

/// Exclusive right to compute and write one key.
///
/// Dropping the lease releases the key.
#[derive(Debug)]
pub struct KeyLease {
    key: CacheKey,
    leases: Arc<Mutex<LeaseMap>>,
    _guard: OwnedMutexGuard<()>,
}

impl KeyLease {
    /// The leased key.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl Drop for KeyLease {
    fn drop(&mut self) {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this guard hold the only references when nobody waits.
        let idle = leases
            .get(&self.key)
            .is_some_and(|m| Arc::strong_count(m) <= 2);
        if idle {
            leases.remove(&self.key);
        }
    }
}

/// Owned, mutex-guarded response cache.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    leases: Arc<Mutex<LeaseMap>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl ResponseCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            leases: Arc::new(Mutex::new(HashMap::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// The cache bounds.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up a valid entry.
    #[must_use]
    pub fn get(&self, query: &str, level: DetailLevel) -> Option<SynthesizedResponse> {
        self.get_at(query, level, Utc::now())
    }

    /// Looks up a valid entry as of `now`.
    ///
    /// Validation and deletion happen under one lock: a failing entry is
    /// removed and the call reports a miss.
    #[must_use]
    pub fn get_at(&self, query: &str, level: DetailLevel, now: DateTime<Utc>) -> Option<SynthesizedResponse> {
        let normalized = text::normalize(query);
        if normalized.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let key = CacheKey::from_normalized(&normalized, level);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get_mut(&key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "cache miss");
            return None;
        };

        if let Err(reason) = self.validate(entry, &normalized, level, now) {
            entries.remove(&key);
            drop(entries);
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            if reason == Invalidation::Corrupted {
                warn!(key = %key, "deleted corrupted cache entry");
            } else {
                debug!(key = %key, reason = %reason, "deleted invalid cache entry");
            }
            return None;
        }

        entry.hit_count = entry.hit_count.saturating_add(1);
        entry.last_validated_at = now;
        let response = entry.response.clone().into_cached(entry.created_at, entry.hit_count);
        drop(entries);

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, hit_count = response.cache_info.as_ref().map_or(0, |i| i.hit_count), "cache hit");
        Some(response)
    }

    fn validate(
        &self,
        entry: &CacheEntry,
        normalized: &str,
        level: DetailLevel,
        now: DateTime<Utc>,
    ) -> Result<(), Invalidation> {
        if entry.query.is_empty() || entry.query != normalized || entry.detail_level != level {
            return Err(Invalidation::Corrupted);
        }
        let confidence = entry.response.confidence;
        if !confidence.is_finite() {
            return Err(Invalidation::Corrupted);
        }
        if now.signed_duration_since(entry.created_at) > self.config.ttl() {
            return Err(Invalidation::Expired);
        }
        if confidence < self.config.confidence_floor {
            return Err(Invalidation::BelowFloor);
        }
        Ok(())
    }

    /// Stores a response.
    pub fn put(&self, query: &str, level: DetailLevel, response: SynthesizedResponse) -> bool {
        self.put_at(query, level, response, Utc::now())
    }

    /// Stores a response as of `now`, evicting the oldest entry when full.
    ///
    /// Returns false for a blank query. Last writer wins for an existing key.
    pub fn put_at(
        &self,
        query: &str,
        level: DetailLevel,
        mut response: SynthesizedResponse,
        now: DateTime<Utc>,
    ) -> bool {
        let normalized = text::normalize(query);
        if normalized.is_empty() {
            return false;
        }
        let key = CacheKey::from_normalized(&normalized, level);

        response.origin = ResponseOrigin::Live;
        response.cache_info = None;

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let oldest = entries
                .values()
                .min_by_key(|e| e.created_at)
                .map(|e| e.key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %oldest, "evicted oldest cache entry");
            }
        }

        entries.insert(
            key.clone(),
            CacheEntry {
                key,
                query: normalized,
                detail_level: level,
                response,
                created_at: now,
                last_validated_at: now,
                hit_count: 1,
            },
        );
        true
    }

    /// Waits for exclusive use of a key.
    pub async fn lease(&self, query: &str, level: DetailLevel) -> KeyLease {
        let key = CacheKey::new(query, level);
        let slot = {
            let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(leases.entry(key.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        KeyLease {
            key,
            leases: Arc::clone(&self.leases),
            _guard: guard,
        }
    }

    /// Removes the entry for a query and level.
    pub fn invalidate(&self, query: &str, level: DetailLevel) -> bool {
        let key = CacheKey::new(query, level);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of stored entries, valid or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    #[cfg(test)]
    fn active_leases(&self) -> usize {
        self.leases.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;
    use crate::classifier::DomainVerdict;

    fn response(confidence: f32) -> SynthesizedResponse {
        SynthesizedResponse {
            content: "Reducers return effects.".to_string(),
            contributing_sources: Vec::new(),
            domain: DomainVerdict::unknown(),
            gaps: Vec::new(),
            detail_level: DetailLevel::Summary,
            confidence,
            origin: ResponseOrigin::Live,
            cache_info: None,
            warnings: Vec::new(),
            absent_sources: Vec::new(),
            source_ids: Vec::new(),
            detail_available: Vec::new(),
        }
    }

    #[test]
    fn test_key_normalizes_query() {
        assert_eq!(
            CacheKey::new("  What IS a Reducer ", DetailLevel::Summary),
            CacheKey::new("what is a reducer", DetailLevel::Summary)
        );
        assert_ne!(
            CacheKey::new("reducer", DetailLevel::Summary),
            CacheKey::new("reducer", DetailLevel::Pattern)
        );
        assert_eq!(CacheKey::new("reducer", DetailLevel::Summary).as_str().len(), 64);
    }

    #[test]
    fn test_round_trip_marks_cache_origin() {
        let cache = ResponseCache::default();
        let now = Utc::now();
        assert!(cache.put_at("what is a reducer", DetailLevel::Summary, response(0.8), now));

        let hit = cache.get_at("What is a reducer", DetailLevel::Summary, now).unwrap();
        assert_eq!(hit.origin, ResponseOrigin::Cache);
        let info = hit.cache_info.unwrap();
        assert!(info.is_from_cache);
        assert_eq!(info.hit_count, 2);
        assert_eq!(info.created_at, now);

        let again = cache.get_at("what is a reducer", DetailLevel::Summary, now).unwrap();
        assert_eq!(again.cache_info.unwrap().hit_count, 3);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_expired_entry_deleted_on_read() {
        let cache = ResponseCache::default();
        let written = Utc::now();
        cache.put_at("reducer", DetailLevel::Summary, response(0.9), written);

        let later = written + Duration::hours(24) + Duration::seconds(1);
        assert!(cache.get_at("reducer", DetailLevel::Summary, later).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_entry_at_exact_ttl_still_valid() {
        let cache = ResponseCache::default();
        let written = Utc::now();
        cache.put_at("reducer", DetailLevel::Summary, response(0.9), written);
        assert!(cache
            .get_at("reducer", DetailLevel::Summary, written + Duration::hours(24))
            .is_some());
    }

    #[test]
    fn test_below_floor_rejected_and_removed() {
        let cache = ResponseCache::default();
        let written = Utc::now();
        cache.put_at("reducer", DetailLevel::Summary, response(0.2), written);
        assert_eq!(cache.len(), 1);

        assert!(cache
            .get_at("reducer", DetailLevel::Summary, written + Duration::seconds(1))
            .is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_non_finite_confidence_treated_as_corrupted() {
        let cache = ResponseCache::default();
        cache.put("reducer", DetailLevel::Summary, response(f32::NAN));
        assert!(cache.get("reducer", DetailLevel::Summary).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mismatched_entry_treated_as_corrupted() {
        let cache = ResponseCache::default();
        let now = Utc::now();
        cache.put_at("reducer", DetailLevel::Summary, response(0.9), now);
        {
            let mut entries = cache.entries.lock().unwrap();
            let entry = entries.values_mut().next().unwrap();
            entry.query = "something else".to_string();
        }
        assert!(cache.get_at("reducer", DetailLevel::Summary, now).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_blank_query_never_cached() {
        let cache = ResponseCache::default();
        assert!(!cache.put("   ", DetailLevel::Summary, response(0.9)));
        assert!(cache.get("", DetailLevel::Summary).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ResponseCache::new(CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        });
        let t0 = Utc::now();
        cache.put_at("first", DetailLevel::Summary, response(0.9), t0);
        cache.put_at("second", DetailLevel::Summary, response(0.9), t0 + Duration::seconds(1));
        cache.put_at("third", DetailLevel::Summary, response(0.9), t0 + Duration::seconds(2));

        let now = t0 + Duration::seconds(3);
        assert!(cache.get_at("first", DetailLevel::Summary, now).is_none());
        assert!(cache.get_at("second", DetailLevel::Summary, now).is_some());
        assert!(cache.get_at("third", DetailLevel::Summary, now).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_resets_hit_count() {
        let cache = ResponseCache::default();
        let now = Utc::now();
        cache.put_at("reducer", DetailLevel::Summary, response(0.9), now);
        let _ = cache.get_at("reducer", DetailLevel::Summary, now);
        cache.put_at("reducer", DetailLevel::Summary, response(0.7), now);
        let hit = cache.get_at("reducer", DetailLevel::Summary, now).unwrap();
        assert_eq!(hit.cache_info.unwrap().hit_count, 2);
        assert!((hit.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_lease_serializes_same_key() {
        let cache = Arc::new(ResponseCache::default());
        let first = cache.lease("reducer", DetailLevel::Summary).await;

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let _lease = cache.lease("reducer", DetailLevel::Summary).await;
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // A different key is not blocked.
        let other = cache.lease("effect", DetailLevel::Summary).await;
        drop(other);

        drop(first);
        waiter.await.unwrap();
        assert_eq!(cache.active_leases(), 0);
    }
}
