use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::location::ResolvedLocation;

/// Concurrent map whose entries expire a fixed time after insertion
pub struct TtlCache<K, V> {
    entries: DashMap<K, (Instant, V)>,
    ttl: Duration,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key`; an expired entry is dropped on the way out
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, value) = entry.value();
            if *expires_at > now {
                return Some(value.clone());
            }
        }
        self.entries.remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now() + self.ttl, value));
    }

    /// Drop every expired entry, returning how many went
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Entry count, expired entries included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared by forward and reverse lookups; keys are namespaced per direction
pub type GeoCache = Arc<TtlCache<String, ResolvedLocation>>;

pub fn create_geo_cache(ttl: Duration) -> GeoCache {
    Arc::new(TtlCache::new(ttl))
}

pub fn place_cache_key(place_name: &str) -> String {
    format!("place:{}", place_name.trim().to_lowercase())
}

/// Four decimals is roughly 11 m, well inside one forecast grid cell
pub fn coordinate_cache_key(latitude: f64, longitude: f64) -> String {
    format!("coords:{:.4},{:.4}", latitude, longitude)
}

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically sweep expired geocoding results, at most once an hour
pub fn start_cache_cleanup_task(cache: GeoCache) -> tokio::task::JoinHandle<()> {
    let period = cache.ttl().clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately and there is nothing to sweep yet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = cache.len(),
                    "Swept expired geocoding results"
                );
            }
        }
    })
}
