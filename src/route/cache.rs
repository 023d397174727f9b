//! Persistent distance cache keyed by normalized location pairs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order-independent cache key: both locations lowercased and trimmed,
/// sorted, joined with "::". `cache_key("A", "B") == cache_key("B", "A")`.
pub fn cache_key(origin: &str, destination: &str) -> String {
    let mut pair = [
        origin.trim().to_lowercase(),
        destination.trim().to_lowercase(),
    ];
    pair.sort();
    format!("{}::{}", pair[0], pair[1])
}

/// One cached route lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub origin: String,
    pub destination: String,
    pub distance_miles: u32,
    pub duration_hours: f64,
    pub formatted_distance: String,
    pub formatted_duration: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Default)]
struct CacheState {
    loaded: bool,
    entries: HashMap<String, CacheEntry>,
}

/// Route cache with an idempotent load step and write-through persistence.
///
/// Constructed explicitly and injected into the route service; no global
/// state. File-backed in production, memory-only in tests. Concurrent
/// writers on the same key are last-write-wins, which is harmless because
/// a given location pair always resolves to the same route.
pub struct RouteCache {
    path: Option<PathBuf>,
    state: Mutex<CacheState>,
}

impl RouteCache {
    /// Cache persisted as a JSON file. The file is created on first insert.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Memory-only cache, for tests and cache-less runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Load the backing file if it exists. Safe to call repeatedly; only
    /// the first call does work. A file that fails to parse is treated as
    /// empty so one corrupt write cannot disable caching for the whole
    /// process; the next insert rewrites it.
    pub fn ensure_ready(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().expect("cache lock poisoned");
        if state.loaded {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if path.exists() {
                let bytes = std::fs::read(path)?;
                match serde_json::from_slice::<Vec<CacheEntry>>(&bytes) {
                    Ok(entries) => {
                        state.entries = entries
                            .into_iter()
                            .map(|e| (e.cache_key.clone(), e))
                            .collect();
                    }
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %err,
                            "route cache file is corrupt, starting empty"
                        );
                    }
                }
            }
        }
        state.loaded = true;
        Ok(())
    }

    /// Exact-key point lookup.
    pub fn find(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.ensure_ready()?;
        let state = self.state.lock().expect("cache lock poisoned");
        Ok(state.entries.get(key).cloned())
    }

    /// Insert and persist. Entries never expire once written.
    // TODO: cached routes are kept forever even though road conditions
    // drift; add a created_at max-age filter in find() once a TTL is agreed.
    pub fn insert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.ensure_ready()?;
        let snapshot: Vec<CacheEntry> = {
            let mut state = self.state.lock().expect("cache lock poisoned");
            state.entries.insert(entry.cache_key.clone(), entry);
            state.entries.values().cloned().collect()
        };
        if let Some(path) = &self.path {
            let json = serde_json::to_vec_pretty(&snapshot)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().expect("cache lock poisoned").entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str) -> CacheEntry {
        CacheEntry {
            cache_key: key.to_string(),
            origin: "Boston, MA".to_string(),
            destination: "New York, NY".to_string(),
            distance_miles: 215,
            duration_hours: 3.7,
            formatted_distance: "215 mi".to_string(),
            formatted_duration: "3 hours 42 mins".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn key_is_order_independent() {
        assert_eq!(cache_key("New York", "Boston"), cache_key("Boston", "New York"));
        assert_eq!(
            cache_key("  New York ", "boston"),
            cache_key("Boston", "new york")
        );
        assert_eq!(cache_key("Boston", "New York"), "boston::new york");
    }

    #[test]
    fn memory_cache_round_trips() {
        let cache = RouteCache::in_memory();
        let key = cache_key("Boston, MA", "New York, NY");
        assert!(cache.find(&key).unwrap().is_none());

        cache.insert(entry(&key)).unwrap();
        let found = cache.find(&key).unwrap().expect("entry should be present");
        assert_eq!(found.distance_miles, 215);
    }

    #[test]
    fn file_cache_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let key = cache_key("Boston, MA", "New York, NY");

        let cache = RouteCache::with_file(&path);
        cache.insert(entry(&key)).unwrap();

        let reloaded = RouteCache::with_file(&path);
        reloaded.ensure_ready().unwrap();
        let found = reloaded.find(&key).unwrap().expect("persisted entry");
        assert_eq!(found.formatted_duration, "3 hours 42 mins");
    }

    #[test]
    fn ensure_ready_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let cache = RouteCache::with_file(&path);
        cache.ensure_ready().unwrap();
        cache.ensure_ready().unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn corrupt_file_is_treated_as_empty_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(&path, "not json {").unwrap();

        let cache = RouteCache::with_file(&path);
        let key = cache_key("Boston, MA", "New York, NY");
        assert!(cache.find(&key).unwrap().is_none());

        // Caching keeps working and the next insert replaces the bad file.
        cache.insert(entry(&key)).unwrap();
        let reloaded = RouteCache::with_file(&path);
        assert_eq!(reloaded.find(&key).unwrap().unwrap().distance_miles, 215);
    }

    #[test]
    fn same_key_last_write_wins() {
        let cache = RouteCache::in_memory();
        let key = cache_key("a", "b");
        cache.insert(entry(&key)).unwrap();
        let mut second = entry(&key);
        second.distance_miles = 999;
        cache.insert(second).unwrap();
        assert_eq!(cache.find(&key).unwrap().unwrap().distance_miles, 999);
        assert_eq!(cache.len(), 1);
    }
}
