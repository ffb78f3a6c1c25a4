use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Coordinates, WeatherReport};

/// Coordinate precision for cache keys: two decimal places (~1.1 km). Small
/// movements collapse onto one key; neighbouring cities stay distinct.
pub fn cache_key(coords: Coordinates) -> String {
    format!("{:.2},{:.2}", coords.lat, coords.lon)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    report: WeatherReport,
    fetched_at: DateTime<Utc>,
}

/// One cache entry as exposed by [`WeatherCache::snapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryView {
    pub key: String,
    pub report: WeatherReport,
    pub fetched_at: DateTime<Utc>,
    pub age_seconds: i64,
    pub is_valid: bool,
    pub expires_in_seconds: i64,
}

/// Diagnostic view over the whole cache. Pure read; producing it is not a
/// cache hit and mutates nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub entries: Vec<CacheEntryView>,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub ttl_seconds: u64,
}

/// In-memory TTL cache for normalized reports.
///
/// Entries are created only on provider success, replaced wholesale on
/// refresh, and evicted lazily: an expired entry simply stops being served
/// and is overwritten by the next successful fetch for its key.
#[derive(Debug)]
pub struct WeatherCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_secs: u64,
}

impl WeatherCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Returns the cached report for `key` iff it is still within the TTL.
    pub fn get_fresh(&self, key: &str) -> Option<WeatherReport> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        if self.age_secs(entry, Utc::now()) < self.ttl_secs as i64 {
            Some(entry.report.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite; `fetched_at` is always call time.
    pub fn put(&self, key: String, report: WeatherReport) {
        self.put_at(key, report, Utc::now());
    }

    fn put_at(&self, key: String, report: WeatherReport, fetched_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key, CacheEntry { report, fetched_at });
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let now = Utc::now();
        let ttl = self.ttl_secs as i64;
        let entries = self.entries.lock().expect("cache lock poisoned");

        let mut views: Vec<CacheEntryView> = entries
            .iter()
            .map(|(key, entry)| {
                let age = self.age_secs(entry, now);
                CacheEntryView {
                    key: key.clone(),
                    report: entry.report.clone(),
                    fetched_at: entry.fetched_at,
                    age_seconds: age,
                    is_valid: age < ttl,
                    expires_in_seconds: ttl - age,
                }
            })
            .collect();
        views.sort_by(|a, b| a.key.cmp(&b.key));

        let valid = views.iter().filter(|v| v.is_valid).count();
        CacheSnapshot {
            total_entries: views.len(),
            valid_entries: valid,
            expired_entries: views.len() - valid,
            ttl_seconds: self.ttl_secs,
            entries: views,
        }
    }

    fn age_secs(&self, entry: &CacheEntry, now: DateTime<Utc>) -> i64 {
        (now - entry.fetched_at).num_seconds()
    }

    /// Backdate an entry to simulate passage of time. Test use only.
    #[cfg(test)]
    fn put_aged(&self, key: String, report: WeatherReport, age_secs: i64) {
        self.put_at(key, report, Utc::now() - chrono::Duration::seconds(age_secs));
    }
}
