//! Persistence of the last successful comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weatherprob_core::CacheError;
use weatherprob_stats::{DateRange, Location, WeatherStats};

use crate::store::LocalStore;

pub const COMPARISON_CACHE_KEY: &str = "comparisonToolCache";

/// Bumped whenever the entry layout changes; older entries are discarded.
pub const COMPARISON_CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonInputs {
    pub location_a: Location,
    pub date_range_a: DateRange,
    pub location_b: Location,
    pub date_range_b: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResults {
    pub results_a: WeatherStats,
    pub results_b: WeatherStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonCacheEntry {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub inputs: ComparisonInputs,
    pub results: ComparisonResults,
}

#[derive(Debug, Clone)]
pub struct ComparisonCache {
    store: LocalStore,
    ttl: chrono::Duration,
}

impl ComparisonCache {
    pub fn new(store: LocalStore, ttl: chrono::Duration) -> Self {
        Self { store, ttl }
    }

    /// The saved entry, if it is readable, current and not expired.
    /// Anything else is deleted.
    pub fn load(&self) -> Option<ComparisonCacheEntry> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Option<ComparisonCacheEntry> {
        let entry = match self.store.get::<ComparisonCacheEntry>(COMPARISON_CACHE_KEY) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("{} ({})", e.user_message(), e);
                self.clear();
                return None;
            }
        };

        if entry.version != COMPARISON_CACHE_VERSION {
            tracing::info!(
                "Discarding saved comparison with version {} (expected {})",
                entry.version,
                COMPARISON_CACHE_VERSION
            );
            self.clear();
            return None;
        }

        if now.signed_duration_since(entry.saved_at) > self.ttl {
            tracing::info!("Saved comparison from {} has expired", entry.saved_at);
            self.clear();
            return None;
        }

        Some(entry)
    }

    pub fn save(
        &self,
        inputs: ComparisonInputs,
        results: ComparisonResults,
    ) -> Result<ComparisonCacheEntry, CacheError> {
        let entry = ComparisonCacheEntry {
            version: COMPARISON_CACHE_VERSION,
            saved_at: Utc::now(),
            inputs,
            results,
        };
        self.store.set(COMPARISON_CACHE_KEY, &entry)?;
        Ok(entry)
    }

    pub fn clear(&self) {
        self.store.remove(COMPARISON_CACHE_KEY);
    }

    pub fn exists(&self) -> bool {
        self.store.contains(COMPARISON_CACHE_KEY)
    }
}
