//! View-state models for the WeatherProb dashboard.
//!
//! Each view (analysis, comparison, heatmap, perfect-day finder, time
//! series, place search) owns its validate / load / error / result state
//! behind a mutex so a renderer can snapshot it while requests are in flight.

pub mod analysis;
pub mod cache;
pub mod comparison;
pub mod debounce;
pub mod heatmap;
pub mod location_search;
pub mod perfect_day;
pub mod store;
pub mod time_series;
pub mod views;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use weatherprob_core::Config;
use weatherprob_stats::{Geocoder, StatsClient};

pub use analysis::{AnalysisForm, AnalysisModel, AnalysisState, Period};
pub use cache::{ComparisonCache, ComparisonCacheEntry, COMPARISON_CACHE_KEY};
pub use comparison::{ComparisonModel, ComparisonRow, ComparisonState, Scenario, Side};
pub use heatmap::{HeatmapExplorer, HeatmapState};
pub use location_search::{LocationSearch, LocationSearchState};
pub use perfect_day::{PerfectDayFinder, PerfectDayState};
pub use store::LocalStore;
pub use time_series::{TimeSeriesModel, TimeSeriesViewer};
pub use views::{ResultsView, ViewError};

const MAX_CACHE_TTL_HOURS: i64 = 24 * 365 * 100;

/// Shared clients and settings the view models are built from.
#[derive(Clone)]
pub struct DashboardServices {
    pub client: Arc<StatsClient>,
    pub geocoder: Arc<Geocoder>,
    pub config: Arc<Config>,
}

impl DashboardServices {
    pub fn from_config(config: Config) -> Result<Self> {
        let client = StatsClient::from_config(&config.api)
            .context("Failed to create statistics client")?;
        let geocoder = Geocoder::from_config(&config.geocoding)
            .context("Failed to create geocoder")?;

        tracing::info!("Statistics backend: {}", client.base_url());
        Ok(Self {
            client: Arc::new(client),
            geocoder: Arc::new(geocoder),
            config: Arc::new(config),
        })
    }

    pub fn analysis(&self) -> AnalysisModel {
        AnalysisModel::new(self.client.clone())
    }

    pub fn comparison_cache(&self) -> ComparisonCache {
        // Capped at a century so the duration cannot overflow.
        let ttl_hours = i64::try_from(self.config.dashboard.comparison_cache_ttl_hours)
            .unwrap_or(MAX_CACHE_TTL_HOURS)
            .min(MAX_CACHE_TTL_HOURS);
        ComparisonCache::new(
            LocalStore::new(&self.config.dashboard.cache_dir),
            chrono::Duration::hours(ttl_hours),
        )
    }

    pub fn comparison(&self) -> ComparisonModel {
        ComparisonModel::new(self.client.clone(), self.comparison_cache())
    }

    pub fn heatmap(&self, today: chrono::NaiveDate) -> HeatmapExplorer {
        HeatmapExplorer::new(
            self.client.clone(),
            Duration::from_millis(self.config.dashboard.heatmap_debounce_ms),
            today,
        )
    }

    pub fn perfect_day(&self) -> PerfectDayFinder {
        PerfectDayFinder::new(self.client.clone())
    }

    pub fn time_series(&self) -> TimeSeriesModel {
        TimeSeriesModel::new(self.client.clone())
    }

    pub fn location_search(&self) -> LocationSearch {
        LocationSearch::new(
            self.geocoder.clone(),
            Duration::from_millis(self.config.dashboard.search_debounce_ms),
        )
    }
}
