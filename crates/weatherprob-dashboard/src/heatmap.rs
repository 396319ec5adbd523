//! Heatmap explorer: refetches heat cells as the map moves, debounced.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use weatherprob_stats::{DateRange, HeatPoint, HeatmapQuery, MapBounds, StatsClient};

use crate::debounce::Debouncer;
use crate::views::ViewError;

/// Default window: two weeks starting three months out.
pub fn default_date_range(today: NaiveDate) -> DateRange {
    DateRange {
        from: today.checked_add_days(Days::new(90)),
        to: today.checked_add_days(Days::new(104)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeatmapState {
    pub loading: bool,
    pub points: Vec<HeatPoint>,
    /// Bounds after the debounce window settled
    pub bounds: Option<MapBounds>,
    pub date_range: DateRange,
    /// The query behind `points`
    pub last_query: Option<HeatmapQuery>,
    /// Most recent failure; `points` still hold the previous data
    pub last_error: Option<ViewError>,
    /// Token of the fetch allowed to publish results
    active: Option<CancellationToken>,
}

pub struct HeatmapExplorer {
    client: Arc<StatsClient>,
    state: Arc<Mutex<HeatmapState>>,
    debouncer: Debouncer,
}

impl HeatmapExplorer {
    pub fn new(client: Arc<StatsClient>, debounce: Duration, today: NaiveDate) -> Self {
        let state = HeatmapState {
            date_range: default_date_range(today),
            ..Default::default()
        };
        Self {
            client,
            state: Arc::new(Mutex::new(state)),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn snapshot(&self) -> HeatmapState {
        self.state.lock().clone()
    }

    /// Map moved. Only the last bounds of a burst are fetched, once the
    /// debounce window has passed.
    pub fn bounds_changed(&self, bounds: MapBounds) {
        let client = self.client.clone();
        let state = self.state.clone();

        self.debouncer.call(move |token| async move {
            state.lock().bounds = Some(bounds);
            fetch(client, state, token).await;
        });
    }

    /// New date range: refetch right away if the map has reported bounds.
    pub fn set_date_range(&self, range: DateRange) {
        let has_bounds = {
            let mut state = self.state.lock();
            state.date_range = range;
            state.bounds.is_some()
        };
        if !has_bounds {
            return;
        }

        let client = self.client.clone();
        let state = self.state.clone();
        tokio::spawn(fetch(client, state, CancellationToken::new()));
    }

    /// Set bounds without debouncing and fetch in place.
    pub async fn refresh_with(&self, bounds: MapBounds) {
        self.debouncer.cancel();
        self.state.lock().bounds = Some(bounds);
        fetch(
            self.client.clone(),
            self.state.clone(),
            CancellationToken::new(),
        )
        .await;
    }
}

/// Fetch for the current bounds and range, if both are known.
///
/// Every call becomes the active fetch and cancels the previous one in the
/// same critical section that reads the query, so the published points always
/// match the latest bounds and range. A call without a complete query still
/// takes over and clears `loading`.
async fn fetch(
    client: Arc<StatsClient>,
    state: Arc<Mutex<HeatmapState>>,
    token: CancellationToken,
) {
    let query = {
        let mut s = state.lock();
        if let Some(previous) = s.active.replace(token.clone()) {
            previous.cancel();
        }
        let (Some(bounds), Some((start, end))) = (s.bounds, s.date_range.bounds()) else {
            s.loading = false;
            return;
        };
        s.loading = true;
        HeatmapQuery { bounds, start, end }
    };

    tracing::debug!("Fetching heatmap for {:?}", query.bounds);
    let result = client.weather_heatmap_cancellable(&query, &token).await;

    let mut s = state.lock();
    if token.is_cancelled() {
        tracing::debug!("Discarding superseded heatmap response");
        return;
    }
    s.loading = false;
    match result {
        Ok(points) => {
            tracing::info!("Heatmap updated with {} cells", points.len());
            s.points = points;
            s.last_query = Some(query);
            s.last_error = None;
        }
        Err(e) => {
            tracing::error!("Failed to fetch heatmap data: {}", e);
            s.last_error = Some(ViewError::request(e.detail()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_date_range() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let range = default_date_range(today);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2027, 1, 16));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2027, 1, 30));
    }
}
