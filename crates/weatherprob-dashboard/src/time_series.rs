//! Daily time-series page and its chart cycler.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use weatherprob_stats::{
    DailyObservation, DateRange, Location, SeriesKind, StatsClient, StatsError, StatsQuery,
};

use crate::views::ViewError;

pub const MISSING_INPUT_MESSAGE: &str = "Please select a location and a date range.";
pub const FETCH_FALLBACK_MESSAGE: &str = "Failed to fetch data.";

/// First and last year labelled on the time axis.
const TICK_YEARS: (i32, i32) = (1990, 2024);

#[derive(Debug, Clone, Default)]
pub struct TimeSeriesState {
    pub loading: bool,
    pub error: Option<ViewError>,
    pub series: Option<Vec<DailyObservation>>,
}

#[derive(Clone)]
pub struct TimeSeriesModel {
    client: Arc<StatsClient>,
    state: Arc<Mutex<TimeSeriesState>>,
}

impl TimeSeriesModel {
    pub fn new(client: Arc<StatsClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(TimeSeriesState::default())),
        }
    }

    pub fn snapshot(&self) -> TimeSeriesState {
        self.state.lock().clone()
    }

    /// Fetch the raw daily history for the location and range.
    pub async fn analyze(
        &self,
        location: Option<&Location>,
        range: &DateRange,
    ) -> Result<Vec<DailyObservation>, StatsError> {
        let Some((location, (start, end))) = location.zip(range.bounds()) else {
            let err = StatsError::Validation(MISSING_INPUT_MESSAGE.to_string());
            self.state.lock().error = Some(ViewError::validation(err.detail()));
            return Err(err);
        };

        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
            state.series = None;
        }

        let query = StatsQuery::for_range(location, start, end);
        let outcome = self
            .client
            .weather_stats(&query)
            .await
            .map(|stats| stats.full_time_series.unwrap_or_default());

        let mut state = self.state.lock();
        state.loading = false;
        match &outcome {
            Ok(series) => state.series = Some(series.clone()),
            Err(e) => {
                tracing::warn!("Time series fetch failed: {}", e);
                let detail = e.detail();
                let message = if detail.trim().is_empty() {
                    FETCH_FALLBACK_MESSAGE.to_string()
                } else {
                    detail
                };
                state.error = Some(ViewError::request(message));
            }
        }
        outcome
    }
}

/// Shows one of the six daily series at a time.
#[derive(Debug, Clone)]
pub struct TimeSeriesViewer {
    data: Vec<DailyObservation>,
    index: usize,
}

impl TimeSeriesViewer {
    pub fn new(data: Vec<DailyObservation>) -> Self {
        Self { data, index: 0 }
    }

    pub fn current(&self) -> SeriesKind {
        SeriesKind::ALL[self.index % SeriesKind::ALL.len()]
    }

    pub fn next(&mut self) -> SeriesKind {
        self.index = (self.index + 1) % SeriesKind::ALL.len();
        self.current()
    }

    pub fn previous(&mut self) -> SeriesKind {
        let len = SeriesKind::ALL.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }

    pub fn select(&mut self, kind: SeriesKind) {
        if let Some(i) = SeriesKind::ALL.iter().position(|k| *k == kind) {
            self.index = i;
        }
    }

    /// Chart title, e.g. "High Temp (°F)".
    pub fn title(&self) -> &'static str {
        self.current().data_key()
    }

    /// Unit inside the key's parentheses, e.g. "°F".
    pub fn unit(&self) -> &'static str {
        let key = self.current().data_key();
        match (key.find('('), key.rfind(')')) {
            (Some(open), Some(close)) if open < close => &key[open + 1..close],
            _ => "",
        }
    }

    /// Days with a value for the current series.
    pub fn points(&self) -> Vec<(NaiveDate, f64)> {
        let kind = self.current();
        self.data
            .iter()
            .filter_map(|obs| kind.value(obs).map(|v| (obs.date, v)))
            .collect()
    }

    /// Even years from 1990 through 2024 that fall inside the data.
    pub fn year_ticks(&self) -> Vec<i32> {
        let first = self.data.first().map(|o| o.date.year());
        let last = self.data.last().map(|o| o.date.year());
        (TICK_YEARS.0..=TICK_YEARS.1)
            .step_by(2)
            .filter(|y| first.map_or(true, |f| *y >= f) && last.map_or(true, |l| *y <= l))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(y: i32, high: Option<f64>, rain: Option<f64>) -> DailyObservation {
        DailyObservation {
            date: NaiveDate::from_ymd_opt(y, 7, 1).unwrap(),
            high_temp_f: high,
            low_temp_f: None,
            precipitation_in: rain,
            wind_speed_mph: None,
            humidity_percent: None,
            sunlight_kwh: None,
        }
    }

    #[test]
    fn test_cycle_wraps_both_ways() {
        let mut viewer = TimeSeriesViewer::new(vec![]);
        assert_eq!(viewer.current(), SeriesKind::HighTemp);
        assert_eq!(viewer.previous(), SeriesKind::Sunlight);
        assert_eq!(viewer.next(), SeriesKind::HighTemp);
        for _ in 0..6 {
            viewer.next();
        }
        assert_eq!(viewer.current(), SeriesKind::HighTemp);
    }

    #[test]
    fn test_units() {
        let mut viewer = TimeSeriesViewer::new(vec![]);
        assert_eq!(viewer.unit(), "°F");
        viewer.next();
        assert_eq!(viewer.title(), "Precipitation (in)");
        assert_eq!(viewer.unit(), "in");
        viewer.select(SeriesKind::Sunlight);
        assert_eq!(viewer.unit(), "kWh/m²");
    }

    #[test]
    fn test_points_skip_missing_values() {
        let mut viewer = TimeSeriesViewer::new(vec![
            obs(1990, Some(90.0), None),
            obs(1991, None, Some(0.2)),
        ]);
        assert_eq!(viewer.points().len(), 1);
        viewer.select(SeriesKind::Precipitation);
        assert_eq!(viewer.points()[0].1, 0.2);
    }

    #[test]
    fn test_year_ticks() {
        let viewer = TimeSeriesViewer::new(vec![obs(1995, None, None), obs(2001, None, None)]);
        assert_eq!(viewer.year_ticks(), vec![1996, 1998, 2000]);

        let all = TimeSeriesViewer::new(vec![]).year_ticks();
        assert_eq!(all.first(), Some(&1990));
        assert_eq!(all.last(), Some(&2024));
        assert_eq!(all.len(), 18);
    }

    #[tokio::test]
    async fn test_missing_range_is_validation_error() {
        let client = StatsClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1))
            .unwrap();
        let model = TimeSeriesModel::new(Arc::new(client));
        let loc = Location::new("Lima", -12.05, -77.04);

        let err = model
            .analyze(Some(&loc), &DateRange::default())
            .await
            .unwrap_err();
        assert_eq!(err.detail(), MISSING_INPUT_MESSAGE);
    }
}
