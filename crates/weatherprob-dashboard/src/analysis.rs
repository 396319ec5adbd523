//! Single-location analysis: form validation, request, and results state.

use std::sync::Arc;

use parking_lot::Mutex;
use weatherprob_stats::{
    DateRange, DaySelection, Factor, Location, StatsClient, StatsError, StatsQuery, WeatherStats,
};

use crate::views::{ResultsView, ViewError};

pub const FETCH_ERROR_PREFIX: &str = "Failed to fetch weather data: ";
pub const MISSING_RANGE_MESSAGE: &str =
    "Please select a location and a date range before analyzing.";
pub const MISSING_DAY_MESSAGE: &str = "Please select a location and a date before analyzing.";

/// Either a date range or a single calendar day.
#[derive(Debug, Clone, PartialEq)]
pub enum Period {
    Range(DateRange),
    Day(Option<DaySelection>),
}

impl Default for Period {
    fn default() -> Self {
        Self::Range(DateRange::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisForm {
    pub location: Option<Location>,
    pub period: Period,
    pub combined_factors: Vec<Factor>,
}

impl AnalysisForm {
    /// Toggle a combined factor, keeping selection order.
    pub fn set_factor(&mut self, factor: Factor, checked: bool) {
        let present = self.combined_factors.contains(&factor);
        if checked && !present {
            self.combined_factors.push(factor);
        } else if !checked {
            self.combined_factors.retain(|f| *f != factor);
        }
    }

    /// The request this form describes, or the validation error to show.
    pub fn to_query(&self) -> Result<StatsQuery, StatsError> {
        match &self.period {
            Period::Range(range) => {
                let (location, (start, end)) = self
                    .location
                    .as_ref()
                    .zip(range.bounds())
                    .ok_or_else(|| StatsError::Validation(MISSING_RANGE_MESSAGE.to_string()))?;
                Ok(StatsQuery::for_range(location, start, end).with_factors(&self.combined_factors))
            }
            Period::Day(day) => {
                let (location, day) = self
                    .location
                    .as_ref()
                    .zip(*day)
                    .ok_or_else(|| StatsError::Validation(MISSING_DAY_MESSAGE.to_string()))?;
                Ok(StatsQuery::for_day(location, day))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    pub loading: bool,
    pub error: Option<ViewError>,
    pub results: Option<WeatherStats>,
    /// The query behind `results`
    pub query: Option<StatsQuery>,
    generation: u64,
}

impl AnalysisState {
    pub fn view(&self) -> ResultsView<'_> {
        ResultsView::from_parts(self.loading, self.error.as_ref(), self.results.as_ref())
    }
}

#[derive(Clone)]
pub struct AnalysisModel {
    client: Arc<StatsClient>,
    state: Arc<Mutex<AnalysisState>>,
}

impl AnalysisModel {
    pub fn new(client: Arc<StatsClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(AnalysisState::default())),
        }
    }

    pub fn snapshot(&self) -> AnalysisState {
        self.state.lock().clone()
    }

    /// Validate and run the analysis. An invalid form sets the validation
    /// message and sends nothing. A newer call supersedes an older one still
    /// in flight.
    pub async fn analyze(&self, form: &AnalysisForm) -> Result<WeatherStats, StatsError> {
        let query = match form.to_query() {
            Ok(q) => q,
            Err(e) => {
                let mut state = self.state.lock();
                state.error = Some(ViewError::from_stats_error(&e, FETCH_ERROR_PREFIX));
                return Err(e);
            }
        };

        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.loading = true;
            state.error = None;
            state.results = None;
            state.query = None;
            state.generation
        };

        tracing::info!("Analyzing {:?}", query.period);
        let outcome = self.client.weather_stats(&query).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Dropping superseded analysis result");
            return outcome;
        }
        state.loading = false;
        match &outcome {
            Ok(stats) => {
                state.results = Some(stats.clone());
                state.query = Some(query);
            }
            Err(e) => {
                tracing::warn!("Analysis failed: {}", e);
                state.error = Some(ViewError::from_stats_error(e, FETCH_ERROR_PREFIX));
            }
        }
        outcome
    }
}
