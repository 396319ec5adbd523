//! Perfect-day finder: rank periods of the year against comfort criteria.

use std::sync::Arc;

use parking_lot::Mutex;
use weatherprob_stats::{
    Criterion, DateRange, Location, PerfectDayQuery, PerfectDayResult, StatsClient, StatsError,
};

use crate::views::ViewError;

pub const MISSING_CRITERIA_MESSAGE: &str =
    "Please select a location and at least one criterion.";
pub const FIND_FALLBACK_MESSAGE: &str = "Failed to find results.";

#[derive(Debug, Clone)]
pub struct PerfectDayState {
    pub loading: bool,
    pub error: Option<ViewError>,
    pub criteria: Vec<Criterion>,
    pub results: Vec<PerfectDayResult>,
}

impl Default for PerfectDayState {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            criteria: Criterion::DEFAULT_SELECTION.to_vec(),
            results: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct PerfectDayFinder {
    client: Arc<StatsClient>,
    state: Arc<Mutex<PerfectDayState>>,
}

impl PerfectDayFinder {
    pub fn new(client: Arc<StatsClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(PerfectDayState::default())),
        }
    }

    pub fn snapshot(&self) -> PerfectDayState {
        self.state.lock().clone()
    }

    pub fn set_criterion(&self, criterion: Criterion, checked: bool) {
        let mut state = self.state.lock();
        let present = state.criteria.contains(&criterion);
        if checked && !present {
            state.criteria.push(criterion);
        } else if !checked {
            state.criteria.retain(|c| *c != criterion);
        }
    }

    pub fn set_criteria(&self, criteria: &[Criterion]) {
        let mut state = self.state.lock();
        state.criteria.clear();
        for c in criteria {
            if !state.criteria.contains(c) {
                state.criteria.push(*c);
            }
        }
    }

    pub async fn find(
        &self,
        location: Option<&Location>,
    ) -> Result<Vec<PerfectDayResult>, StatsError> {
        let criteria = self.state.lock().criteria.clone();

        let query = match location {
            Some(loc) if !criteria.is_empty() => PerfectDayQuery {
                lat: loc.lat,
                lon: loc.lon,
                criteria,
            },
            _ => {
                let err = StatsError::Validation(MISSING_CRITERIA_MESSAGE.to_string());
                self.state.lock().error = Some(ViewError::validation(err.detail()));
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
            state.results.clear();
        }

        let outcome = self.client.find_perfect_day(&query).await;

        let mut state = self.state.lock();
        state.loading = false;
        match &outcome {
            Ok(results) => state.results = results.clone(),
            Err(e) => {
                tracing::warn!("Perfect day search failed: {}", e);
                let detail = e.detail();
                let message = if detail.trim().is_empty() {
                    FIND_FALLBACK_MESSAGE.to_string()
                } else {
                    detail
                };
                state.error = Some(ViewError::request(message));
            }
        }
        outcome
    }

    /// The date range for a ranked result, placed in `year`.
    pub fn select(&self, index: usize, year: i32) -> Option<DateRange> {
        let state = self.state.lock();
        state.results.get(index).map(|r| r.date_range(year))
    }
}
