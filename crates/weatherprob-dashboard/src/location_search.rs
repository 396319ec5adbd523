//! Place search box backed by the geocoder.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use weatherprob_stats::{Geocoder, Location, StatsError};

use crate::debounce::Debouncer;
use crate::views::ViewError;

#[derive(Debug, Clone, Default)]
pub struct LocationSearchState {
    pub query: String,
    pub loading: bool,
    pub results: Vec<Location>,
    pub selected: Option<Location>,
    /// Line shown under the search box
    pub status: Option<String>,
    pub error: Option<ViewError>,
    generation: u64,
}

pub struct LocationSearch {
    geocoder: Arc<Geocoder>,
    state: Arc<Mutex<LocationSearchState>>,
    debouncer: Debouncer,
}

impl LocationSearch {
    pub fn new(geocoder: Arc<Geocoder>, debounce: Duration) -> Self {
        Self {
            geocoder,
            state: Arc::new(Mutex::new(LocationSearchState::default())),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn snapshot(&self) -> LocationSearchState {
        self.state.lock().clone()
    }

    /// Search-as-you-type: runs once typing pauses.
    pub fn query_changed(&self, query: &str) {
        self.state.lock().query = query.to_string();

        let geocoder = self.geocoder.clone();
        let state = self.state.clone();
        let query = query.to_string();
        self.debouncer.call(move |token| async move {
            let _ = run_search(geocoder, state, query, token).await;
        });
    }

    /// Search immediately for `query` (Enter key / search button).
    pub async fn search_now(&self, query: &str) -> Result<Vec<Location>, StatsError> {
        self.debouncer.cancel();
        self.state.lock().query = query.to_string();
        run_search(
            self.geocoder.clone(),
            self.state.clone(),
            query.to_string(),
            CancellationToken::new(),
        )
        .await
    }

    pub fn select(&self, index: usize) -> Option<Location> {
        let mut state = self.state.lock();
        let location = state.results.get(index).cloned()?;
        state.status = Some(format!("Selected: {}", location.name));
        state.selected = Some(location.clone());
        Some(location)
    }
}

/// Every run, blank or not, takes ownership of the state. Only the newest run
/// publishes, so a superseded one never leaves `loading` behind.
async fn run_search(
    geocoder: Arc<Geocoder>,
    state: Arc<Mutex<LocationSearchState>>,
    query: String,
    token: CancellationToken,
) -> Result<Vec<Location>, StatsError> {
    let generation = {
        let mut s = state.lock();
        s.generation += 1;
        if query.trim().is_empty() {
            s.loading = false;
            s.results.clear();
            s.status = None;
            return Ok(Vec::new());
        }
        s.loading = true;
        s.generation
    };

    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => Err(StatsError::Cancelled),
        result = geocoder.search(&query) => result,
    };

    let mut s = state.lock();
    if s.generation != generation || token.is_cancelled() {
        return outcome;
    }
    s.loading = false;
    match &outcome {
        Ok(results) => {
            s.error = None;
            s.results = results.clone();
            s.status = if results.is_empty() {
                Some(format!("No results found for \"{}\"", query))
            } else {
                None
            };
        }
        Err(e) => {
            tracing::warn!("Place search failed: {}", e);
            s.results.clear();
            s.error = Some(ViewError::request(e.detail()));
        }
    }
    outcome
}
