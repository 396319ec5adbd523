//! Side-by-side comparison of two location/date-range scenarios.

use std::sync::Arc;

use parking_lot::Mutex;
use weatherprob_stats::{DateRange, Location, StatsClient, StatsError, StatsQuery, WeatherStats};

use crate::cache::{ComparisonCache, ComparisonInputs, ComparisonResults};
use crate::views::{format_number, ViewError};

pub const MISSING_SCENARIO_MESSAGE: &str =
    "Please select a location and a full date range for both scenarios.";
pub const COMPARE_ERROR_PREFIX: &str = "Comparison failed: ";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub location: Option<Location>,
    pub date_range: DateRange,
}

impl Scenario {
    pub fn new(location: Location, date_range: DateRange) -> Self {
        Self {
            location: Some(location),
            date_range,
        }
    }

    fn query(&self) -> Option<StatsQuery> {
        let location = self.location.as_ref()?;
        let (start, end) = self.date_range.bounds()?;
        Some(StatsQuery::for_range(location, start, end))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonState {
    pub loading: bool,
    pub error: Option<ViewError>,
    pub scenario_a: Scenario,
    pub scenario_b: Scenario,
    pub results_a: Option<WeatherStats>,
    pub results_b: Option<WeatherStats>,
}

impl ComparisonState {
    /// Rows are only available when both results are present.
    pub fn rows(&self) -> Option<Vec<ComparisonRow>> {
        match (&self.results_a, &self.results_b) {
            (Some(a), Some(b)) => Some(comparison_rows(a, b)),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ComparisonModel {
    client: Arc<StatsClient>,
    cache: ComparisonCache,
    state: Arc<Mutex<ComparisonState>>,
}

impl ComparisonModel {
    /// Starts from the saved comparison when one is available.
    pub fn new(client: Arc<StatsClient>, cache: ComparisonCache) -> Self {
        let model = Self {
            client,
            cache,
            state: Arc::new(Mutex::new(ComparisonState::default())),
        };
        model.restore();
        model
    }

    /// Reload inputs and results from the cache. Returns whether anything was restored.
    pub fn restore(&self) -> bool {
        let Some(entry) = self.cache.load() else {
            return false;
        };

        let mut state = self.state.lock();
        state.scenario_a = Scenario::new(entry.inputs.location_a, entry.inputs.date_range_a);
        state.scenario_b = Scenario::new(entry.inputs.location_b, entry.inputs.date_range_b);
        state.results_a = Some(entry.results.results_a);
        state.results_b = Some(entry.results.results_b);
        tracing::info!("Restored comparison saved at {}", entry.saved_at);
        true
    }

    pub fn snapshot(&self) -> ComparisonState {
        self.state.lock().clone()
    }

    pub fn set_scenario_a(&self, scenario: Scenario) {
        self.state.lock().scenario_a = scenario;
    }

    pub fn set_scenario_b(&self, scenario: Scenario) {
        self.state.lock().scenario_b = scenario;
    }

    /// Fetch both scenarios concurrently. Either both results are shown and
    /// saved, or neither is and the saved comparison is dropped.
    pub async fn compare(&self) -> Result<(), StatsError> {
        let (scenario_a, scenario_b) = {
            let state = self.state.lock();
            (state.scenario_a.clone(), state.scenario_b.clone())
        };

        let queries = scenario_a.query().zip(scenario_b.query());
        let Some((query_a, query_b)) = queries else {
            let err = StatsError::Validation(MISSING_SCENARIO_MESSAGE.to_string());
            self.state.lock().error = Some(ViewError::from_stats_error(&err, COMPARE_ERROR_PREFIX));
            return Err(err);
        };

        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
            state.results_a = None;
            state.results_b = None;
        }

        let joined = tokio::try_join!(
            self.client.weather_stats(&query_a),
            self.client.weather_stats(&query_b),
        );

        match joined {
            Ok((results_a, results_b)) => {
                {
                    let mut state = self.state.lock();
                    state.loading = false;
                    state.results_a = Some(results_a.clone());
                    state.results_b = Some(results_b.clone());
                }

                if let (Some(location_a), Some(location_b)) =
                    (scenario_a.location, scenario_b.location)
                {
                    let inputs = ComparisonInputs {
                        location_a,
                        date_range_a: scenario_a.date_range,
                        location_b,
                        date_range_b: scenario_b.date_range,
                    };
                    let results = ComparisonResults {
                        results_a,
                        results_b,
                    };
                    if let Err(e) = self.cache.save(inputs, results) {
                        tracing::warn!("{} ({})", e.user_message(), e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Comparison failed: {}", e);
                {
                    let mut state = self.state.lock();
                    state.loading = false;
                    state.error = Some(ViewError::from_stats_error(&e, COMPARE_ERROR_PREFIX));
                }
                self.cache.clear();
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// One metric of the comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub value_a: String,
    pub value_b: String,
    /// The better side, when the values differ and the metric is ranked
    pub better: Option<Side>,
}

fn ranked(
    label: &'static str,
    a: f64,
    b: f64,
    unit: &str,
    lower_is_better: bool,
) -> ComparisonRow {
    let better = if a == b {
        None
    } else if (a < b) == lower_is_better {
        Some(Side::A)
    } else {
        Some(Side::B)
    };
    ComparisonRow {
        label,
        value_a: format!("{}{}", format_number(a), unit),
        value_b: format!("{}{}", format_number(b), unit),
        better,
    }
}

fn feels_like(stats: &WeatherStats) -> String {
    let heat_index = stats
        .averages
        .avg_heat_index_f
        .map(format_number)
        .unwrap_or_else(|| "n/a".to_string());
    format!("{}/{}°F", format_number(stats.averages.avg_high_f), heat_index)
}

pub fn comparison_rows(a: &WeatherStats, b: &WeatherStats) -> Vec<ComparisonRow> {
    let mut high = ranked(
        "Avg. High / Feels Like",
        a.averages.avg_high_f,
        b.averages.avg_high_f,
        "°F",
        false,
    );
    high.value_a = feels_like(a);
    high.value_b = feels_like(b);

    vec![
        high,
        ranked(
            "Chance of Uncomfortable Day",
            a.probabilities.uncomfortable,
            b.probabilities.uncomfortable,
            "%",
            true,
        ),
        ranked(
            "Chance of Wet Day",
            a.probabilities.wet,
            b.probabilities.wet,
            "%",
            true,
        ),
        ranked(
            "Chance of Cold Day",
            a.probabilities.cold,
            b.probabilities.cold,
            "%",
            true,
        ),
        ranked(
            "Chance of Sunny Day",
            a.probabilities.sunny,
            b.probabilities.sunny,
            "%",
            false,
        ),
        ranked(
            "Record High",
            a.records.record_high_f,
            b.records.record_high_f,
            "°F",
            true,
        ),
        ComparisonRow {
            label: "Temp Trend",
            value_a: a.trend.temp_trend_label.as_str().to_string(),
            value_b: b.trend.temp_trend_label.as_str().to_string(),
            better: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(high: f64, uncomfortable: f64, sunny: f64) -> WeatherStats {
        serde_json::from_value(serde_json::json!({
            "total_years_analyzed": 30,
            "probabilities": {"hot": 10, "cold": 5, "windy": 2, "wet": 12,
                              "sunny": sunny, "uncomfortable": uncomfortable},
            "averages": {"avg_high_f": high, "avg_low_f": 60.0, "avg_wind_mph": 5.0,
                         "avg_heat_index_f": high + 2.0},
            "records": {"record_high_f": 100.0, "record_low_f": 40.0},
            "trend": {"temp_trend_label": "warming"}
        }))
        .unwrap()
    }

    #[test]
    fn test_lower_is_better_rows() {
        let rows = comparison_rows(&stats(80.0, 30.0, 50.0), &stats(85.0, 10.0, 60.0));

        let uncomfortable = &rows[1];
        assert_eq!(uncomfortable.value_a, "30%");
        assert_eq!(uncomfortable.better, Some(Side::B));

        let sunny = rows.iter().find(|r| r.label == "Chance of Sunny Day").unwrap();
        assert_eq!(sunny.better, Some(Side::B));

        let high = &rows[0];
        assert_eq!(high.value_a, "80/82°F");
        assert_eq!(high.better, Some(Side::B));
    }

    #[test]
    fn test_equal_values_not_highlighted() {
        let rows = comparison_rows(&stats(80.0, 30.0, 50.0), &stats(80.0, 30.0, 50.0));
        assert!(rows.iter().all(|r| r.better.is_none()));
    }

    #[test]
    fn test_trend_never_highlighted() {
        let rows = comparison_rows(&stats(80.0, 30.0, 50.0), &stats(90.0, 10.0, 70.0));
        let trend = rows.last().unwrap();
        assert_eq!(trend.label, "Temp Trend");
        assert_eq!(trend.better, None);
    }

    #[test]
    fn test_rows_need_both_results() {
        let state = ComparisonState {
            results_a: Some(stats(80.0, 30.0, 50.0)),
            ..Default::default()
        };
        assert!(state.rows().is_none());
    }
}
