//! HTTP client for the weather statistics backend.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use weatherprob_core::{ApiConfig, ReqwestErrorExt};

use crate::error::StatsError;
use crate::types::*;

const WEATHER_STATS_PATH: &str = "/api/weather-stats";
const WEATHER_HEATMAP_PATH: &str = "/api/weather-heatmap";
const PERFECT_DAY_PATH: &str = "/api/find-perfect-day";

#[derive(Debug, Clone)]
pub struct StatsClient {
    client: reqwest::Client,
    base_url: String,
}

impl StatsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatsError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, StatsError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_seconds))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Aggregate statistics for a location over a date range or a single calendar day.
    #[instrument(skip(self), level = "info")]
    pub async fn weather_stats(&self, query: &StatsQuery) -> Result<WeatherStats, StatsError> {
        self.post_json(WEATHER_STATS_PATH, &query.to_body()).await
    }

    pub async fn weather_stats_cancellable(
        &self,
        query: &StatsQuery,
        token: &CancellationToken,
    ) -> Result<WeatherStats, StatsError> {
        with_cancellation(token, self.weather_stats(query)).await
    }

    /// Heat intensity cells inside the given bounds.
    #[instrument(skip(self), level = "info")]
    pub async fn weather_heatmap(&self, query: &HeatmapQuery) -> Result<Vec<HeatPoint>, StatsError> {
        self.post_json(WEATHER_HEATMAP_PATH, &query.to_body()).await
    }

    pub async fn weather_heatmap_cancellable(
        &self,
        query: &HeatmapQuery,
        token: &CancellationToken,
    ) -> Result<Vec<HeatPoint>, StatsError> {
        with_cancellation(token, self.weather_heatmap(query)).await
    }

    /// Date ranges that best match the criteria, best first.
    #[instrument(skip(self), level = "info")]
    pub async fn find_perfect_day(
        &self,
        query: &PerfectDayQuery,
    ) -> Result<Vec<PerfectDayResult>, StatsError> {
        let body = serde_json::to_value(query).map_err(|e| StatsError::Parse(e.to_string()))?;
        self.post_json(PERFECT_DAY_PATH, &body).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, StatsError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Request to {} failed: {}", endpoint, e);
                StatsError::Network(e.into_network_error())
            })?;

        self.handle_response(response).await
    }

    /// Normalizes every failure shape into one `StatsError`.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StatsError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StatsError::Network(e.into_network_error()))?;

        let parsed: Result<serde_json::Value, _> = serde_json::from_str(&text);
        let server_error = parsed.as_ref().ok().and_then(error_field);

        if !status.is_success() {
            let message = server_error
                .unwrap_or_else(|| format!("HTTP error! Status: {}", status.as_u16()));
            tracing::warn!("Backend returned {}: {}", status, message);
            return Err(StatsError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if let Some(message) = server_error {
            tracing::warn!("Backend reported an error: {}", message);
            return Err(StatsError::Api(message));
        }

        let value = parsed.map_err(|e| StatsError::Parse(format!("JSON parse error: {}", e)))?;
        serde_json::from_value(value).map_err(|e| StatsError::Parse(format!("JSON parse error: {}", e)))
    }
}

/// The `error` member of an object body, if it is set to something truthy.
fn error_field(body: &serde_json::Value) -> Option<String> {
    match body.get("error")? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

async fn with_cancellation<T>(
    token: &CancellationToken,
    request: impl Future<Output = Result<T, StatsError>>,
) -> Result<T, StatsError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StatsError::Cancelled),
        result = request => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query() -> StatsQuery {
        let loc = Location::new("Denver", 39.74, -104.99);
        StatsQuery::for_range(
            &loc,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
        )
    }

    #[test]
    fn test_error_field() {
        assert_eq!(
            error_field(&serde_json::json!({"error": "boom"})).as_deref(),
            Some("boom")
        );
        assert_eq!(error_field(&serde_json::json!({"error": null})), None);
        assert_eq!(error_field(&serde_json::json!([[1.0, 2.0, 3.0]])), None);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = StatsClient::new("http://127.0.0.1:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
    }

    #[tokio::test]
    async fn test_sends_dates_as_iso_strings() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/weather-stats"))
            .and(body_partial_json(serde_json::json!({
                "start_date": "2025-01-10",
                "end_date": "2025-01-20"
            })))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "No data available for the selected date."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = StatsClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.weather_stats(&query()).await.unwrap_err();
        assert_eq!(err.detail(), "No data available for the selected date.");
    }

    #[tokio::test]
    async fn test_cancelled_before_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/weather-stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let client = StatsClient::new(&mock_server.uri(), Duration::from_secs(10)).unwrap();
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = client
            .weather_stats_cancellable(&query(), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
