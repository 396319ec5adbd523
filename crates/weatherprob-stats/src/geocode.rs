//! Place search and reverse geocoding through Nominatim (OpenStreetMap).
//! Free, no API key, but every request must identify itself with a
//! User-Agent and requests are limited to one per second.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;
use weatherprob_core::{GeocodingConfig, ReqwestErrorExt};

use crate::error::StatsError;
use crate::types::Location;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct SearchResult {
    display_name: String,
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    search_limit: u32,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        search_limit: u32,
        min_interval: Duration,
    ) -> Result<Self, StatsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()
            .map_err(|e| StatsError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_limit,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn from_config(config: &GeocodingConfig) -> Result<Self, StatsError> {
        Self::new(
            &config.base_url,
            &config.user_agent,
            config.search_limit,
            Duration::from_millis(config.min_interval_ms),
        )
    }

    /// Waits until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Forward search. A blank query returns no results without a request.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<Location>, StatsError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/search?q={}&format=json&limit={}",
            self.base_url,
            urlencoding::encode(query),
            self.search_limit,
        );

        self.throttle().await;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StatsError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Http {
                status: status.as_u16(),
                message: format!("HTTP error! Status: {}", status.as_u16()),
            });
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| StatsError::Parse(format!("JSON parse error: {}", e)))?;

        let locations: Vec<Location> = results
            .into_iter()
            .filter_map(|r| {
                let lat = r.lat.parse().ok()?;
                let lon = r.lon.parse().ok()?;
                Some(Location::new(r.display_name, lat, lon))
            })
            .collect();

        tracing::debug!("Search for {:?} returned {} places", query, locations.len());
        Ok(locations)
    }

    /// Reverse geocode coordinates to a short place name (e.g. "Seattle, Washington").
    /// Returns `None` on failure; the caller can fall back to coordinates.
    #[instrument(skip(self), level = "info")]
    pub async fn reverse(&self, lat: f64, lon: f64) -> Option<String> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1&layer=address&zoom=10",
            self.base_url, lat, lon
        );

        self.throttle().await;
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Reverse geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return None;
        }

        let body: ReverseResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Reverse geocode parse error: {}", e);
                return None;
            }
        };

        let name = place_name(body.address?)?;
        tracing::info!("Reverse geocoded to: {}", name);
        Some(name)
    }

    /// A `Location` for the coordinates, named by reverse geocoding when possible.
    pub async fn locate(&self, lat: f64, lon: f64) -> Location {
        match self.reverse(lat, lon).await {
            Some(name) => Location::new(name, lat, lon),
            None => Location::from_coordinates(lat, lon),
        }
    }
}

/// City > town > village > ... for the place, then state or country to disambiguate.
fn place_name(addr: Address) -> Option<String> {
    let state = addr.state.clone();
    let country = addr.country.clone();

    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)?;

    let suffix = [state, country]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty() && *s != place);

    Some(match suffix {
        Some(s) => format!("{}, {}", place, s),
        None => place,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_name_prefers_city_and_state() {
        let addr = Address {
            city: Some("Seattle".into()),
            county: Some("King County".into()),
            state: Some("Washington".into()),
            country: Some("United States".into()),
            ..Default::default()
        };
        assert_eq!(place_name(addr).as_deref(), Some("Seattle, Washington"));
    }

    #[test]
    fn test_place_name_falls_back_to_country() {
        let addr = Address {
            village: Some("Hallstatt".into()),
            country: Some("Austria".into()),
            ..Default::default()
        };
        assert_eq!(place_name(addr).as_deref(), Some("Hallstatt, Austria"));
    }

    #[test]
    fn test_place_name_no_duplicate_suffix() {
        let addr = Address {
            state: Some("Bavaria".into()),
            country: Some("Bavaria".into()),
            ..Default::default()
        };
        assert_eq!(place_name(addr).as_deref(), Some("Bavaria"));
    }

    #[test]
    fn test_place_name_empty_address() {
        assert_eq!(place_name(Address::default()), None);
    }

    #[tokio::test]
    async fn test_blank_search_skips_request() {
        let geocoder =
            Geocoder::new("http://127.0.0.1:9", "test-agent", 5, Duration::ZERO).unwrap();
        let results = geocoder.search("   ").await.unwrap();
        assert!(results.is_empty());
    }
}
