//! Weather statistics client for WeatherProb.
//!
//! Typed access to the statistics backend (`weather-stats`,
//! `weather-heatmap`, `find-perfect-day`), Nominatim geocoding, and
//! JSON/CSV export of results.

pub mod client;
pub mod error;
pub mod export;
pub mod geocode;
pub mod types;

pub use client::StatsClient;
pub use error::{ErrorKind, StatsError};
pub use export::{ExportContext, ExportFormat};
pub use geocode::Geocoder;
pub use types::*;
