use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A user-selected point on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    /// A location named after its own coordinates, used when reverse geocoding fails.
    pub fn from_coordinates(lat: f64, lon: f64) -> Self {
        Self::new(format!("{:.4}, {:.4}", lat, lon), lat, lon)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.name, self.lat, self.lon)
    }
}

/// Date range picker state. Either end may still be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Both ends, in selection order, once the range is complete.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.from?, self.to?))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "{} to {}", from, to),
            (Some(from), None) => write!(f, "{} to ...", from),
            _ => write!(f, "no dates selected"),
        }
    }
}

/// Calendar day without a year, for the single-day analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySelection {
    pub month: u32,
    pub day: u32,
}

impl DaySelection {
    /// Returns `None` for an invalid month or day 0. Days past the end of the
    /// month are clamped, with February allowed 29 days.
    pub fn new(month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 {
            return None;
        }
        let max_day = days_in_month(2024, month)?;
        Some(Self {
            month,
            day: day.min(max_day),
        })
    }
}

impl fmt::Display for DaySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Conditions whose joint probability can be requested alongside the stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Hot,
    Cold,
    Windy,
    Wet,
    Humid,
    Sunny,
}

impl Factor {
    pub const ALL: [Factor; 6] = [
        Factor::Hot,
        Factor::Cold,
        Factor::Windy,
        Factor::Wet,
        Factor::Humid,
        Factor::Sunny,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Cold => "cold",
            Self::Windy => "windy",
            Self::Wet => "wet",
            Self::Humid => "humid",
            Self::Sunny => "sunny",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Cold => "Cold",
            Self::Windy => "Windy",
            Self::Wet => "Wet",
            Self::Humid => "Humid",
            Self::Sunny => "Sunny",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }
}

/// Comfort criteria understood by the perfect-day finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Sunny,
    NotHot,
    NotCold,
    NotWindy,
    NotHumid,
    NoRain,
    NoSnow,
}

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::Sunny,
        Criterion::NotHot,
        Criterion::NotCold,
        Criterion::NotWindy,
        Criterion::NotHumid,
        Criterion::NoRain,
        Criterion::NoSnow,
    ];

    pub const DEFAULT_SELECTION: [Criterion; 3] =
        [Criterion::Sunny, Criterion::NotHot, Criterion::NoRain];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::NotHot => "not_hot",
            Self::NotCold => "not_cold",
            Self::NotWindy => "not_windy",
            Self::NotHumid => "not_humid",
            Self::NoRain => "no_rain",
            Self::NoSnow => "no_snow",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::NotHot => "Not Too Hot",
            Self::NotCold => "Not Too Cold",
            Self::NotWindy => "Not Windy",
            Self::NotHumid => "Not Humid",
            Self::NoRain => "No Rain",
            Self::NoSnow => "No Snow",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// What the statistics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryPeriod {
    Range { start: NaiveDate, end: NaiveDate },
    Day(DaySelection),
}

/// Parameters for `POST /api/weather-stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    pub lat: f64,
    pub lon: f64,
    pub period: QueryPeriod,
    pub combined_factors: Vec<Factor>,
}

impl StatsQuery {
    pub fn for_range(location: &Location, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            lat: location.lat,
            lon: location.lon,
            period: QueryPeriod::Range { start, end },
            combined_factors: Vec::new(),
        }
    }

    pub fn for_day(location: &Location, day: DaySelection) -> Self {
        Self {
            lat: location.lat,
            lon: location.lon,
            period: QueryPeriod::Day(day),
            combined_factors: Vec::new(),
        }
    }

    pub fn with_factors(mut self, factors: &[Factor]) -> Self {
        self.combined_factors = factors.to_vec();
        self
    }

    /// JSON request body. `combined_factors` is only sent with a range and
    /// only when non-empty.
    pub fn to_body(&self) -> serde_json::Value {
        match self.period {
            QueryPeriod::Range { start, end } => {
                let mut body = serde_json::json!({
                    "lat": self.lat,
                    "lon": self.lon,
                    "start_date": start.format("%Y-%m-%d").to_string(),
                    "end_date": end.format("%Y-%m-%d").to_string(),
                });
                if !self.combined_factors.is_empty() {
                    body["combined_factors"] = serde_json::json!(self.combined_factors);
                }
                body
            }
            QueryPeriod::Day(day) => serde_json::json!({
                "lat": self.lat,
                "lon": self.lon,
                "month": day.month,
                "day": day.day,
            }),
        }
    }
}

/// Visible map rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl MapBounds {
    /// Longitudes folded into [-180, 180]; latitudes are left alone.
    pub fn wrapped(&self) -> Self {
        Self {
            north: self.north,
            south: self.south,
            east: wrap_longitude(self.east),
            west: wrap_longitude(self.west),
        }
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Parameters for `POST /api/weather-heatmap`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapQuery {
    pub bounds: MapBounds,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HeatmapQuery {
    /// Request body with the bounds already wrapped.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "bounds": self.bounds.wrapped(),
            "start_date": self.start.format("%Y-%m-%d").to_string(),
            "end_date": self.end.format("%Y-%m-%d").to_string(),
        })
    }
}

/// One heatmap cell, sent by the backend as `[lat, lon, intensity]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint(pub f64, pub f64, pub f64);

impl HeatPoint {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    pub fn intensity(&self) -> f64 {
        self.2
    }
}

/// Parameters for `POST /api/find-perfect-day`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfectDayQuery {
    pub lat: f64,
    pub lon: f64,
    pub criteria: Vec<Criterion>,
}

/// A ranked period returned by the perfect-day finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfectDayResult {
    pub period: String,
    pub score: f64,
    pub start_day: u32,
    pub end_day: u32,
}

impl PerfectDayResult {
    /// Maps the day-of-year span onto `year`. Day numbers beyond the end of
    /// the year clamp to December 31.
    pub fn date_range(&self, year: i32) -> DateRange {
        DateRange {
            from: day_of_year(year, self.start_day),
            to: day_of_year(year, self.end_day),
        }
    }
}

fn day_of_year(year: i32, ordinal: u32) -> Option<NaiveDate> {
    let last = NaiveDate::from_ymd_opt(year, 12, 31)?.ordinal();
    NaiveDate::from_yo_opt(year, ordinal.clamp(1, last))
}

/// Aggregated statistics computed by the backend for one location and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStats {
    pub total_years_analyzed: u32,
    pub probabilities: Probabilities,
    pub averages: Averages,
    pub records: Records,
    pub trend: Trend,
    #[serde(default)]
    pub chart_data: ChartData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributions: Option<BTreeMap<String, Distribution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_time_series: Option<Vec<DailyObservation>>,
}

/// Percent chance (0-100) of each condition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Probabilities {
    pub hot: f64,
    pub cold: f64,
    pub windy: f64,
    pub wet: f64,
    #[serde(default)]
    pub humid: f64,
    #[serde(default)]
    pub sunny: f64,
    #[serde(default)]
    pub snowy: f64,
    #[serde(default)]
    pub uncomfortable: f64,
    /// Joint probability of the requested combined factors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub avg_high_f: f64,
    pub avg_low_f: f64,
    pub avg_wind_mph: f64,
    #[serde(default)]
    pub avg_humidity_percent: Option<f64>,
    #[serde(default)]
    pub avg_pressure_kpa: Option<f64>,
    #[serde(default)]
    pub avg_insolation_kwhr: Option<f64>,
    #[serde(default)]
    pub avg_heat_index_f: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Records {
    pub record_high_f: f64,
    pub record_low_f: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempTrend {
    Warming,
    Cooling,
    #[default]
    Stable,
}

impl TempTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warming => "warming",
            Self::Cooling => "cooling",
            Self::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trend {
    pub temp_trend_label: TempTrend,
}

/// Yearly high temperature series for the trend chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    pub years: Vec<i32>,
    pub high_temps: Vec<f64>,
}

impl ChartData {
    /// `(year, high)` pairs; a length mismatch truncates to the shorter series.
    pub fn points(&self) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .copied()
            .zip(self.high_temps.iter().copied())
            .collect()
    }
}

/// Density curve for one variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// One day of raw history, keyed the way the backend labels its series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    #[serde(rename = "High Temp (°F)", default)]
    pub high_temp_f: Option<f64>,
    #[serde(rename = "Low Temp (°F)", default)]
    pub low_temp_f: Option<f64>,
    #[serde(rename = "Precipitation (in)", default)]
    pub precipitation_in: Option<f64>,
    #[serde(rename = "Wind Speed (mph)", default)]
    pub wind_speed_mph: Option<f64>,
    #[serde(rename = "Humidity (%)", default)]
    pub humidity_percent: Option<f64>,
    #[serde(rename = "Sunlight (kWh/m²)", default)]
    pub sunlight_kwh: Option<f64>,
}

/// Daily series available in `full_time_series`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    HighTemp,
    Precipitation,
    LowTemp,
    WindSpeed,
    Humidity,
    Sunlight,
}

impl SeriesKind {
    /// Display order of the time-series viewer.
    pub const ALL: [SeriesKind; 6] = [
        SeriesKind::HighTemp,
        SeriesKind::Precipitation,
        SeriesKind::LowTemp,
        SeriesKind::WindSpeed,
        SeriesKind::Humidity,
        SeriesKind::Sunlight,
    ];

    /// The backend's key for this series.
    pub fn data_key(&self) -> &'static str {
        match self {
            Self::HighTemp => "High Temp (°F)",
            Self::Precipitation => "Precipitation (in)",
            Self::LowTemp => "Low Temp (°F)",
            Self::WindSpeed => "Wind Speed (mph)",
            Self::Humidity => "Humidity (%)",
            Self::Sunlight => "Sunlight (kWh/m²)",
        }
    }

    pub fn value(&self, obs: &DailyObservation) -> Option<f64> {
        match self {
            Self::HighTemp => obs.high_temp_f,
            Self::Precipitation => obs.precipitation_in,
            Self::LowTemp => obs.low_temp_f,
            Self::WindSpeed => obs.wind_speed_mph,
            Self::Humidity => obs.humidity_percent,
            Self::Sunlight => obs.sunlight_kwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_body_omits_empty_factors() {
        let loc = Location::new("Austin", 30.27, -97.74);
        let body = StatsQuery::for_range(&loc, date(2025, 7, 1), date(2025, 7, 14)).to_body();
        assert_eq!(body["start_date"], "2025-07-01");
        assert_eq!(body["end_date"], "2025-07-14");
        assert!(body.get("combined_factors").is_none());
        assert!(body.get("month").is_none());
    }

    #[test]
    fn test_range_body_includes_factors() {
        let loc = Location::new("Austin", 30.27, -97.74);
        let body = StatsQuery::for_range(&loc, date(2025, 7, 1), date(2025, 7, 14))
            .with_factors(&[Factor::Hot, Factor::Humid])
            .to_body();
        assert_eq!(body["combined_factors"], serde_json::json!(["hot", "humid"]));
    }

    #[test]
    fn test_day_body() {
        let loc = Location::new("Oslo", 59.91, 10.75);
        let body = StatsQuery::for_day(&loc, DaySelection::new(2, 29).unwrap()).to_body();
        assert_eq!(body, serde_json::json!({"lat": 59.91, "lon": 10.75, "month": 2, "day": 29}));
    }

    #[test]
    fn test_day_selection_clamps() {
        assert_eq!(DaySelection::new(2, 31).unwrap().day, 29);
        assert_eq!(DaySelection::new(4, 31).unwrap().day, 30);
        assert!(DaySelection::new(13, 1).is_none());
        assert!(DaySelection::new(5, 0).is_none());
    }

    #[test]
    fn test_partial_range_has_no_bounds() {
        let half = DateRange {
            from: Some(date(2026, 3, 1)),
            to: None,
        };
        assert!(!half.is_complete());
        assert_eq!(half.bounds(), None);
        assert_eq!(half.to_string(), "2026-03-01 to ...");

        let full = DateRange::new(date(2026, 3, 9), date(2026, 3, 1));
        assert!(full.is_complete());
        assert_eq!(full.bounds(), Some((date(2026, 3, 9), date(2026, 3, 1))));
    }

    #[test]
    fn test_wrap_longitude() {
        let bounds = MapBounds {
            north: 60.0,
            south: 10.0,
            east: 200.0,
            west: -190.0,
        }
        .wrapped();
        assert!((bounds.east - -160.0).abs() < 1e-9);
        assert!((bounds.west - 170.0).abs() < 1e-9);
        assert_eq!(bounds.north, 60.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
    }

    #[test]
    fn test_heat_point_from_array() {
        let points: Vec<HeatPoint> = serde_json::from_str("[[40.5, -74.0, 0.8]]").unwrap();
        assert_eq!(points[0].lat(), 40.5);
        assert_eq!(points[0].lon(), -74.0);
        assert_eq!(points[0].intensity(), 0.8);
    }

    #[test]
    fn test_perfect_day_date_range() {
        let result = PerfectDayResult {
            period: "Early June".into(),
            score: 87.5,
            start_day: 152,
            end_day: 166,
        };
        let range = result.date_range(2026);
        assert_eq!(range.from, Some(date(2026, 6, 1)));
        assert_eq!(range.to, Some(date(2026, 6, 15)));

        let late = PerfectDayResult {
            period: "Year end".into(),
            score: 50.0,
            start_day: 360,
            end_day: 370,
        };
        assert_eq!(late.date_range(2026).to, Some(date(2026, 12, 31)));
    }

    #[test]
    fn test_minimal_stats_payload() {
        let json = serde_json::json!({
            "total_years_analyzed": 30,
            "probabilities": {"hot": 12, "cold": 0, "windy": 5, "wet": 20},
            "averages": {"avg_high_f": 88.1, "avg_low_f": 70.2, "avg_wind_mph": 7.4},
            "records": {"record_high_f": 104.0, "record_low_f": 58.3},
            "trend": {"temp_trend_label": "warming"},
            "chart_data": {"years": [1995, 1996], "high_temps": [87.0, 89.5]}
        });
        let stats: WeatherStats = serde_json::from_value(json).unwrap();
        assert_eq!(stats.probabilities.hot, 12.0);
        assert_eq!(stats.probabilities.uncomfortable, 0.0);
        assert_eq!(stats.averages.avg_humidity_percent, None);
        assert_eq!(stats.trend.temp_trend_label, TempTrend::Warming);
        assert_eq!(stats.chart_data.points(), vec![(1995, 87.0), (1996, 89.5)]);
        assert!(stats.full_time_series.is_none());
    }

    #[test]
    fn test_daily_observation_keys() {
        let json = serde_json::json!({
            "date": "2024-07-04",
            "High Temp (°F)": 91.2,
            "Precipitation (in)": 0.0,
            "Sunlight (kWh/m²)": 7.1
        });
        let obs: DailyObservation = serde_json::from_value(json).unwrap();
        assert_eq!(SeriesKind::HighTemp.value(&obs), Some(91.2));
        assert_eq!(SeriesKind::Sunlight.value(&obs), Some(7.1));
        assert_eq!(SeriesKind::Humidity.value(&obs), None);
    }

    #[test]
    fn test_criterion_ids() {
        assert_eq!(Criterion::from_id("not_windy"), Some(Criterion::NotWindy));
        assert_eq!(
            serde_json::to_value(Criterion::DEFAULT_SELECTION).unwrap(),
            serde_json::json!(["sunny", "not_hot", "no_rain"])
        );
        assert_eq!(Factor::from_id("wet"), Some(Factor::Wet));
        assert_eq!(Factor::from_id("snowy"), None);
    }
}
