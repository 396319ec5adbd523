//! Presentation of model state: which branch a results panel shows, the
//! probability cards, overview lines, and plain-text rendering.

use std::fmt;

use weatherprob_stats::{ErrorKind, HeatPoint, PerfectDayResult, StatsError, WeatherStats};

use crate::comparison::{ComparisonRow, Side};

/// An error as displayed by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ViewError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Request,
            message: message.into(),
        }
    }

    /// Request failures get `prefix` in front of the normalized detail;
    /// validation messages are shown as-is.
    pub fn from_stats_error(err: &StatsError, prefix: &str) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::validation(err.detail()),
            ErrorKind::Request => Self::request(format!("{}{}", prefix, err.detail())),
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Integral values print without decimals ("95"), others as sent ("96.2").
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value))
}

fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", format_number(v), unit),
        None => "n/a".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityCard {
    pub label: &'static str,
    pub value: String,
    /// The headline card, drawn larger than the rest
    pub headline: bool,
}

/// Cards in display order, uncomfortable-day first.
pub fn probability_cards(stats: &WeatherStats) -> Vec<ProbabilityCard> {
    let p = &stats.probabilities;
    let card = |label, value, headline| ProbabilityCard {
        label,
        value: format_percent(value),
        headline,
    };

    let mut cards = vec![
        card("Uncomfortable Day (Feels Like > 95°F)", p.uncomfortable, true),
        card("Very Sunny", p.sunny, false),
        card("Very Hot", p.hot, false),
        card("Very Humid", p.humid, false),
        card("Very Wet", p.wet, false),
        card("Very Cold", p.cold, false),
        card("Snowfall", p.snowy, false),
        card("Very Windy", p.windy, false),
    ];
    if let Some(combined) = p.combined {
        cards.push(card("All Selected Factors", combined, false));
    }
    cards
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewLine {
    pub label: &'static str,
    pub value: String,
}

/// Averages, records and trend.
pub fn overview_lines(stats: &WeatherStats) -> Vec<OverviewLine> {
    let a = &stats.averages;
    let line = |label, value| OverviewLine { label, value };

    vec![
        line(
            "Avg. High / Feels Like",
            format!(
                "{}°F / {}",
                format_number(a.avg_high_f),
                format_optional(a.avg_heat_index_f, "°F")
            ),
        ),
        line("Avg. Low", format!("{}°F", format_number(a.avg_low_f))),
        line("Avg. Humidity", format_optional(a.avg_humidity_percent, "%")),
        line("Avg. Wind", format!("{} mph", format_number(a.avg_wind_mph))),
        line("Avg. Pressure", format_optional(a.avg_pressure_kpa, " kPa")),
        line("Avg. Sunlight", format_optional(a.avg_insolation_kwhr, " kWh/m²")),
        line(
            "Record High",
            format!("{}°F", format_number(stats.records.record_high_f)),
        ),
        line(
            "Record Low",
            format!("{}°F", format_number(stats.records.record_low_f)),
        ),
        line(
            "Temp Trend",
            stats.trend.temp_trend_label.as_str().to_string(),
        ),
    ]
}

/// What a results panel shows. Loading wins over error, error over results.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView<'a> {
    Loading,
    Error(&'a ViewError),
    Empty,
    Ready(&'a WeatherStats),
}

impl<'a> ResultsView<'a> {
    pub fn from_parts(
        loading: bool,
        error: Option<&'a ViewError>,
        results: Option<&'a WeatherStats>,
    ) -> Self {
        if loading {
            Self::Loading
        } else if let Some(err) = error {
            Self::Error(err)
        } else if let Some(stats) = results {
            Self::Ready(stats)
        } else {
            Self::Empty
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Loading => "Fetching and analyzing decades of NASA data...\n".to_string(),
            Self::Error(err) => format!("Error: {}\n", err),
            Self::Empty => "Ready for Analysis\nSelect a location and date, then run an analysis to see your weather insights.\n".to_string(),
            Self::Ready(stats) => render_stats(stats),
        }
    }
}

pub fn render_stats(stats: &WeatherStats) -> String {
    StatsText(stats).to_string()
}

pub fn render_comparison(rows: &[ComparisonRow]) -> String {
    ComparisonText(rows).to_string()
}

pub fn render_heat_points(points: &[HeatPoint]) -> String {
    HeatPointsText(points).to_string()
}

pub fn render_perfect_days(results: &[PerfectDayResult]) -> String {
    PerfectDaysText(results).to_string()
}

struct StatsText<'a>(&'a WeatherStats);

impl fmt::Display for StatsText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        writeln!(f, "Historical Overview")?;
        writeln!(
            f,
            "Based on {} years of data for the selected period.",
            stats.total_years_analyzed
        )?;
        for line in overview_lines(stats) {
            writeln!(f, "  {:<24}{}", format!("{}:", line.label), line.value)?;
        }

        writeln!(f, "\nProbability of Conditions")?;
        for card in probability_cards(stats) {
            let marker = if card.headline { "*" } else { " " };
            writeln!(f, " {} {:<40}{:>5}", marker, card.label, card.value)?;
        }

        let points = stats.chart_data.points();
        if !points.is_empty() {
            writeln!(f, "\nHigh Temperature Trend Over Time")?;
            for (year, high) in points {
                writeln!(f, "  {}  {}°F", year, format_number(high))?;
            }
        }
        Ok(())
    }
}

struct ComparisonText<'a>(&'a [ComparisonRow]);

impl fmt::Display for ComparisonText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<30}{:>14}{:>14}", "Metric", "Scenario A", "Scenario B")?;
        for row in self.0 {
            let mark = |side| if row.better == Some(side) { " +" } else { "  " };
            writeln!(
                f,
                "{:<30}{:>12}{}{:>12}{}",
                row.label,
                row.value_a,
                mark(Side::A),
                row.value_b,
                mark(Side::B),
            )?;
        }
        Ok(())
    }
}

struct HeatPointsText<'a>(&'a [HeatPoint]);

impl fmt::Display for HeatPointsText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10}{:>11}{:>11}", "lat", "lon", "intensity")?;
        for p in self.0 {
            writeln!(f, "{:>10.3}{:>11.3}{:>11.3}", p.lat(), p.lon(), p.intensity())?;
        }
        Ok(())
    }
}

struct PerfectDaysText<'a>(&'a [PerfectDayResult]);

impl fmt::Display for PerfectDaysText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, r) in self.0.iter().enumerate() {
            writeln!(f, "{:>2}. {:<28} score {}", rank + 1, r.period, format_number(r.score))?;
        }
        Ok(())
    }
}
