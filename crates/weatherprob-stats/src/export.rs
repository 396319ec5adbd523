//! Export of a stats response as pretty JSON or a one-row CSV summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::{Location, QueryPeriod, WeatherStats};

/// Summary sections flattened into CSV columns.
const CSV_SECTIONS: [&str; 4] = ["probabilities", "averages", "records", "trend"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// What the exported stats describe.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportContext {
    pub location: Location,
    pub period: QueryPeriod,
}

pub fn to_json(stats: &WeatherStats) -> Result<String> {
    serde_json::to_string_pretty(stats).context("Failed to serialize weather stats")
}

/// Header line plus one value line. Section columns follow the field order
/// of the stats types.
pub fn to_csv(ctx: &ExportContext, stats: &WeatherStats) -> Result<String> {
    let (start, end) = match ctx.period {
        QueryPeriod::Range { start, end } => (start.to_string(), end.to_string()),
        QueryPeriod::Day(day) => (day.to_string(), String::new()),
    };

    let mut header: Vec<String> = [
        "location",
        "lat",
        "lon",
        "start_date",
        "end_date",
        "total_years_analyzed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut values = vec![
        ctx.location.name.clone(),
        ctx.location.lat.to_string(),
        ctx.location.lon.to_string(),
        start,
        end,
        stats.total_years_analyzed.to_string(),
    ];

    let tree = serde_json::to_value(stats).context("Failed to serialize weather stats")?;
    for section in CSV_SECTIONS {
        let Some(serde_json::Value::Object(fields)) = tree.get(section) else {
            continue;
        };
        for (name, value) in fields {
            let cell = match value {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => continue,
            };
            header.push(format!("{}.{}", section, name));
            values.push(cell);
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).context("Failed to write CSV header")?;
    writer.write_record(&values).context("Failed to write CSV row")?;
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;

    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// `weather_{location}_{start}_{end}.{ext}`, or `weather_{location}_{MM-DD}.{ext}` for a single day.
pub fn file_name(ctx: &ExportContext, format: ExportFormat) -> String {
    let slug = slugify(&ctx.location.name);
    let period = match ctx.period {
        QueryPeriod::Range { start, end } => format!("{}_{}", start, end),
        QueryPeriod::Day(day) => day.to_string(),
    };
    format!("weather_{}_{}.{}", slug, period, format.extension())
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "location".to_string()
    } else {
        slug.to_string()
    }
}

/// Writes the export into `dir` and returns the file path.
pub fn write_export(
    dir: &Path,
    ctx: &ExportContext,
    stats: &WeatherStats,
    format: ExportFormat,
) -> Result<PathBuf> {
    let contents = match format {
        ExportFormat::Json => to_json(stats)?,
        ExportFormat::Csv => to_csv(ctx, stats)?,
    };

    std::fs::create_dir_all(dir).context("Failed to create export directory")?;
    let path = dir.join(file_name(ctx, format));
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write export file {}", path.display()))?;

    tracing::info!("Exported weather stats to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DaySelection;
    use chrono::NaiveDate;

    fn stats() -> WeatherStats {
        serde_json::from_value(serde_json::json!({
            "total_years_analyzed": 35,
            "probabilities": {"hot": 40, "cold": 0, "windy": 12, "wet": 8, "humid": 55,
                              "sunny": 70, "snowy": 0, "uncomfortable": 95},
            "averages": {"avg_high_f": 93.4, "avg_low_f": 74.0, "avg_wind_mph": 9.1,
                         "avg_humidity_percent": 61.0, "avg_insolation_kwhr": 6.8},
            "records": {"record_high_f": 109.2, "record_low_f": 61.5},
            "trend": {"temp_trend_label": "warming"},
            "chart_data": {"years": [1990, 1991], "high_temps": [92.0, 94.1]}
        }))
        .unwrap()
    }

    fn ctx() -> ExportContext {
        ExportContext {
            location: Location::new("Phoenix, Arizona", 33.45, -112.07),
            period: QueryPeriod::Range {
                start: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            },
        }
    }

    #[test]
    fn test_csv_has_matching_columns() {
        let csv_text = to_csv(&ctx(), &stats()).unwrap();
        assert_eq!(csv_text.lines().count(), 2);

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let header = reader.headers().unwrap().clone();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(header.len(), rows[0].len());

        let idx = header
            .iter()
            .position(|h| h == "probabilities.uncomfortable")
            .unwrap();
        assert_eq!(&rows[0][idx], "95.0");
        assert_eq!(&rows[0][0], "Phoenix, Arizona");
        assert!(!header.iter().any(|h| h.starts_with("chart_data")));
    }

    #[test]
    fn test_missing_optional_average_is_empty_cell() {
        let csv_text = to_csv(&ctx(), &stats()).unwrap();
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let header = reader.headers().unwrap().clone();
        let row = reader.records().next().unwrap().unwrap();
        let idx = header
            .iter()
            .position(|h| h == "averages.avg_pressure_kpa")
            .unwrap();
        assert_eq!(&row[idx], "");
    }

    #[test]
    fn test_csv_columns_follow_field_order() {
        let csv_text = to_csv(&ctx(), &stats()).unwrap();
        let header = csv_text.lines().next().unwrap();
        let averages: Vec<_> = header
            .split(',')
            .filter(|h| h.starts_with("averages."))
            .collect();
        assert_eq!(
            averages,
            vec![
                "averages.avg_high_f",
                "averages.avg_low_f",
                "averages.avg_wind_mph",
                "averages.avg_humidity_percent",
                "averages.avg_pressure_kpa",
                "averages.avg_insolation_kwhr",
                "averages.avg_heat_index_f",
            ]
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            file_name(&ctx(), ExportFormat::Csv),
            "weather_phoenix_arizona_2025-07-01_2025-07-14.csv"
        );

        let day_ctx = ExportContext {
            location: Location::new("  ", 0.0, 0.0),
            period: QueryPeriod::Day(DaySelection::new(3, 9).unwrap()),
        };
        assert_eq!(
            file_name(&day_ctx, ExportFormat::Json),
            "weather_location_03-09.json"
        );
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), &ctx(), &stats(), ExportFormat::Json).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: WeatherStats = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, stats());
    }
}
