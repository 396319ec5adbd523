use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use weatherprob_core::{AppError, CacheError, Config, ConfigError};
use weatherprob_dashboard::DashboardServices;
use weatherprob_stats::{Criterion, Factor, SeriesKind, StatsError};

pub mod commands;

#[derive(Parser)]
#[command(name = "weatherprob")]
#[command(about = "Historical weather probabilities for any place and time of year")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one location over a date range or a single calendar day
    Analyze {
        /// Place name to geocode
        #[arg(short, long)]
        location: String,

        #[arg(long, requires = "to", conflicts_with_all = ["month", "day"])]
        from: Option<NaiveDate>,

        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        #[arg(long, requires = "day")]
        month: Option<u32>,

        #[arg(long, requires = "month")]
        day: Option<u32>,

        /// Combined factor (hot, cold, windy, wet, humid, sunny); repeatable
        #[arg(long = "factor", value_parser = parse_factor)]
        factors: Vec<Factor>,

        /// Write the results as JSON into this directory
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write the summary as CSV into this directory
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },

    /// Compare two locations and date ranges side by side
    Compare {
        /// Show the last saved comparison instead of fetching
        #[arg(long, conflicts_with_all = ["a_location", "b_location"])]
        restore: bool,

        #[arg(long, required_unless_present = "restore")]
        a_location: Option<String>,
        #[arg(long, required_unless_present = "restore")]
        a_from: Option<NaiveDate>,
        #[arg(long, required_unless_present = "restore")]
        a_to: Option<NaiveDate>,

        #[arg(long, required_unless_present = "restore")]
        b_location: Option<String>,
        #[arg(long, required_unless_present = "restore")]
        b_from: Option<NaiveDate>,
        #[arg(long, required_unless_present = "restore")]
        b_to: Option<NaiveDate>,
    },

    /// Heat cells for a map rectangle
    #[command(allow_negative_numbers = true)]
    Heatmap {
        #[arg(long)]
        north: f64,
        #[arg(long)]
        south: f64,
        #[arg(long)]
        east: f64,
        #[arg(long)]
        west: f64,

        /// Defaults to two weeks starting three months from today
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },

    /// Rank the periods of the year that best match comfort criteria
    PerfectDay {
        #[arg(short, long)]
        location: String,

        /// Criterion (sunny, not_hot, not_cold, not_windy, not_humid, no_rain,
        /// no_snow); repeatable. Defaults to sunny, not_hot, no_rain.
        #[arg(long = "criterion", value_parser = parse_criterion)]
        criteria: Vec<Criterion>,

        /// Year used to turn ranked periods into dates
        #[arg(long)]
        year: Option<i32>,
    },

    /// Print one daily series of the raw history
    Timeseries {
        #[arg(short, long)]
        location: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,

        #[arg(long, value_enum, default_value_t = SeriesArg::HighTemp)]
        series: SeriesArg,
    },

    /// Search for places by name
    Geocode {
        query: String,
    },

    /// Name the place at a coordinate
    #[command(allow_negative_numbers = true)]
    Reverse {
        lat: f64,
        lon: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeriesArg {
    HighTemp,
    Precipitation,
    LowTemp,
    WindSpeed,
    Humidity,
    Sunlight,
}

impl From<SeriesArg> for SeriesKind {
    fn from(arg: SeriesArg) -> Self {
        match arg {
            SeriesArg::HighTemp => SeriesKind::HighTemp,
            SeriesArg::Precipitation => SeriesKind::Precipitation,
            SeriesArg::LowTemp => SeriesKind::LowTemp,
            SeriesArg::WindSpeed => SeriesKind::WindSpeed,
            SeriesArg::Humidity => SeriesKind::Humidity,
            SeriesArg::Sunlight => SeriesKind::Sunlight,
        }
    }
}

fn parse_factor(s: &str) -> Result<Factor, String> {
    Factor::from_id(s).ok_or_else(|| {
        let ids: Vec<_> = Factor::ALL.iter().map(|f| f.id()).collect();
        format!("unknown factor '{}' (expected one of: {})", s, ids.join(", "))
    })
}

fn parse_criterion(s: &str) -> Result<Criterion, String> {
    Criterion::from_id(s).ok_or_else(|| {
        let ids: Vec<_> = Criterion::ALL.iter().map(|c| c.id()).collect();
        format!("unknown criterion '{}' (expected one of: {})", s, ids.join(", "))
    })
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let (config, validation) = Config::load_validated(self.config.as_deref())?;

        let level = if self.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        };
        weatherprob_core::init(&level)?;
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        let services =
            DashboardServices::from_config(config).context("Failed to start services")?;
        let today = chrono::Local::now().date_naive();

        match self.command {
            Commands::Analyze {
                location,
                from,
                to,
                month,
                day,
                factors,
                export_json,
                export_csv,
            } => {
                let period = commands::period_arg(from, to, month, day)?;
                let exports = commands::Exports {
                    json: export_json,
                    csv: export_csv,
                };
                commands::analyze(&services, &location, period, &factors, &exports).await
            }
            Commands::Compare {
                restore: true, ..
            } => Ok(commands::compare_restore(&services)),
            Commands::Compare {
                a_location,
                a_from,
                a_to,
                b_location,
                b_from,
                b_to,
                ..
            } => {
                let a = commands::ScenarioArg::from_parts(a_location, a_from, a_to, "a")?;
                let b = commands::ScenarioArg::from_parts(b_location, b_from, b_to, "b")?;
                commands::compare(&services, a, b).await
            }
            Commands::Heatmap {
                north,
                south,
                east,
                west,
                from,
                to,
            } => {
                let bounds = weatherprob_stats::MapBounds {
                    north,
                    south,
                    east,
                    west,
                };
                commands::heatmap(&services, bounds, from.zip(to), today).await
            }
            Commands::PerfectDay {
                location,
                criteria,
                year,
            } => {
                let year = year.unwrap_or_else(|| today.year());
                commands::perfect_day(&services, &location, &criteria, year).await
            }
            Commands::Timeseries {
                location,
                from,
                to,
                series,
            } => commands::timeseries(&services, &location, from, to, series.into()).await,
            Commands::Geocode { query } => commands::geocode(&services, &query).await,
            Commands::Reverse { lat, lon } => Ok(commands::reverse(&services, lat, lon).await),
        }
    }
}

/// Lift a command failure into [`AppError`], looking through any context.
pub fn app_error(err: anyhow::Error) -> AppError {
    let err = match err.downcast::<ConfigError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<StatsError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<CacheError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    match err.downcast::<std::io::Error>() {
        Ok(e) => AppError::Io(e),
        Err(err) => AppError::Other(err),
    }
}

/// Print a failure the way a user should see it: the friendly line, then
/// the full chain.
pub fn report(err: anyhow::Error) {
    let detail = format!("{:#}", err);
    let app = app_error(err);
    if app.is_validation() {
        eprintln!("{}", detail);
    } else {
        eprintln!("{}\n  {}", app.user_message(), detail);
    }
}
