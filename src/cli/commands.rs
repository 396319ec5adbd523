use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use weatherprob_dashboard::views::{render_comparison, render_heat_points, render_perfect_days};
use weatherprob_dashboard::{AnalysisForm, DashboardServices, Period, Scenario, TimeSeriesViewer};
use weatherprob_stats::export::write_export;
use weatherprob_stats::{
    Criterion, DateRange, DaySelection, ExportContext, ExportFormat, Factor, Location, MapBounds,
    SeriesKind,
};

/// Directories to write analysis exports into.
pub struct Exports {
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
}

impl Exports {
    fn targets(&self) -> impl Iterator<Item = (&PathBuf, ExportFormat)> {
        let json = self.json.iter().map(|d| (d, ExportFormat::Json));
        let csv = self.csv.iter().map(|d| (d, ExportFormat::Csv));
        json.chain(csv)
    }
}

pub fn period_arg(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    month: Option<u32>,
    day: Option<u32>,
) -> Result<Period> {
    match (from, to, month, day) {
        (Some(from), Some(to), None, None) => Ok(Period::Range(DateRange::new(from, to))),
        (None, None, Some(month), Some(day)) => match DaySelection::new(month, day) {
            Some(selection) => Ok(Period::Day(Some(selection))),
            None => bail!("Invalid calendar day: month {} day {}", month, day),
        },
        _ => bail!("Give either --from/--to or --month/--day"),
    }
}

/// A compare scenario as typed on the command line.
pub struct ScenarioArg {
    location: String,
    range: DateRange,
}

impl ScenarioArg {
    pub fn from_parts(
        location: Option<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        side: &str,
    ) -> Result<Self> {
        match (location, from, to) {
            (Some(location), Some(from), Some(to)) => Ok(Self {
                location,
                range: DateRange::new(from, to),
            }),
            _ => bail!(
                "Scenario {} needs --{side}-location, --{side}-from and --{side}-to",
                side.to_uppercase()
            ),
        }
    }
}

/// Geocode `query` and take the best match.
async fn resolve_location(services: &DashboardServices, query: &str) -> Result<Location> {
    let search = services.location_search();
    search
        .search_now(query)
        .await
        .with_context(|| format!("Place search for {:?} failed", query))?;

    match search.select(0) {
        Some(location) => {
            tracing::info!("Resolved {:?} to {}", query, location.name);
            Ok(location)
        }
        None => {
            let status = search.snapshot().status;
            bail!(status.unwrap_or_else(|| format!("No results found for \"{}\"", query)))
        }
    }
}

pub async fn analyze(
    services: &DashboardServices,
    location: &str,
    period: Period,
    factors: &[Factor],
    exports: &Exports,
) -> Result<ExitCode> {
    let location = resolve_location(services, location).await?;
    println!("{}", location);

    let mut form = AnalysisForm {
        location: Some(location.clone()),
        period,
        combined_factors: Vec::new(),
    };
    for factor in factors {
        form.set_factor(*factor, true);
    }
    if !form.combined_factors.is_empty() {
        let labels: Vec<_> = form.combined_factors.iter().map(|f| f.label()).collect();
        println!("Combined factors: {}", labels.join(" + "));
    }

    let model = services.analysis();
    let outcome = model.analyze(&form).await;
    let state = model.snapshot();
    print!("{}", state.view().render());

    let Ok(stats) = outcome else {
        return Ok(ExitCode::FAILURE);
    };

    if let Some(query) = &state.query {
        let ctx = ExportContext {
            location,
            period: query.period,
        };
        for (dir, format) in exports.targets() {
            let path = write_export(dir, &ctx, &stats, format)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn compare_restore(services: &DashboardServices) -> ExitCode {
    let state = services.comparison().snapshot();
    match state.rows() {
        Some(rows) => {
            print_scenario("A", &state.scenario_a);
            print_scenario("B", &state.scenario_b);
            print!("{}", render_comparison(&rows));
            ExitCode::SUCCESS
        }
        None => {
            println!("No saved comparison.");
            ExitCode::FAILURE
        }
    }
}

fn print_scenario(label: &str, scenario: &Scenario) {
    let place = scenario
        .location
        .as_ref()
        .map_or_else(|| "no location".to_string(), ToString::to_string);
    println!("Scenario {}: {}, {}", label, place, scenario.date_range);
}

pub async fn compare(
    services: &DashboardServices,
    a: ScenarioArg,
    b: ScenarioArg,
) -> Result<ExitCode> {
    let (location_a, location_b) = (
        resolve_location(services, &a.location).await?,
        resolve_location(services, &b.location).await?,
    );

    let model = services.comparison();
    model.set_scenario_a(Scenario::new(location_a, a.range));
    model.set_scenario_b(Scenario::new(location_b, b.range));

    let outcome = model.compare().await;
    let state = model.snapshot();
    match (outcome, state.rows()) {
        (Ok(()), Some(rows)) => {
            print_scenario("A", &state.scenario_a);
            print_scenario("B", &state.scenario_b);
            print!("{}", render_comparison(&rows));
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            if let Some(err) = &state.error {
                eprintln!("{}", err);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn heatmap(
    services: &DashboardServices,
    bounds: MapBounds,
    range: Option<(NaiveDate, NaiveDate)>,
    today: NaiveDate,
) -> Result<ExitCode> {
    let explorer = services.heatmap(today);
    if let Some((from, to)) = range {
        explorer.set_date_range(DateRange::new(from, to));
    }
    explorer.refresh_with(bounds).await;

    let state = explorer.snapshot();
    if let Some(err) = &state.last_error {
        eprintln!("Failed to fetch heatmap data: {}", err);
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", state.date_range);
    print!("{}", render_heat_points(&state.points));
    Ok(ExitCode::SUCCESS)
}

pub async fn perfect_day(
    services: &DashboardServices,
    location: &str,
    criteria: &[Criterion],
    year: i32,
) -> Result<ExitCode> {
    let location = resolve_location(services, location).await?;

    let finder = services.perfect_day();
    if !criteria.is_empty() {
        finder.set_criteria(criteria);
    }
    let labels: Vec<_> = finder.snapshot().criteria.iter().map(|c| c.label()).collect();
    println!("{} ({})", location, labels.join(", "));

    if finder.find(Some(&location)).await.is_err() {
        if let Some(err) = finder.snapshot().error {
            eprintln!("{}", err);
        }
        return Ok(ExitCode::FAILURE);
    }

    let state = finder.snapshot();
    print!("{}", render_perfect_days(&state.results));
    for index in 0..state.results.len() {
        if let Some(range) = finder.select(index, year) {
            println!("  #{} in {}: {}", index + 1, year, range);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn timeseries(
    services: &DashboardServices,
    location: &str,
    from: NaiveDate,
    to: NaiveDate,
    series: SeriesKind,
) -> Result<ExitCode> {
    let location = resolve_location(services, location).await?;

    let model = services.time_series();
    let Ok(data) = model.analyze(Some(&location), &DateRange::new(from, to)).await else {
        if let Some(err) = model.snapshot().error {
            eprintln!("{}", err);
        }
        return Ok(ExitCode::FAILURE);
    };

    let mut viewer = TimeSeriesViewer::new(data);
    viewer.select(series);
    println!("{} at {}", viewer.title(), location);
    let ticks: Vec<_> = viewer.year_ticks().iter().map(ToString::to_string).collect();
    println!("Years: {}", ticks.join(" "));
    for (date, value) in viewer.points() {
        println!("{}  {} {}", date, value, viewer.unit());
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn geocode(services: &DashboardServices, query: &str) -> Result<ExitCode> {
    let search = services.location_search();
    let results = search.search_now(query).await?;

    if let Some(status) = search.snapshot().status {
        println!("{}", status);
    }
    for (i, place) in results.iter().enumerate() {
        println!("{:>2}. {}  ({:.4}, {:.4})", i + 1, place.name, place.lat, place.lon);
    }
    Ok(if results.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub async fn reverse(services: &DashboardServices, lat: f64, lon: f64) -> ExitCode {
    let location = services.geocoder.locate(lat, lon).await;
    println!("{}", location.name);
    ExitCode::SUCCESS
}
