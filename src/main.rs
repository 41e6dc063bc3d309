use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use hydrocast::app::{AppState, Event};
use hydrocast::lookup::GaugeReport;
use hydrocast::models::{LocationUpdate, MeasurementQuery, NewLocation, WeatherSnapshot};
use hydrocast::nearest::rank_by_distance;
use hydrocast::{
    DocumentStore, FjallStore, HydroClient, HydrocastConfig, HydrocastError, IdentityProvider,
    LocalIdentity, LookupService, UserId, WeatherReport, telemetry,
};

/// Weather and river-gauge lookup for named locations
#[derive(Debug, Parser)]
#[command(name = "hydrocast", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Current weather and today's forecast
    Weather { location: String },
    /// Nearest river gauge, its latest reading and forecast trend
    Gauge {
        location: String,
        #[arg(long)]
        variable: Option<String>,
    },
    /// Weather and gauge data together
    Lookup {
        location: String,
        #[arg(long)]
        variable: Option<String>,
    },
    /// Save a location with a snapshot of its current weather
    Save {
        location: String,
        /// Name to store instead of the resolved one
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved locations, most recently updated first
    List,
    /// Take a new weather snapshot for a saved location
    Refresh { id: String },
    Rename { id: String, name: String },
    Delete { id: String },
    /// Stations ordered by distance from a location, or all stations
    Stations {
        #[arg(long)]
        near: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Variables,
    WaterBodies,
    /// Recent measurements at a station or water body
    Measurements {
        #[arg(long)]
        station: Option<String>,
        #[arg(long)]
        water_body: Option<String>,
        #[arg(long)]
        variable: Option<String>,
        #[arg(long, default_value_t = 1)]
        days: i64,
    },
    SignIn,
    SignOut,
}

fn print_weather(report: &WeatherReport) {
    let current = &report.current;
    println!("{}", report.location.display_name());
    println!("  Local time:  {}", report.local_time.format("%Y-%m-%d %H:%M"));
    println!("  Conditions:  {}", current.condition);
    println!("  Temperature: {}", report.format_temperature());
    if let Some(humidity) = current.humidity {
        println!("  Humidity:    {humidity:.0}%");
    }
    println!("  Pressure:    {}", report.format_pressure());
    println!("  Wind:        {}", report.format_wind());

    let Some(today) = &report.today else {
        return;
    };
    if let (Some(sunrise), Some(sunset)) = (today.sunrise, today.sunset) {
        println!(
            "  Sun:         {} - {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        );
    }
    if let (Some(min), Some(max)) = (today.min_temp_c, today.max_temp_c) {
        println!("  Today:       {min:.1}°C to {max:.1}°C");
    }
    if let Some(chance) = today.chance_of_rain {
        println!("  Rain chance: {chance:.0}%");
    }
    if let Some(phase) = &today.moon_phase {
        println!("  Moon:        {phase}");
    }
}

fn print_gauge(gauge: Option<&GaugeReport>, state: &AppState, service: &LookupService) {
    let Some(gauge) = gauge else {
        println!("No river gauge with a known position was found.");
        return;
    };

    println!(
        "{} (station {}, {:.1} km away)",
        gauge.station.name, gauge.station.id, gauge.distance_km
    );
    match &gauge.latest {
        Some(latest) => println!(
            "  Latest:   {:.1} at {}",
            latest.value,
            latest.timestamp.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  Latest:   no recent measurement"),
    }
    match &gauge.forecast {
        Some(forecast) if forecast.from_fallback => println!(
            "  Forecast: borrowed from {} ({} samples)",
            forecast
                .station_name
                .as_deref()
                .unwrap_or(forecast.station_id.as_str()),
            forecast.samples.len()
        ),
        Some(forecast) => println!("  Forecast: {} samples", forecast.samples.len()),
        None => println!("  Forecast: none available"),
    }
    match state.trend(service.today()) {
        Some(trend) if gauge.trend_uses_other_station() => println!(
            "  Trend:    {trend} (forecast of another station against this gauge's reading)"
        ),
        Some(trend) => println!("  Trend:    {trend}"),
        None => println!("  Trend:    not enough data"),
    }
}

/// One CLI invocation: configuration plus the state its events build up
struct Session {
    config: HydrocastConfig,
    state: AppState,
}

impl Session {
    fn new(config: HydrocastConfig) -> Self {
        Self {
            state: AppState::new(config.trend.params()),
            config,
        }
    }

    fn report_error(&self) -> bool {
        if let Some(message) = &self.state.error {
            eprintln!("Error: {message}");
        }
        false
    }

    /// Feed a fetch outcome into the state; `false` when it failed
    fn loaded<T>(&mut self, result: hydrocast::Result<T>, event: impl FnOnce(T) -> Event) -> bool {
        match result {
            Ok(value) => {
                self.state.apply(event(value));
                true
            }
            Err(err) => {
                debug!("Lookup failed: {:?}", err);
                self.state.apply(Event::LookupFailed(err));
                self.report_error()
            }
        }
    }

    fn stored<T>(&mut self, result: hydrocast::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("Store operation failed: {:?}", err);
                self.state.apply(Event::StoreFailed(err));
                self.report_error();
                None
            }
        }
    }

    async fn sign_in(&mut self) -> Result<(UserId, FjallStore)> {
        let identity = LocalIdentity::new(&self.config.identity);
        let user = identity.sign_in().await?;
        self.state.apply(Event::SignedIn(user.clone()));

        let store = FjallStore::open(&self.config.store.location)
            .with_context(|| format!("Failed to open store at {}", self.config.store.location))?;
        Ok((user, store))
    }

    /// Load the user's list into the state and select `id` from it
    async fn select(&mut self, store: &FjallStore, user: &UserId, id: &str) -> bool {
        let Some(locations) = self.stored(store.list(user).await) else {
            return false;
        };
        self.state.apply(Event::SavedLocationsChanged(locations));
        self.state.apply(Event::SavedLocationSelected(id.to_string()));
        self.state.selected_location().is_some() || self.report_error()
    }

    async fn run(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Weather { location } => {
                let service = LookupService::new(&self.config)?;
                self.state.apply(Event::LookupStarted {
                    query: location.clone(),
                });
                if !self.loaded(service.weather(&location).await, Event::WeatherLoaded) {
                    return Ok(false);
                }
                if let Some(report) = &self.state.weather {
                    print_weather(report);
                }
            }
            Command::Gauge { location, variable } => {
                let service = LookupService::new(&self.config)?;
                self.state.apply(Event::LookupStarted {
                    query: location.clone(),
                });
                let result = service.gauge_near(&location, variable.as_deref()).await;
                if !self.loaded(result, Event::GaugeLoaded) {
                    return Ok(false);
                }
                print_gauge(self.state.gauge.as_ref(), &self.state, &service);
            }
            Command::Lookup { location, variable } => {
                let service = LookupService::new(&self.config)?;
                self.state.apply(Event::LookupStarted {
                    query: location.clone(),
                });
                let result = service.lookup(&location, variable.as_deref()).await;
                if !self.loaded(result, Event::LookupCompleted) {
                    return Ok(false);
                }
                if let Some(report) = &self.state.weather {
                    print_weather(report);
                }
                println!();
                print_gauge(self.state.gauge.as_ref(), &self.state, &service);
            }
            Command::Save { location, name } => {
                let (user, store) = self.sign_in().await?;
                let service = LookupService::new(&self.config)?;
                if !self.loaded(service.weather(&location).await, Event::WeatherLoaded) {
                    return Ok(false);
                }
                let Some(report) = &self.state.weather else {
                    return Ok(false);
                };

                let mut new_location = NewLocation::from_report(report, Utc::now());
                if let Some(name) = name {
                    new_location.name = name;
                }
                let Some(saved) = self.stored(store.create(&user, new_location).await) else {
                    return Ok(false);
                };
                println!("Saved {} as {}", saved.name, saved.id);
            }
            Command::List => {
                let (user, store) = self.sign_in().await?;
                let Some(locations) = self.stored(store.list(&user).await) else {
                    return Ok(false);
                };
                self.state.apply(Event::SavedLocationsChanged(locations));

                if self.state.saved.is_empty() {
                    println!("No saved locations.");
                }
                for location in &self.state.saved {
                    println!(
                        "{}  {:<24} {:>6.1}°C  {:<20} ({})  updated {}",
                        location.id,
                        location.name,
                        location.snapshot.temperature_c,
                        location.snapshot.condition,
                        location.coordinate,
                        location.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Command::Refresh { id } => {
                let (user, store) = self.sign_in().await?;
                if !self.select(&store, &user, &id).await {
                    return Ok(false);
                }
                let Some(coordinate) = self.state.selected_location().map(|l| l.coordinate) else {
                    return Ok(false);
                };

                let service = LookupService::new(&self.config)?;
                let result = service.weather(&coordinate.to_query()).await;
                if !self.loaded(result, Event::WeatherLoaded) {
                    return Ok(false);
                }
                let Some(report) = &self.state.weather else {
                    return Ok(false);
                };
                let update = LocationUpdate {
                    snapshot: Some(WeatherSnapshot::from_report(report, Utc::now())),
                    ..LocationUpdate::default()
                };
                let Some(updated) = self.stored(store.update(&user, &id, update).await) else {
                    return Ok(false);
                };
                println!(
                    "Refreshed {}: {:.1}°C, {}",
                    updated.name, updated.snapshot.temperature_c, updated.snapshot.condition
                );
            }
            Command::Rename { id, name } => {
                let (user, store) = self.sign_in().await?;
                let update = LocationUpdate {
                    name: Some(name),
                    ..LocationUpdate::default()
                };
                let Some(updated) = self.stored(store.update(&user, &id, update).await) else {
                    return Ok(false);
                };
                println!("Renamed {} to {}", updated.id, updated.name);
            }
            Command::Delete { id } => {
                let (user, store) = self.sign_in().await?;
                if self.stored(store.delete(&user, &id).await).is_none() {
                    return Ok(false);
                }
                println!("Deleted {id}");
            }
            Command::Stations { near, limit } => {
                let hydro = HydroClient::new(&self.config.hydro)?;
                let stations = hydro.stations().await.map_err(HydrocastError::from)?;
                match near {
                    Some(location) => {
                        let service = LookupService::new(&self.config)?;
                        let reference = service.weather(&location).await?.location.coordinate;
                        for found in rank_by_distance(reference, &stations).into_iter().take(limit) {
                            println!(
                                "{:>8}  {:<32} {:>7.1} km",
                                found.candidate.id, found.candidate.name, found.distance_km
                            );
                        }
                        // The source's own answer, for comparison.
                        match hydro.nearest_station(reference).await {
                            Ok(Some(upstream)) => println!(
                                "Source reports nearest: {} ({}){}",
                                upstream.name,
                                upstream.station_id,
                                upstream
                                    .distance_km
                                    .map(|d| format!(", {d:.1} km"))
                                    .unwrap_or_default()
                            ),
                            Ok(None) => debug!("Source has no nearest-station answer"),
                            Err(e) => debug!("Nearest-station view failed: {}", e),
                        }
                    }
                    None => {
                        for station in stations.iter().take(limit) {
                            let position = station
                                .coordinate
                                .map_or_else(|| "unknown position".to_string(), |c| c.to_string());
                            println!("{:>8}  {:<32} {}", station.id, station.name, position);
                        }
                    }
                }
            }
            Command::Variables => {
                let hydro = HydroClient::new(&self.config.hydro)?;
                for variable in hydro.variables().await.map_err(HydrocastError::from)? {
                    let unit = variable.unit.map(|u| format!(" [{u}]")).unwrap_or_default();
                    println!("{:>6}  {}{}", variable.id, variable.name, unit);
                }
            }
            Command::WaterBodies => {
                let hydro = HydroClient::new(&self.config.hydro)?;
                for body in hydro.water_bodies().await.map_err(HydrocastError::from)? {
                    println!("{:>6}  {}", body.id, body.name);
                }
            }
            Command::Measurements {
                station,
                water_body,
                variable,
                days,
            } => {
                if station.is_none() && water_body.is_none() {
                    return Err(HydrocastError::validation(
                        "Pass --station or --water-body to select measurements",
                    )
                    .into());
                }
                let days = days.max(1);
                let hydro = HydroClient::new(&self.config.hydro)?;
                let to = Utc::now().with_timezone(&hydro.timezone()).naive_local();
                let query = MeasurementQuery {
                    station_id: station,
                    water_body_id: water_body,
                    variable_id: Some(
                        variable.unwrap_or_else(|| self.config.hydro.default_variable.clone()),
                    ),
                    ..MeasurementQuery::default()
                }
                .between(to - Duration::days(days), to);

                let measurements = hydro
                    .measurements(&query)
                    .await
                    .map_err(HydrocastError::from)?;
                if measurements.is_empty() {
                    println!("No measurements in the last {days} day(s).");
                }
                for m in measurements {
                    println!(
                        "{}  station {:<8} {:>10.2}",
                        m.timestamp.format("%Y-%m-%d %H:%M"),
                        m.station_id,
                        m.value
                    );
                }
            }
            Command::SignIn => {
                let identity = LocalIdentity::new(&self.config.identity);
                let user = identity.sign_in().await?;
                self.state.apply(Event::SignedIn(user.clone()));
                println!("Signed in as {user}");
            }
            Command::SignOut => {
                let identity = LocalIdentity::new(&self.config.identity);
                identity.sign_out().await?;
                self.state.apply(Event::SignedOut);
                println!("Signed out");
            }
        }
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = HydrocastConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    telemetry::init(&config.logging, cli.verbose);
    info!("hydrocast {} starting", hydrocast::VERSION);

    let mut session = Session::new(config);
    match session.run(cli.command).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            if let Some(known) = err.downcast_ref::<HydrocastError>() {
                eprintln!("Error: {}", known.user_message());
                debug!("{:?}", err);
                std::process::exit(1);
            }
            Err(err)
        }
    }
}
