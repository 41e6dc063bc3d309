//! Location lookup service
//!
//! Combines the weather source and the hydrological source: resolves the
//! location, picks the nearest gauge, reads its latest measurement and finds a
//! forecast for it, falling back to other stations that report the same
//! variable when the gauge has none.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{HydroConfig, HydrocastConfig};
use crate::hydro::{HydroClient, HydroError};
use crate::location_resolver::{LocationInput, LocationParser, LocationResolver};
use crate::models::{
    Coordinate, ForecastSample, Measurement, MeasurementQuery, Station, StationVariable,
    WeatherReport,
};
use crate::nearest;
use crate::trend::{self, Trend, TrendParams};
use crate::weather::WeatherClient;
use crate::{HydrocastError, Result};

/// Maximum number of other stations asked for a forecast when the nearest
/// gauge has none
pub const FORECAST_FALLBACK_PROBE_LIMIT: usize = 10;

/// The parts of the hydrological source a lookup needs
#[async_trait]
pub trait HydroSource: Send + Sync {
    async fn stations(&self) -> std::result::Result<Vec<Station>, HydroError>;
    async fn station_variables(&self) -> std::result::Result<Vec<StationVariable>, HydroError>;
    async fn measurements(
        &self,
        query: &MeasurementQuery,
    ) -> std::result::Result<Vec<Measurement>, HydroError>;
    async fn forecast(
        &self,
        station_id: &str,
        variable_id: &str,
    ) -> std::result::Result<Vec<ForecastSample>, HydroError>;
}

#[async_trait]
impl HydroSource for HydroClient {
    async fn stations(&self) -> std::result::Result<Vec<Station>, HydroError> {
        HydroClient::stations(self).await
    }

    async fn station_variables(&self) -> std::result::Result<Vec<StationVariable>, HydroError> {
        HydroClient::station_variables(self).await
    }

    async fn measurements(
        &self,
        query: &MeasurementQuery,
    ) -> std::result::Result<Vec<Measurement>, HydroError> {
        HydroClient::measurements(self, query).await
    }

    async fn forecast(
        &self,
        station_id: &str,
        variable_id: &str,
    ) -> std::result::Result<Vec<ForecastSample>, HydroError> {
        HydroClient::forecast(self, station_id, variable_id).await
    }
}

/// A forecast series and the station it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationForecast {
    pub station_id: String,
    pub station_name: Option<String>,
    /// Whether the series belongs to a station other than the nearest gauge.
    ///
    /// Gauges have their own datums, so a trend computed from such a series
    /// against the nearest gauge's reading mixes two reference levels.
    pub from_fallback: bool,
    pub samples: Vec<ForecastSample>,
}

/// River gauge data for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeReport {
    pub station: Station,
    pub distance_km: f64,
    pub variable_id: String,
    pub latest: Option<Measurement>,
    pub forecast: Option<StationForecast>,
}

impl GaugeReport {
    #[must_use]
    pub fn current_value(&self) -> Option<f64> {
        self.latest.as_ref().map(|m| m.value)
    }

    /// Whether [`GaugeReport::trend`] compares against another station's forecast
    #[must_use]
    pub fn trend_uses_other_station(&self) -> bool {
        self.forecast.as_ref().is_some_and(|f| f.from_fallback)
    }

    /// Trend of the forecast relative to the latest reading, computed fresh.
    ///
    /// With a fallback forecast the change is only indicative; see
    /// [`StationForecast::from_fallback`].
    #[must_use]
    pub fn trend(&self, today: NaiveDate, params: &TrendParams) -> Option<Trend> {
        let forecast = self.forecast.as_ref()?;
        trend::classify(&forecast.samples, self.current_value(), today, params)
    }
}

/// Weather plus gauge data for one lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupReport {
    pub weather: WeatherReport,
    pub gauge: Option<GaugeReport>,
}

/// Service tying both data sources together
pub struct LookupService {
    weather: WeatherClient,
    hydro: Arc<dyn HydroSource>,
    timezone: Tz,
    default_variable: String,
    measurement_days: u32,
}

impl LookupService {
    /// Build the service with HTTP clients for both sources
    pub fn new(config: &HydrocastConfig) -> Result<Self> {
        let weather = WeatherClient::new(&config.weather)?;
        let hydro = Arc::new(HydroClient::new(&config.hydro)?);
        Self::with_sources(weather, hydro, &config.hydro)
    }

    /// Build the service around an arbitrary hydrological source
    pub fn with_sources(
        weather: WeatherClient,
        hydro: Arc<dyn HydroSource>,
        config: &HydroConfig,
    ) -> Result<Self> {
        Ok(Self {
            weather,
            hydro,
            timezone: config.tz()?,
            default_variable: config.default_variable.clone(),
            measurement_days: config.measurement_days,
        })
    }

    /// Wall-clock time in the gauge network's timezone
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    /// Today's date in the gauge network's timezone
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Weather for free-text input
    pub async fn weather(&self, text: &str) -> Result<WeatherReport> {
        LocationResolver::resolve_text(&self.weather, text).await
    }

    /// Gauge data for the station nearest to `coordinate`
    pub async fn gauge(
        &self,
        coordinate: Coordinate,
        variable: Option<&str>,
    ) -> Result<Option<GaugeReport>> {
        let stations = self.hydro.stations().await?;
        self.gauge_among(coordinate, &stations, variable).await
    }

    /// Gauge data for free-text input; typed coordinates skip the weather source
    pub async fn gauge_near(
        &self,
        text: &str,
        variable: Option<&str>,
    ) -> Result<Option<GaugeReport>> {
        let coordinate = match LocationParser::parse(text)? {
            LocationInput::Coordinates(lat, lon) => Coordinate::new(lat, lon),
            input => {
                LocationResolver::resolve(&self.weather, &input)
                    .await?
                    .location
                    .coordinate
            }
        };
        self.gauge(coordinate, variable).await
    }

    /// Weather and gauge data for free-text input.
    ///
    /// The weather query and the station list are fetched concurrently.
    pub async fn lookup(&self, text: &str, variable: Option<&str>) -> Result<LookupReport> {
        let input = LocationParser::parse(text)?;
        info!("Looking up {:?}", input);

        let (weather, stations) = futures::try_join!(
            LocationResolver::resolve(&self.weather, &input),
            async { self.hydro.stations().await.map_err(HydrocastError::from) },
        )?;

        // Coordinates typed by the user are more precise than the
        // resolved location's rounded position.
        let coordinate = match input {
            LocationInput::Coordinates(lat, lon) => Coordinate::new(lat, lon),
            _ => weather.location.coordinate,
        };

        let gauge = self.gauge_among(coordinate, &stations, variable).await?;
        Ok(LookupReport { weather, gauge })
    }

    async fn gauge_among(
        &self,
        coordinate: Coordinate,
        stations: &[Station],
        variable: Option<&str>,
    ) -> Result<Option<GaugeReport>> {
        let variable_id = variable.unwrap_or(&self.default_variable);

        let Some(found) = nearest::nearest(coordinate, stations) else {
            info!("No station with a usable position near {}", coordinate);
            return Ok(None);
        };
        let station = found.candidate;
        info!(
            "Nearest station is {} ({}) at {:.1} km",
            station.name, station.id, found.distance_km
        );

        let now = self.now();
        let query = MeasurementQuery::for_station(&station.id, variable_id)
            .between(now - Duration::days(self.measurement_days.into()), now);

        let (measurements, forecast) = futures::try_join!(
            async {
                self.hydro
                    .measurements(&query)
                    .await
                    .map_err(HydrocastError::from)
            },
            find_forecast(self.hydro.as_ref(), &station.id, variable_id, stations),
        )?;

        Ok(Some(GaugeReport {
            station: station.clone(),
            distance_km: found.distance_km,
            variable_id: variable_id.to_string(),
            latest: crate::models::hydro::latest_measurement(&measurements).cloned(),
            forecast,
        }))
    }
}

/// Forecast for `station_id`, or for the first other station reporting
/// `variable_id` that has one.
///
/// At most [`FORECAST_FALLBACK_PROBE_LIMIT`] other stations are asked, in the
/// order the station/variable mapping lists them. Failures while probing,
/// including a failed mapping fetch, are logged and skipped.
pub async fn find_forecast(
    hydro: &dyn HydroSource,
    station_id: &str,
    variable_id: &str,
    stations: &[Station],
) -> Result<Option<StationForecast>> {
    let station_name = |id: &str| {
        stations
            .iter()
            .find(|station| station.id == id)
            .map(|station| station.name.clone())
    };

    match hydro.forecast(station_id, variable_id).await {
        Ok(samples) => {
            return Ok(Some(StationForecast {
                station_id: station_id.to_string(),
                station_name: station_name(station_id),
                from_fallback: false,
                samples,
            }));
        }
        Err(e) if e.is_forecast_unavailable() => {
            debug!("Station {} has no forecast, probing others", station_id);
        }
        Err(e) => return Err(e.into()),
    }

    let mapping = match hydro.station_variables().await {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!("Station/variable mapping unavailable, no forecast fallback: {}", e);
            return Ok(None);
        }
    };
    for candidate in fallback_candidates(&mapping, station_id, variable_id) {
        match hydro.forecast(candidate, variable_id).await {
            Ok(samples) => {
                info!("Using forecast of station {} instead of {}", candidate, station_id);
                return Ok(Some(StationForecast {
                    station_id: candidate.to_string(),
                    station_name: station_name(candidate),
                    from_fallback: true,
                    samples,
                }));
            }
            Err(e) if e.is_forecast_unavailable() => {}
            Err(e) => warn!("Forecast probe of station {} failed: {}", candidate, e),
        }
    }

    info!("No forecast found for variable {} near {}", variable_id, station_id);
    Ok(None)
}

/// Stations to probe, in mapping order, without repeats or the home station
#[must_use]
pub fn fallback_candidates<'a>(
    mapping: &'a [StationVariable],
    home_station_id: &str,
    variable_id: &str,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    mapping
        .iter()
        .filter(|entry| entry.variable_id == variable_id && entry.station_id != home_station_id)
        .map(|entry| entry.station_id.as_str())
        .filter(|id| seen.insert(*id))
        .take(FORECAST_FALLBACK_PROBE_LIMIT)
        .collect()
}
