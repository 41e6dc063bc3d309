use chrono::NaiveDateTime;
use chrono_tz::Tz;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::error::{HydroError, Result};
use super::payload::{
    self, RawNearestStation, RawStation, RawStationVariable, RawVariable, RawWaterBody,
};
use crate::config::HydroConfig;
use crate::models::{
    Coordinate, ForecastSample, Measurement, MeasurementQuery, NearestStation, Station,
    StationVariable, Variable, WaterBody,
};

const USER_AGENT: &str = concat!("hydrocast/", env!("CARGO_PKG_VERSION"));
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Client for the hydrological JSON views
#[derive(Debug, Clone)]
pub struct HydroClient {
    client: Client,
    base_url: String,
    timezone: Tz,
}

fn query_string(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|value| format!("{key}={}", urlencoding::encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn with_query(url: String, query: &str) -> String {
    if query.is_empty() {
        url
    } else {
        format!("{url}?{query}")
    }
}

fn format_time(time: Option<NaiveDateTime>) -> Option<String> {
    time.map(|t| t.format(QUERY_TIME_FORMAT).to_string())
}

impl HydroClient {
    /// Create a new client
    pub fn new(config: &HydroConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                crate::HydrocastError::config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timezone: config.tz()?,
        })
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn url(&self, view: &str) -> String {
        format!("{}/{view}", self.base_url)
    }

    /// Send a GET and hand back status and body without judging either
    async fn fetch(&self, url: &str) -> Result<(u16, String)> {
        debug!("Hydro API request URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HydroError::Network(format!("API request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HydroError::Network(format!("Failed to read response body: {e}")))?;

        Ok((status, body))
    }

    async fn fetch_success(&self, url: &str) -> Result<String> {
        let (status, body) = self.fetch(url).await?;
        if !(200..300).contains(&status) {
            warn!("Hydro API returned HTTP {} for {}", status, url);
            return Err(HydroError::Http { status });
        }
        Ok(body)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<Vec<T>> {
        let body = self.fetch_success(url).await?;
        payload::decode_list(&body, what)
    }

    /// All measurable variables
    #[instrument(skip(self))]
    pub async fn variables(&self) -> Result<Vec<Variable>> {
        let raw: Vec<RawVariable> = self.fetch_list(&self.url("variables"), "variables").await?;
        let variables: Vec<Variable> = raw.into_iter().map(Variable::from).collect();
        info!("Loaded {} variables", variables.len());
        Ok(variables)
    }

    /// All monitoring stations
    #[instrument(skip(self))]
    pub async fn stations(&self) -> Result<Vec<Station>> {
        let raw: Vec<RawStation> = self.fetch_list(&self.url("stations"), "stations").await?;
        let stations: Vec<Station> = raw.into_iter().map(Station::from).collect();
        info!("Loaded {} stations", stations.len());
        Ok(stations)
    }

    #[instrument(skip(self))]
    pub async fn water_bodies(&self) -> Result<Vec<WaterBody>> {
        let raw: Vec<RawWaterBody> = self
            .fetch_list(&self.url("water_bodies"), "water bodies")
            .await?;
        Ok(raw.into_iter().map(WaterBody::from).collect())
    }

    /// Which variables each station reports
    #[instrument(skip(self))]
    pub async fn station_variables(&self) -> Result<Vec<StationVariable>> {
        let raw: Vec<RawStationVariable> = self
            .fetch_list(&self.url("station_variables"), "station variables")
            .await?;
        Ok(raw.into_iter().map(StationVariable::from).collect())
    }

    /// Measurements matching `query`, in the order the source returns them
    #[instrument(skip(self))]
    pub async fn measurements(&self, query: &MeasurementQuery) -> Result<Vec<Measurement>> {
        let params = query_string(&[
            ("station_id", query.station_id.clone()),
            ("water_body_id", query.water_body_id.clone()),
            ("variable_id", query.variable_id.clone()),
            ("from", format_time(query.from)),
            ("to", format_time(query.to)),
        ]);
        let url = with_query(self.url("measurements"), &params);

        let body = self.fetch_success(&url).await?;
        let measurements = payload::decode_measurements(&body, &self.timezone)?;
        debug!("Received {} measurements", measurements.len());
        Ok(measurements)
    }

    /// The source's own nearest-station lookup; `None` when it has no answer
    #[instrument(skip(self))]
    pub async fn nearest_station(&self, coordinate: Coordinate) -> Result<Option<NearestStation>> {
        let params = query_string(&[
            ("lat", Some(coordinate.latitude.to_string())),
            ("lon", Some(coordinate.longitude.to_string())),
        ]);
        let url = with_query(self.url("nearest_station"), &params);

        let (status, body) = self.fetch(&url).await?;
        if status == 404 {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            return Err(HydroError::Http { status });
        }

        let rows: Vec<RawNearestStation> = payload::decode_list(&body, "nearest station")
            .or_else(|_| {
                serde_json::from_str::<RawNearestStation>(&body)
                    .map(|row| vec![row])
                    .map_err(|e| HydroError::Parse(format!("nearest station: {e}")))
            })?;
        Ok(rows.into_iter().next().map(NearestStation::from))
    }

    /// Forecast series for one station and variable.
    ///
    /// Fails with [`HydroError::ForecastUnavailable`] when the station has no
    /// forecast for the variable.
    #[instrument(skip(self))]
    pub async fn forecast(&self, station_id: &str, variable_id: &str) -> Result<Vec<ForecastSample>> {
        let params = query_string(&[
            ("station_id", Some(station_id.to_string())),
            ("variable_id", Some(variable_id.to_string())),
        ]);
        let url = with_query(self.url("forecasts"), &params);

        let (status, body) = self.fetch(&url).await?;
        let result = payload::decode_forecast(status, &body, station_id, variable_id, &self.timezone);
        match &result {
            Ok(samples) => info!("Received {} forecast samples", samples.len()),
            Err(e) if e.is_forecast_unavailable() => debug!("{}", e),
            Err(e) => warn!("Forecast request failed: {}", e),
        }
        result
    }
}
