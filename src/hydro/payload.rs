//! Raw response shapes of the hydrological API and their conversion into
//! the strict types in `models::hydro`.

use chrono_tz::Tz;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::{HydroError, Result};
use crate::models::{
    Coordinate, ForecastSample, Measurement, NearestStation, Station, StationVariable, Variable,
    WaterBody,
};
use crate::normalize::{self, Listing};

/// Error code the API uses when a station has no forecast configured
pub const FORECAST_UNAVAILABLE_CODE: &str = "forecast_unavailable";

#[derive(Debug, Deserialize)]
pub struct RawVariable {
    #[serde(alias = "variable_id", deserialize_with = "normalize::identifier")]
    pub id: String,
    #[serde(alias = "variable_name")]
    pub name: String,
    #[serde(default, alias = "units")]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStation {
    #[serde(alias = "station_id", deserialize_with = "normalize::identifier")]
    pub id: String,
    #[serde(alias = "station_name")]
    pub name: String,
    #[serde(
        default,
        alias = "waterbody_id",
        deserialize_with = "normalize::optional_identifier"
    )]
    pub water_body_id: Option<String>,
    #[serde(default, alias = "latitude", deserialize_with = "normalize::optional_number")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude", deserialize_with = "normalize::optional_number")]
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawWaterBody {
    #[serde(alias = "water_body_id", deserialize_with = "normalize::identifier")]
    pub id: String,
    #[serde(alias = "water_body_name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawMeasurement {
    #[serde(deserialize_with = "normalize::identifier")]
    pub station_id: String,
    #[serde(deserialize_with = "normalize::identifier")]
    pub variable_id: String,
    #[serde(alias = "date", alias = "time")]
    pub timestamp: String,
    #[serde(deserialize_with = "normalize::number")]
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawForecast {
    #[serde(deserialize_with = "normalize::identifier")]
    pub station_id: String,
    #[serde(deserialize_with = "normalize::identifier")]
    pub variable_id: String,
    #[serde(alias = "date", alias = "forecast_date")]
    pub timestamp: String,
    #[serde(deserialize_with = "normalize::number")]
    pub value: f64,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawStationVariable {
    #[serde(deserialize_with = "normalize::identifier")]
    pub station_id: String,
    #[serde(deserialize_with = "normalize::identifier")]
    pub variable_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RawNearestStation {
    #[serde(alias = "id", deserialize_with = "normalize::identifier")]
    pub station_id: String,
    #[serde(alias = "station_name")]
    pub name: String,
    #[serde(default, alias = "latitude", deserialize_with = "normalize::optional_number")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude", deserialize_with = "normalize::optional_number")]
    pub lon: Option<f64>,
    #[serde(default, alias = "distance", deserialize_with = "normalize::optional_number")]
    pub distance_km: Option<f64>,
}

fn coordinate(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinate> {
    Some(Coordinate::new(lat?, lon?))
}

fn timestamp(text: &str, tz: &Tz) -> Result<chrono::NaiveDateTime> {
    normalize::local_timestamp(text, tz)
        .ok_or_else(|| HydroError::Parse(format!("unrecognised timestamp {text:?}")))
}

impl From<RawVariable> for Variable {
    fn from(raw: RawVariable) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            unit: raw.unit.filter(|u| !u.is_empty()),
        }
    }
}

impl From<RawStation> for Station {
    fn from(raw: RawStation) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            water_body_id: raw.water_body_id,
            coordinate: coordinate(raw.lat, raw.lon),
        }
    }
}

impl From<RawWaterBody> for WaterBody {
    fn from(raw: RawWaterBody) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
        }
    }
}

impl From<RawStationVariable> for StationVariable {
    fn from(raw: RawStationVariable) -> Self {
        Self {
            station_id: raw.station_id,
            variable_id: raw.variable_id,
        }
    }
}

impl From<RawNearestStation> for NearestStation {
    fn from(raw: RawNearestStation) -> Self {
        Self {
            station_id: raw.station_id,
            name: raw.name,
            coordinate: coordinate(raw.lat, raw.lon),
            distance_km: raw.distance_km,
        }
    }
}

impl RawMeasurement {
    pub fn into_measurement(self, tz: &Tz) -> Result<Measurement> {
        Ok(Measurement {
            timestamp: timestamp(&self.timestamp, tz)?,
            station_id: self.station_id,
            variable_id: self.variable_id,
            value: self.value,
        })
    }
}

impl RawForecast {
    pub fn into_sample(self, tz: &Tz) -> Result<ForecastSample> {
        Ok(ForecastSample {
            timestamp: timestamp(&self.timestamp, tz)?,
            station_id: self.station_id,
            variable_id: self.variable_id,
            value: self.value,
            confidence: self.confidence,
        })
    }
}

/// Decode a list body (bare or `entries`-wrapped)
pub fn decode_list<T: DeserializeOwned>(body: &str, what: &str) -> Result<Vec<T>> {
    serde_json::from_str::<Listing<T>>(body)
        .map(Listing::into_vec)
        .map_err(|e| HydroError::Parse(format!("{what}: {e}")))
}

pub fn decode_measurements(body: &str, tz: &Tz) -> Result<Vec<Measurement>> {
    decode_list::<RawMeasurement>(body, "measurements")?
        .into_iter()
        .map(|raw| raw.into_measurement(tz))
        .collect()
}

/// Whether an error body carries the forecast-unavailable code, either as
/// `{"error": "forecast_unavailable"}` or `{"error": {"code": "forecast_unavailable"}}`
#[must_use]
pub fn is_forecast_unavailable_body(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    let Some(error) = value.get("error") else {
        return false;
    };
    error.as_str() == Some(FORECAST_UNAVAILABLE_CODE)
        || error.get("code").and_then(serde_json::Value::as_str) == Some(FORECAST_UNAVAILABLE_CODE)
}

/// Turn a forecast response into samples, classifying the "no forecast for
/// this station" cases (404, error code, empty series) separately from hard
/// failures.
pub fn decode_forecast(
    status: u16,
    body: &str,
    station_id: &str,
    variable_id: &str,
    tz: &Tz,
) -> Result<Vec<ForecastSample>> {
    let unavailable = || HydroError::ForecastUnavailable {
        station_id: station_id.to_string(),
        variable_id: variable_id.to_string(),
    };

    if status == 404 || is_forecast_unavailable_body(body) {
        return Err(unavailable());
    }
    if !(200..300).contains(&status) {
        return Err(HydroError::Http { status });
    }

    let samples = decode_list::<RawForecast>(body, "forecast")?
        .into_iter()
        .map(|raw| raw.into_sample(tz))
        .collect::<Result<Vec<_>>>()?;

    if samples.is_empty() {
        return Err(unavailable());
    }
    Ok(samples)
}
