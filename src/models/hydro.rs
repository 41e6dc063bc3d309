//! Hydrological domain types
//!
//! These are the strict internal shapes produced by `hydro::payload` after
//! normalization. Nothing downstream of the client ever sees raw JSON.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A measurable parameter such as water level or water temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub unit: Option<String>,
}

/// A fixed monitoring point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub water_body_id: Option<String>,
    /// `None` when the source reported no usable position
    pub coordinate: Option<Coordinate>,
}

/// A named river or lake grouping several stations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBody {
    pub id: String,
    pub name: String,
}

/// One observed value of a variable at a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub station_id: String,
    pub variable_id: String,
    /// Station-local wall-clock time
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// One predicted value of a variable at a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub station_id: String,
    pub variable_id: String,
    /// Station-local wall-clock time; only the calendar day is meaningful
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// Confidence in percent, when the source provides one
    pub confidence: Option<f64>,
}

/// Declares that a station reports a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationVariable {
    pub station_id: String,
    pub variable_id: String,
}

/// Result of the source's own nearest-station lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestStation {
    pub station_id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
    pub distance_km: Option<f64>,
}

/// Filters for a measurement query; unset fields are not sent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementQuery {
    pub station_id: Option<String>,
    pub water_body_id: Option<String>,
    pub variable_id: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl MeasurementQuery {
    #[must_use]
    pub fn for_station(station_id: &str, variable_id: &str) -> Self {
        Self {
            station_id: Some(station_id.to_string()),
            variable_id: Some(variable_id.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }
}

/// Most recent measurement in a series, if any
#[must_use]
pub fn latest_measurement(measurements: &[Measurement]) -> Option<&Measurement> {
    measurements.iter().max_by_key(|m| m.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn measurement(day: u32, value: f64) -> Measurement {
        Measurement {
            station_id: "1060".to_string(),
            variable_id: "water_level".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            value,
        }
    }

    #[test]
    fn test_latest_measurement_ignores_order() {
        let series = vec![measurement(3, 120.0), measurement(5, 140.0), measurement(4, 130.0)];
        assert_eq!(latest_measurement(&series).map(|m| m.value), Some(140.0));
        assert!(latest_measurement(&[]).is_none());
    }

    #[test]
    fn test_measurement_query_builder() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 8).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let query = MeasurementQuery::for_station("1060", "water_level").between(from, to);
        assert_eq!(query.station_id.as_deref(), Some("1060"));
        assert_eq!(query.water_body_id, None);
        assert_eq!(query.to, Some(to));
    }
}
