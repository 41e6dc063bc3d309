//! Saved locations and the weather snapshot taken when they were stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinate, WeatherReport};

/// Opaque user identifier handed out by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weather at the moment a location was saved or refreshed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: String,
    pub pressure_mb: f64,
    pub wind_kph: f64,
    pub humidity: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    #[must_use]
    pub fn from_report(report: &WeatherReport, captured_at: DateTime<Utc>) -> Self {
        Self {
            temperature_c: report.current.temperature_c,
            condition: report.current.condition.clone(),
            pressure_mb: report.current.pressure_mb,
            wind_kph: report.current.wind_kph,
            humidity: report.current.humidity,
            captured_at,
        }
    }
}

/// A location in a user's personal list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub coordinate: Coordinate,
    pub snapshot: WeatherSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a record; the store assigns the rest
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub coordinate: Coordinate,
    pub snapshot: WeatherSnapshot,
}

impl NewLocation {
    #[must_use]
    pub fn from_report(report: &WeatherReport, captured_at: DateTime<Utc>) -> Self {
        Self {
            name: report.location.display_name(),
            coordinate: report.location.coordinate,
            snapshot: WeatherSnapshot::from_report(report, captured_at),
        }
    }
}

/// Partial update; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub snapshot: Option<WeatherSnapshot>,
}

impl LocationUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.snapshot.is_none()
    }
}
