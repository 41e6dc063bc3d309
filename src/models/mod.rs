//! Data models for hydrocast
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and place metadata
//! - Weather: Current conditions, today's forecast and pressure trend
//! - Hydro: Stations, variables, measurements and forecasts
//! - Saved: Per-user saved locations with weather snapshots

pub mod hydro;
pub mod location;
pub mod saved;
pub mod weather;

// Re-export all public types for convenient access
pub use hydro::{
    ForecastSample, Measurement, MeasurementQuery, NearestStation, Station, StationVariable,
    Variable, WaterBody,
};
pub use location::{Coordinate, Location};
pub use saved::{LocationUpdate, NewLocation, SavedLocation, UserId, WeatherSnapshot};
pub use weather::{CurrentConditions, DayForecast, HourlyReading, PressureTrend, WeatherReport};
