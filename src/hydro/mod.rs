//! Hydrological data source: stations, variables, measurements and forecasts

pub mod client;
pub mod error;
pub mod payload;

pub use client::HydroClient;
pub use error::HydroError;
