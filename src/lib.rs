//! `hydrocast` - weather and river-gauge lookup for named locations
//!
//! This library resolves a location, fetches its weather, picks the nearest
//! river gauge by great-circle distance, classifies the short-term trend of
//! the gauge forecast, and keeps a per-user list of saved locations.

pub mod app;
pub mod config;
pub mod error;
pub mod hydro;
pub mod identity;
pub mod location_resolver;
pub mod lookup;
pub mod models;
pub mod nearest;
pub mod normalize;
pub mod store;
pub mod telemetry;
pub mod trend;
pub mod weather;

// Re-export core types for public API
pub use app::{AppState, Event};
pub use config::HydrocastConfig;
pub use error::HydrocastError;
pub use hydro::{HydroClient, HydroError};
pub use identity::{IdentityProvider, LocalIdentity};
pub use location_resolver::{LocationInput, LocationParser, LocationResolver};
pub use lookup::{GaugeReport, LookupReport, LookupService};
pub use models::{Coordinate, Location, SavedLocation, UserId, WeatherReport};
pub use nearest::{Locatable, Nearest, nearest};
pub use store::{DocumentStore, FjallStore};
pub use trend::{Trend, TrendKind, TrendParams, classify};
pub use weather::WeatherClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, HydrocastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
