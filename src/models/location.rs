//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Upstream sources encode a missing position as `(0, 0)`, so that point
    /// never counts as a real location.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Format as a `lat,lon` query string
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A resolved, named place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Location name (city, region, etc.)
    pub name: String,
    /// Region or state, if the source reports one
    pub region: Option<String>,
    /// Country name
    pub country: Option<String>,
    pub coordinate: Coordinate,
    /// IANA timezone identifier, e.g. `Europe/Ljubljana`
    pub timezone: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            name,
            region: None,
            country: None,
            coordinate: Coordinate::new(latitude, longitude),
            timezone: None,
        }
    }

    /// Name with region and country appended where known
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            parts.push(region);
        }
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            parts.push(country);
        }
        parts.join(", ")
    }
}
