//! Location Resolution Module
//!
//! This module turns free-text location input (coordinates, names, postal
//! codes) into a weather query and resolves it into a named location with
//! its current weather.

use crate::models::{Coordinate, WeatherReport};
use crate::weather::WeatherClient;
use crate::{HydrocastError, Result};
use tracing::debug;

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Location name (city, region, etc.)
    Name(String),
    /// Postal code
    PostalCode(String),
}

impl LocationInput {
    /// Query string understood by the weather source
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            LocationInput::Coordinates(lat, lon) => Coordinate::new(*lat, *lon).to_query(),
            LocationInput::Name(name) => name.clone(),
            LocationInput::PostalCode(postal) => postal.replace(' ', ""),
        }
    }
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Parse location input (coordinates, city names, postal codes)
    pub fn parse(input: &str) -> Result<LocationInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HydrocastError::validation("Location must not be empty"));
        }

        if let Ok((lat, lon)) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(lat, lon));
        }

        if Self::is_postal_code(input) {
            return Ok(LocationInput::PostalCode(input.to_string()));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Parse coordinates from string like "46.0569,14.5058" or "46.0569 14.5058"
    fn parse_coordinates(input: &str) -> Result<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        let [lat, lon] = parts.as_slice() else {
            return Err(HydrocastError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        };

        let lat = lat
            .parse::<f64>()
            .map_err(|_| HydrocastError::validation(format!("Invalid latitude: {lat}")))?;
        let lon = lon
            .parse::<f64>()
            .map_err(|_| HydrocastError::validation(format!("Invalid longitude: {lon}")))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(HydrocastError::validation(format!(
                "Latitude must be between -90 and 90, got: {lat}"
            )));
        }

        if !(-180.0..=180.0).contains(&lon) {
            return Err(HydrocastError::validation(format!(
                "Longitude must be between -180 and 180, got: {lon}"
            )));
        }

        Ok((lat, lon))
    }

    /// Check if input looks like a postal code
    fn is_postal_code(input: &str) -> bool {
        let normalized = input.replace([' ', '-'], "");

        // Plain numeric codes (4 digits in Slovenia/Austria, 5 in most of Europe)
        if (4..=5).contains(&normalized.len()) || normalized.len() == 9 {
            return normalized.chars().all(|c| c.is_ascii_digit());
        }

        // Country prefix followed by an alphanumeric code with digits
        if normalized.len() >= 5 && normalized.len() <= 10 {
            let (prefix, suffix) = normalized.split_at(2);
            return prefix.chars().all(|c| c.is_ascii_alphabetic())
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
                && suffix.chars().any(|c| c.is_ascii_digit());
        }

        false
    }
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location input into a named location with its weather
    pub async fn resolve(client: &WeatherClient, input: &LocationInput) -> Result<WeatherReport> {
        debug!("Resolving location input: {:?}", input);

        let mut report = client.forecast(&input.to_query()).await.map_err(|e| match e {
            HydrocastError::Api { message } => HydrocastError::validation(format!(
                "Location not found: {} ({message})",
                input.to_query()
            )),
            other => other,
        })?;

        if report.location.name.trim().is_empty() {
            debug!("Source returned no name, using coordinates as name");
            report.location.name = report.location.coordinate.to_string();
        }

        debug!(
            "Resolved location: {} at ({})",
            report.location.name, report.location.coordinate
        );

        Ok(report)
    }

    /// Parse and resolve free text in one step
    pub async fn resolve_text(client: &WeatherClient, text: &str) -> Result<WeatherReport> {
        let input = LocationParser::parse(text)?;
        Self::resolve(client, &input).await
    }
}
