//! Weather data source client
//!
//! Fetches current conditions, today's forecast and astronomy data for a free
//! text or `lat,lon` query, and fills in sunrise and sunset locally when the
//! source leaves them out.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use std::time::{Duration, Instant};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::{debug, error, info, instrument, warn};

use crate::config::WeatherConfig;
use crate::models::{Coordinate, WeatherReport};
use crate::{HydrocastError, Result};

pub mod payload;

const USER_AGENT: &str = concat!("hydrocast/", env!("CARGO_PKG_VERSION"));

/// Sunrise and sunset for `date` at `coordinate`, in UTC.
///
/// Either event may be absent during polar day or night.
pub fn get_sunrise_sunset(
    coordinate: Coordinate,
    date: NaiveDate,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let coordinates = Coordinates::new(coordinate.latitude, coordinate.longitude).ok_or_else(
        || {
            HydrocastError::validation(format!(
                "Invalid coordinates: lat={}, lng={}",
                coordinate.latitude, coordinate.longitude
            ))
        },
    )?;

    let solar_day = SolarDay::new(coordinates, date);
    let sunrise: Option<DateTime<Utc>> = solar_day.event_time(SolarEvent::Sunrise).into();
    let sunset: Option<DateTime<Utc>> = solar_day.event_time(SolarEvent::Sunset).into();

    Ok((sunrise, sunset))
}

fn to_local_time(time: DateTime<Utc>, timezone: Option<&str>) -> NaiveTime {
    match timezone.and_then(|tz| tz.parse::<chrono_tz::Tz>().ok()) {
        Some(tz) => time.with_timezone(&tz).time(),
        None => time.time(),
    }
}

/// Compute missing sunrise/sunset for today from the report's coordinate
pub fn fill_missing_daylight(report: &mut WeatherReport) {
    let Some(today) = report.today.as_mut() else {
        return;
    };
    if today.sunrise.is_some() && today.sunset.is_some() {
        return;
    }

    match get_sunrise_sunset(report.location.coordinate, today.date) {
        Ok((sunrise, sunset)) => {
            let timezone = report.location.timezone.as_deref();
            if today.sunrise.is_none() {
                today.sunrise = sunrise.map(|t| to_local_time(t, timezone));
            }
            if today.sunset.is_none() {
                today.sunset = sunset.map(|t| to_local_time(t, timezone));
            }
            debug!("Computed daylight locally for {}", report.location.name);
        }
        Err(e) => warn!("Could not compute daylight: {}", e),
    }
}

/// Client for the weather API's forecast endpoint
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherClient {
    /// Create a new weather API client
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HydrocastError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn forecast_url(&self, api_key: &str, query: &str) -> String {
        format!(
            "{}/forecast.json?key={}&q={}&days=1&aqi=no&alerts=no",
            self.base_url,
            urlencoding::encode(api_key),
            urlencoding::encode(query)
        )
    }

    /// Current conditions and today's forecast for a free-text or `lat,lon` query
    #[instrument(skip(self))]
    pub async fn forecast(&self, query: &str) -> Result<WeatherReport> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HydrocastError::validation("Location must not be empty"));
        }
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            HydrocastError::config(
                "Weather API key is not configured. Set weather.api_key or HYDROCAST_WEATHER__API_KEY.",
            )
        })?;

        info!("Getting weather for '{}'", query);
        let start_time = Instant::now();

        let response = self
            .client
            .get(self.forecast_url(api_key, query))
            .send()
            .await
            .map_err(|e| HydrocastError::api(format!("Weather request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| HydrocastError::api(format!("Failed to read weather response: {e}")))?;

        if !status.is_success() {
            let message = payload::error_message(&body)
                .unwrap_or_else(|| format!("Weather API returned HTTP {}", status.as_u16()));
            error!("Weather API error ({}): {}", status, message);
            return Err(match status.as_u16() {
                401 | 403 => HydrocastError::auth(message),
                _ => HydrocastError::api(message),
            });
        }

        let mut report = parse_report(&body)?;
        fill_missing_daylight(&mut report);

        let total_duration = start_time.elapsed();
        info!(
            "Retrieved weather for {} in {:.3}s",
            report.location.name,
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!(
                "Slow API response detected: {:.3}s",
                total_duration.as_secs_f64()
            );
        }

        Ok(report)
    }
}

/// Parse a successful forecast body
pub fn parse_report(body: &str) -> Result<WeatherReport> {
    if let Some(message) = payload::error_message(body) {
        return Err(HydrocastError::api(message));
    }

    let response: payload::ForecastResponse = serde_json::from_str(body)
        .map_err(|e| HydrocastError::parse(format!("Invalid weather response: {e}")))?;

    response
        .into_report()
        .ok_or_else(|| HydrocastError::parse("Weather response has no readable local time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;

    #[test]
    fn test_parse_report_surfaces_upstream_error() {
        let body = r#"{"error": {"code": 1006, "message": "No matching location found."}}"#;
        let err = parse_report(body).unwrap_err();
        assert!(matches!(err, HydrocastError::Api { .. }));
        assert!(err.to_string().contains("No matching location found."));
    }

    #[test]
    fn test_parse_report_rejects_malformed_body() {
        let err = parse_report("{\"location\": 3}").unwrap_err();
        assert!(matches!(err, HydrocastError::Parse { .. }));
    }

    #[test]
    fn test_sunrise_sunset_computed() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let (sunrise, sunset) = get_sunrise_sunset(Coordinate::new(46.06, 14.51), date).unwrap();
        let (sunrise, sunset) = (sunrise.unwrap(), sunset.unwrap());
        assert!(sunrise < sunset);
        assert!((sunset - sunrise).num_hours() >= 15);
    }

    #[test]
    fn test_fill_missing_daylight() {
        let mut report = parse_report(payload::tests::LJUBLJANA).unwrap();
        let today = report.today.as_mut().unwrap();
        today.sunrise = None;
        today.sunset = None;

        fill_missing_daylight(&mut report);
        let today = report.today.unwrap();
        let sunrise = today.sunrise.unwrap();
        let sunset = today.sunset.unwrap();
        // Local CEST times at the start of May.
        assert!(sunrise > NaiveTime::from_hms_opt(5, 0, 0).unwrap());
        assert!(sunrise < NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert!(sunset > NaiveTime::from_hms_opt(19, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = WeatherClient::new(&WeatherConfig::default()).unwrap();
        let err = client.forecast("Ljubljana").await.unwrap_err();
        assert!(matches!(err, HydrocastError::Config { .. }));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let config = WeatherConfig {
            api_key: Some("valid_api_key_123".to_string()),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config).unwrap();
        let err = client.forecast("   ").await.unwrap_err();
        assert!(matches!(err, HydrocastError::Validation { .. }));
    }

    #[test]
    fn test_forecast_url_encodes_query() {
        let config = WeatherConfig {
            base_url: "https://api.weatherapi.com/v1/".to_string(),
            ..WeatherConfig::default()
        };
        let client = WeatherClient::new(&config).unwrap();
        assert_eq!(
            client.forecast_url("k", "Novo mesto"),
            "https://api.weatherapi.com/v1/forecast.json?key=k&q=Novo%20mesto&days=1&aqi=no&alerts=no"
        );
    }
}
