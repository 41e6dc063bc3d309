//! Raw forecast response of the weather API and its conversion into a
//! [`WeatherReport`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::models::{
    Coordinate, CurrentConditions, DayForecast, HourlyReading, Location, PressureTrend,
    WeatherReport,
};
use crate::normalize;

const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub location: RawLocation,
    pub current: RawCurrent,
    #[serde(default)]
    pub forecast: Option<RawForecast>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(deserialize_with = "normalize::number")]
    pub lat: f64,
    #[serde(deserialize_with = "normalize::number")]
    pub lon: f64,
    #[serde(default)]
    pub tz_id: Option<String>,
    /// Wall-clock time at the location, `YYYY-MM-DD HH:MM`
    pub localtime: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCurrent {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(deserialize_with = "normalize::number")]
    pub temp_c: f64,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub feelslike_c: Option<f64>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub humidity: Option<f64>,
    #[serde(deserialize_with = "normalize::number")]
    pub pressure_mb: f64,
    #[serde(deserialize_with = "normalize::number")]
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_degree: u16,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub gust_kph: Option<f64>,
    #[serde(default)]
    pub cloud: u8,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub uv: Option<f64>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub precip_mm: Option<f64>,
    pub condition: RawCondition,
}

#[derive(Debug, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub forecastday: Vec<RawForecastDay>,
}

#[derive(Debug, Deserialize)]
pub struct RawForecastDay {
    pub date: String,
    pub day: RawDay,
    #[serde(default)]
    pub astro: Option<RawAstro>,
    #[serde(default)]
    pub hour: Vec<RawHour>,
}

#[derive(Debug, Deserialize)]
pub struct RawDay {
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub maxtemp_c: Option<f64>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub mintemp_c: Option<f64>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub totalprecip_mm: Option<f64>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub daily_chance_of_rain: Option<f64>,
    #[serde(default)]
    pub condition: Option<RawCondition>,
}

#[derive(Debug, Deserialize)]
pub struct RawAstro {
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
    #[serde(default)]
    pub moon_phase: Option<String>,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub moon_illumination: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawHour {
    pub time: String,
    #[serde(deserialize_with = "normalize::number")]
    pub pressure_mb: f64,
    #[serde(default, deserialize_with = "normalize::optional_number")]
    pub temp_c: Option<f64>,
}

/// `{"error": {"code": 1006, "message": "No matching location found."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, deserialize_with = "normalize::optional_identifier")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Upstream error message, if the body is an error envelope
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    let response: ErrorResponse = serde_json::from_str(body).ok()?;
    let message = response.error.message.trim();
    if message.is_empty() {
        response.error.code.map(|code| format!("error code {code}"))
    } else {
        Some(message.to_string())
    }
}

fn local_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), LOCAL_TIME_FORMAT).ok()
}

/// Astro times look like `05:47 AM`; placeholders such as `No sunrise` give `None`
fn clock_time(text: Option<&str>) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text?.trim(), "%I:%M %p").ok()
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl RawForecastDay {
    fn into_day(self) -> Option<DayForecast> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let astro = self.astro;

        let mut hourly: Vec<HourlyReading> = self
            .hour
            .into_iter()
            .filter_map(|hour| {
                Some(HourlyReading {
                    time: local_time(&hour.time)?,
                    pressure_mb: hour.pressure_mb,
                    temperature_c: hour.temp_c,
                })
            })
            .collect();
        hourly.sort_by_key(|reading| reading.time);

        Some(DayForecast {
            date,
            max_temp_c: self.day.maxtemp_c,
            min_temp_c: self.day.mintemp_c,
            total_precip_mm: self.day.totalprecip_mm,
            chance_of_rain: self.day.daily_chance_of_rain,
            condition: non_empty(self.day.condition.map(|c| c.text)),
            sunrise: clock_time(astro.as_ref().and_then(|a| a.sunrise.as_deref())),
            sunset: clock_time(astro.as_ref().and_then(|a| a.sunset.as_deref())),
            moon_phase: non_empty(astro.as_ref().and_then(|a| a.moon_phase.clone())),
            moon_illumination: astro.as_ref().and_then(|a| a.moon_illumination),
            hourly,
        })
    }
}

impl ForecastResponse {
    /// Convert into a report. `None` when the location's local time cannot be
    /// read, since the pressure trend and the day boundary depend on it.
    #[must_use]
    pub fn into_report(self) -> Option<WeatherReport> {
        let report_time = local_time(&self.location.localtime)?;

        let location = Location {
            name: self.location.name,
            region: non_empty(self.location.region),
            country: non_empty(self.location.country),
            coordinate: Coordinate::new(self.location.lat, self.location.lon),
            timezone: non_empty(self.location.tz_id),
        };

        let current = CurrentConditions {
            observed_at: self.current.last_updated.as_deref().and_then(local_time),
            temperature_c: self.current.temp_c,
            feels_like_c: self.current.feelslike_c,
            humidity: self.current.humidity,
            pressure_mb: self.current.pressure_mb,
            wind_kph: self.current.wind_kph,
            wind_degree: self.current.wind_degree,
            wind_gust_kph: self.current.gust_kph,
            cloud_cover: self.current.cloud.min(100),
            uv_index: self.current.uv.unwrap_or(0.0),
            precipitation_mm: self.current.precip_mm.unwrap_or(0.0),
            condition: self.current.condition.text.trim().to_string(),
        };

        let today = self
            .forecast
            .and_then(|forecast| forecast.forecastday.into_iter().next())
            .and_then(RawForecastDay::into_day);

        let pressure_trend = today.as_ref().and_then(|day| {
            PressureTrend::from_readings(current.pressure_mb, &day.hourly, report_time)
        });

        Some(WeatherReport {
            location,
            local_time: report_time,
            current,
            today,
            pressure_trend,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const LJUBLJANA: &str = r#"{
        "location": {
            "name": "Ljubljana", "region": "Osrednjeslovenska", "country": "Slovenia",
            "lat": 46.06, "lon": 14.51, "tz_id": "Europe/Ljubljana",
            "localtime": "2024-05-01 13:45"
        },
        "current": {
            "last_updated": "2024-05-01 13:30",
            "temp_c": 18.2, "feelslike_c": 17.9, "humidity": 61,
            "pressure_mb": 1014.0, "wind_kph": 9.4, "wind_degree": 250,
            "gust_kph": 14.0, "cloud": 40, "uv": 5.0, "precip_mm": 0.0,
            "condition": {"text": "Partly cloudy"}
        },
        "forecast": {"forecastday": [{
            "date": "2024-05-01",
            "day": {"maxtemp_c": 21.0, "mintemp_c": 9.5, "totalprecip_mm": 0.4,
                    "daily_chance_of_rain": "20", "condition": {"text": "Patchy rain nearby"}},
            "astro": {"sunrise": "05:47 AM", "sunset": "08:11 PM",
                      "moon_phase": "Waning Crescent", "moon_illumination": "45"},
            "hour": [
                {"time": "2024-05-01 13:00", "pressure_mb": 1013.0, "temp_c": 18.0},
                {"time": "2024-05-01 11:00", "pressure_mb": 1012.0, "temp_c": 16.0},
                {"time": "2024-05-01 12:00", "pressure_mb": 1013.2, "temp_c": 17.1}
            ]
        }]}
    }"#;

    fn report(body: &str) -> WeatherReport {
        serde_json::from_str::<ForecastResponse>(body)
            .unwrap()
            .into_report()
            .unwrap()
    }

    #[test]
    fn test_full_response_conversion() {
        let report = report(LJUBLJANA);

        assert_eq!(report.location.display_name(), "Ljubljana, Osrednjeslovenska, Slovenia");
        assert_eq!(report.location.timezone.as_deref(), Some("Europe/Ljubljana"));
        assert_eq!(report.current.humidity, Some(61.0));
        assert_eq!(report.current.condition, "Partly cloudy");
        assert_eq!(
            report.local_time,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(13, 45, 0).unwrap()
        );
        assert_eq!(
            report.current.observed_at,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(13, 30, 0)
        );

        let today = report.today.unwrap();
        assert_eq!(today.chance_of_rain, Some(20.0));
        assert_eq!(today.sunrise, NaiveTime::from_hms_opt(5, 47, 0));
        assert_eq!(today.sunset, NaiveTime::from_hms_opt(20, 11, 0));
        assert_eq!(today.moon_illumination, Some(45.0));
        // Hourly rows come back sorted.
        assert_eq!(today.hourly[0].time.format("%H").to_string(), "11");
    }

    #[test]
    fn test_pressure_trend_uses_hour_before_current() {
        // At 13:45 the reference is the 12:00 reading (1013.2), not 13:00.
        // 1014.0 - 1013.2 = 0.8 > 0.5.
        assert_eq!(report(LJUBLJANA).pressure_trend, Some(PressureTrend::Rising));
    }

    #[test]
    fn test_missing_forecast_block() {
        let body = r#"{
            "location": {"name": "X", "lat": "1.5", "lon": 2, "localtime": "2024-05-01 00:10"},
            "current": {"temp_c": 1, "pressure_mb": 1000, "wind_kph": 0, "condition": {"text": "Clear"}}
        }"#;
        let report = report(body);
        assert!(report.today.is_none());
        assert!(report.pressure_trend.is_none());
        assert_eq!(report.location.coordinate, Coordinate::new(1.5, 2.0));
        assert_eq!(report.current.humidity, None);
    }

    #[test]
    fn test_placeholder_astro_times() {
        assert_eq!(clock_time(Some("No sunset")), None);
        assert_eq!(clock_time(None), None);
        assert_eq!(clock_time(Some("12:05 AM")), NaiveTime::from_hms_opt(0, 5, 0));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 1006, "message": "No matching location found."}}"#;
        assert_eq!(error_message(body).as_deref(), Some("No matching location found."));

        let body = r#"{"error": {"code": 2008}}"#;
        assert_eq!(error_message(body).as_deref(), Some("error code 2008"));

        assert_eq!(error_message("<html>"), None);
    }
}
