//! Weather report model and display methods

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::Location;

/// Pressure difference (hPa) beyond which the trend counts as rising or falling
pub const PRESSURE_TREND_THRESHOLD: f64 = 0.5;

/// Current conditions at the queried location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    /// When the source last updated the observation (location-local time)
    pub observed_at: Option<NaiveDateTime>,
    /// Temperature in Celsius
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Atmospheric pressure in hPa
    pub pressure_mb: f64,
    /// Wind speed in km/h
    pub wind_kph: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_degree: u16,
    pub wind_gust_kph: Option<f64>,
    /// Cloud cover percentage (0-100)
    pub cloud_cover: u8,
    pub uv_index: f64,
    /// Precipitation amount in mm
    pub precipitation_mm: f64,
    /// Human-readable description of weather conditions
    pub condition: String,
}

/// One hourly forecast row, reduced to what the pressure trend needs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyReading {
    pub time: NaiveDateTime,
    pub pressure_mb: f64,
    pub temperature_c: Option<f64>,
}

/// Today's forecast including astronomy data
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub max_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
    pub total_precip_mm: Option<f64>,
    /// Chance of rain in percent
    pub chance_of_rain: Option<f64>,
    pub condition: Option<String>,
    pub sunrise: Option<NaiveTime>,
    pub sunset: Option<NaiveTime>,
    pub moon_phase: Option<String>,
    pub moon_illumination: Option<f64>,
    /// Hourly readings, ascending by time
    pub hourly: Vec<HourlyReading>,
}

/// Short-term pressure tendency
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PressureTrend {
    Rising,
    Falling,
    Stable,
}

impl PressureTrend {
    /// Compare the current pressure with the latest hourly reading taken
    /// strictly before the hour containing `now`.
    ///
    /// Returns `None` when no such reading exists.
    #[must_use]
    pub fn from_readings(
        current_mb: f64,
        hourly: &[HourlyReading],
        now: NaiveDateTime,
    ) -> Option<Self> {
        let hour_start = now
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);

        let previous = hourly
            .iter()
            .filter(|reading| reading.time < hour_start)
            .max_by_key(|reading| reading.time)?;

        let difference = current_mb - previous.pressure_mb;
        Some(if difference > PRESSURE_TREND_THRESHOLD {
            PressureTrend::Rising
        } else if difference < -PRESSURE_TREND_THRESHOLD {
            PressureTrend::Falling
        } else {
            PressureTrend::Stable
        })
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureTrend::Rising => "↑",
            PressureTrend::Falling => "↓",
            PressureTrend::Stable => "→",
        }
    }
}

impl std::fmt::Display for PressureTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PressureTrend::Rising => write!(f, "rising"),
            PressureTrend::Falling => write!(f, "falling"),
            PressureTrend::Stable => write!(f, "stable"),
        }
    }
}

/// Everything the weather source reports for one location query
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: Location,
    /// Wall-clock time at the location when the report was produced
    pub local_time: NaiveDateTime,
    pub current: CurrentConditions,
    pub today: Option<DayForecast>,
    pub pressure_trend: Option<PressureTrend>,
}

impl WeatherReport {
    /// Convert wind direction from degrees to cardinal direction
    #[must_use]
    pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
        match degrees {
            0..=11 | 349..=360 => "N",
            12..=33 => "NNE",
            34..=56 => "NE",
            57..=78 => "ENE",
            79..=101 => "E",
            102..=123 => "ESE",
            124..=146 => "SE",
            147..=168 => "SSE",
            169..=191 => "S",
            192..=213 => "SSW",
            214..=236 => "SW",
            237..=258 => "WSW",
            259..=281 => "W",
            282..=303 => "WNW",
            304..=326 => "NW",
            327..=348 => "NNW",
            _ => "Unknown",
        }
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.current.temperature_c)
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        let direction = Self::wind_direction_to_cardinal(self.current.wind_degree);
        match self.current.wind_gust_kph {
            Some(gust) => format!(
                "{:.1} km/h {} (gusts {:.1} km/h)",
                self.current.wind_kph, direction, gust
            ),
            None => format!("{:.1} km/h {}", self.current.wind_kph, direction),
        }
    }

    /// Format atmospheric pressure with unit and trend arrow
    #[must_use]
    pub fn format_pressure(&self) -> String {
        match self.pressure_trend {
            Some(trend) => format!(
                "{:.1} hPa {} ({trend})",
                self.current.pressure_mb,
                trend.symbol()
            ),
            None => format!("{:.1} hPa", self.current.pressure_mb),
        }
    }

    /// Hours of daylight today, if sunrise and sunset are known
    #[must_use]
    pub fn daylight(&self) -> Option<Duration> {
        let today = self.today.as_ref()?;
        let (sunrise, sunset) = (today.sunrise?, today.sunset?);
        (sunset > sunrise).then(|| sunset - sunrise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn reading(hour: u32, pressure_mb: f64) -> HourlyReading {
        HourlyReading {
            time: at(hour, 0),
            pressure_mb,
            temperature_c: None,
        }
    }

    #[test]
    fn test_pressure_uses_previous_hour() {
        let hourly = vec![reading(12, 1010.0), reading(13, 1012.0), reading(14, 1000.0)];

        // At 14:30 the 14:00 row belongs to the current hour and is ignored.
        let trend = PressureTrend::from_readings(1013.0, &hourly, at(14, 30));
        assert_eq!(trend, Some(PressureTrend::Rising));

        let trend = PressureTrend::from_readings(1011.0, &hourly, at(14, 30));
        assert_eq!(trend, Some(PressureTrend::Falling));
    }

    #[test]
    fn test_pressure_threshold_is_exclusive() {
        let hourly = vec![reading(9, 1015.0)];
        assert_eq!(
            PressureTrend::from_readings(1015.5, &hourly, at(10, 5)),
            Some(PressureTrend::Stable)
        );
        assert_eq!(
            PressureTrend::from_readings(1014.5, &hourly, at(10, 5)),
            Some(PressureTrend::Stable)
        );
        assert_eq!(
            PressureTrend::from_readings(1015.6, &hourly, at(10, 5)),
            Some(PressureTrend::Rising)
        );
    }

    #[test]
    fn test_pressure_without_prior_reading() {
        let hourly = vec![reading(10, 1015.0), reading(11, 1016.0)];
        assert_eq!(PressureTrend::from_readings(1015.0, &hourly, at(10, 45)), None);
        assert_eq!(PressureTrend::from_readings(1015.0, &[], at(10, 45)), None);
    }

    #[test]
    fn test_wind_direction_to_cardinal() {
        assert_eq!(WeatherReport::wind_direction_to_cardinal(0), "N");
        assert_eq!(WeatherReport::wind_direction_to_cardinal(90), "E");
        assert_eq!(WeatherReport::wind_direction_to_cardinal(180), "S");
        assert_eq!(WeatherReport::wind_direction_to_cardinal(270), "W");
        assert_eq!(WeatherReport::wind_direction_to_cardinal(45), "NE");
    }
}
