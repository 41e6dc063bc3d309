//! Configuration management for hydrocast
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::HydrocastError;
use crate::trend::TrendParams;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for hydrocast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrocastConfig {
    /// Weather API configuration
    pub weather: WeatherConfig,
    /// Hydrological API configuration
    pub hydro: HydroConfig,
    /// Saved-location store configuration
    pub store: StoreConfig,
    /// Local identity configuration
    pub identity: IdentityConfig,
    /// Trend classification parameters
    pub trend: TrendConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Weather API key, required for every weather request
    pub api_key: Option<String>,
    /// Base URL for weather API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Hydrological API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydroConfig {
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// IANA timezone the gauge network reports in
    pub timezone: String,
    /// Variable used by lookups when none is given (usually water level)
    pub default_variable: String,
    /// How many days of measurements to scan for the latest reading
    pub measurement_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the saved-location database
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User the local identity provider signs in as
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub window_days: usize,
    pub relative_threshold: f64,
    pub minimum_threshold: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_hydro_base_url() -> String {
    "https://hydro.example.org/api".to_string()
}

fn default_hydro_timezone() -> String {
    "Europe/Ljubljana".to_string()
}

fn default_variable() -> String {
    "1".to_string()
}

fn default_measurement_days() -> u32 {
    2
}

fn default_store_location() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("hydrocast").join("store"))
        .unwrap_or_else(|| PathBuf::from(".hydrocast/store"))
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            base_url: default_hydro_base_url(),
            timeout_seconds: default_timeout(),
            timezone: default_hydro_timezone(),
            default_variable: default_variable(),
            measurement_days: default_measurement_days(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        let params = TrendParams::default();
        Self {
            window_days: params.window_days,
            relative_threshold: params.relative_threshold,
            minimum_threshold: params.minimum_threshold,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TrendConfig {
    #[must_use]
    pub fn params(&self) -> TrendParams {
        TrendParams {
            window_days: self.window_days,
            relative_threshold: self.relative_threshold,
            minimum_threshold: self.minimum_threshold,
        }
    }
}

impl HydroConfig {
    /// Parsed gauge-network timezone
    pub fn tz(&self) -> std::result::Result<chrono_tz::Tz, HydrocastError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            HydrocastError::config(format!("Unknown hydro timezone '{}'", self.timezone))
        })
    }
}

impl HydrocastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // HYDROCAST_WEATHER__API_KEY -> weather.api_key
        builder = builder.add_source(
            Environment::with_prefix("HYDROCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: HydrocastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hydrocast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_timeout();
        }
        if self.hydro.base_url.is_empty() {
            self.hydro.base_url = default_hydro_base_url();
        }
        if self.hydro.timeout_seconds == 0 {
            self.hydro.timeout_seconds = default_timeout();
        }
        if self.hydro.timezone.is_empty() {
            self.hydro.timezone = default_hydro_timezone();
        }
        if self.hydro.default_variable.is_empty() {
            self.hydro.default_variable = default_variable();
        }
        if self.hydro.measurement_days == 0 {
            self.hydro.measurement_days = default_measurement_days();
        }
        if self.store.location.is_empty() {
            self.store.location = default_store_location();
        }
        if self.identity.user_id.as_deref().is_some_and(str::is_empty) {
            self.identity.user_id = None;
        }
        if self.trend.window_days == 0 {
            self.trend.window_days = TrendParams::default().window_days;
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        self.weather.base_url = self.weather.base_url.trim_end_matches('/').to_string();
        self.hydro.base_url = self.hydro.base_url.trim_end_matches('/').to_string();
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        // The key may be absent here; weather requests fail without one.
        if let Some(api_key) = &self.weather.api_key {
            if api_key.is_empty() {
                return Err(HydrocastError::config(
                    "Weather API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() < 8 {
                return Err(HydrocastError::config(
                    "Weather API key appears to be invalid (too short). Please check your API key.",
                )
                .into());
            }

            if api_key.len() > 100 {
                return Err(HydrocastError::config(
                    "Weather API key appears to be invalid (too long). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(
                HydrocastError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.hydro.timeout_seconds > 300 {
            return Err(HydrocastError::config(
                "Hydrological API timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.hydro.measurement_days > 31 {
            return Err(
                HydrocastError::config("Measurement window cannot exceed 31 days").into(),
            );
        }

        if !(2..=14).contains(&self.trend.window_days) {
            return Err(HydrocastError::config(
                "Trend window must cover between 2 and 14 days",
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.trend.relative_threshold) {
            return Err(HydrocastError::config(
                "Trend relative threshold must be between 0 and 1",
            )
            .into());
        }

        if !self.trend.minimum_threshold.is_finite() || self.trend.minimum_threshold < 0.0 {
            return Err(HydrocastError::config(
                "Trend minimum threshold must be a non-negative number",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(HydrocastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(HydrocastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather", &self.weather.base_url),
            ("Hydrological", &self.hydro.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(HydrocastError::config(format!(
                    "{name} API base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        self.hydro.tz()?;

        Ok(())
    }

    /// Create configuration directory if it doesn't exist
    pub fn ensure_config_dir() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let hydrocast_config_dir = config_dir.join("hydrocast");
            std::fs::create_dir_all(&hydrocast_config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    hydrocast_config_dir.display()
                )
            })?;
            Ok(hydrocast_config_dir)
        } else {
            Err(HydrocastError::config("Unable to determine config directory").into())
        }
    }
}
