use thiserror::Error;

/// Errors from the hydrological data source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydroError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Hydrological API returned HTTP {status}")]
    Http { status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    /// The station has no forecast for the variable. Callers treat this as
    /// absence and may look at other stations instead.
    #[error("No forecast for variable {variable_id} at station {station_id}")]
    ForecastUnavailable {
        station_id: String,
        variable_id: String,
    },
}

impl HydroError {
    #[must_use]
    pub fn is_forecast_unavailable(&self) -> bool {
        matches!(self, HydroError::ForecastUnavailable { .. })
    }

    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            HydroError::Network(_) => {
                "Unable to reach the river gauge service. Please check your internet connection."
                    .to_string()
            }
            HydroError::Http { status } => {
                format!("The river gauge service is unavailable right now (HTTP {status}).")
            }
            HydroError::Parse(_) => {
                "The river gauge service sent data in an unexpected format.".to_string()
            }
            HydroError::ForecastUnavailable { .. } => {
                "No forecast is available for this station.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, HydroError>;
