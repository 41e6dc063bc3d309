//! Error types and handling for `hydrocast`

use thiserror::Error;

use crate::hydro::HydroError;

/// Main error type for the `hydrocast` application
#[derive(Error, Debug)]
pub enum HydrocastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Weather API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// A response body that could not be normalized into internal types
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Document store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// Identity provider errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Hydrological data source errors
    #[error(transparent)]
    Hydro(#[from] HydroError),

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl HydrocastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            HydrocastError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            HydrocastError::Api { message } => {
                format!("Weather service request failed: {message}")
            }
            HydrocastError::Parse { .. } => {
                "Received data in an unexpected format. Please try again later.".to_string()
            }
            HydrocastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            HydrocastError::Store { .. } => {
                "Saving or loading your locations failed. Your previous list is unchanged."
                    .to_string()
            }
            HydrocastError::Auth { .. } => "Please sign in first.".to_string(),
            HydrocastError::Hydro(err) => err.user_message(),
            HydrocastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            HydrocastError::General { message } => message.clone(),
        }
    }
}
