//! Error handling for the rollcall client

use std::fmt;
use thiserror::Error;

/// Unified error type for the rollcall client
#[derive(Error, Debug)]
pub enum Error {
    /// Attendance API errors
    #[error("API error: {0}")]
    Api(#[from] rollcall_api::ApiError),

    /// Geolocation errors
    #[error("Geolocation error: {0}")]
    Geolocation(#[from] rollcall_geolocation::GeolocationError),

    /// Building the HTTP client failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }
}
