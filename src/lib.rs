//! Rollcall Rust Client Library
//!
//! A Rust client for geofenced OTP classroom attendance: submit a session
//! code with the device position, clock in, and clock out once the class
//! has ended.

pub mod capture;
pub mod config;
pub mod error;

pub use rollcall_api as api;
pub use rollcall_geolocation as geolocation;

use std::sync::Arc;

use reqwest::Client;
use rollcall_api::AttendanceClient;
use rollcall_geolocation::GeolocationProvider;

use crate::capture::AttendanceCaptureController;
use crate::config::{ClientOptions, RollcallConfig};
use crate::error::Error;

/// The main entry point for the rollcall client
pub struct Rollcall {
    /// The base URL of the attendance API
    pub url: String,
    /// Bearer token of the signed-in user
    pub token: Option<String>,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Client options
    pub options: ClientOptions,
}

impl Rollcall {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use rollcall::Rollcall;
    ///
    /// let rollcall = Rollcall::new("https://attendance.example.edu/api").unwrap();
    /// ```
    pub fn new(url: &str) -> Result<Self, Error> {
        Self::new_with_options(url, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use rollcall::{Rollcall, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_screen_resolution("390x844");
    /// let rollcall =
    ///     Rollcall::new_with_options("https://attendance.example.edu/api", options).unwrap();
    /// ```
    pub fn new_with_options(url: &str, options: ClientOptions) -> Result<Self, Error> {
        // Validate early so later calls cannot fail on the base URL.
        RollcallConfig::new(url, None)?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            url: url.to_string(),
            token: None,
            http_client,
            options,
        })
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: RollcallConfig) -> Result<Self, Error> {
        let client = Self::new_with_options(config.api_url.as_str(), config.options)?;
        Ok(match config.token {
            Some(token) => client.with_token(&token),
            None => client,
        })
    }

    /// Create a client from `ROLLCALL_*` environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::from_config(RollcallConfig::from_env()?)
    }

    /// Authenticate requests with the user's bearer token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Get a client for the attendance endpoints
    pub fn attendance(&self) -> Result<AttendanceClient, Error> {
        let client = AttendanceClient::new(&self.url, self.http_client.clone())?;
        Ok(match &self.token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    /// Create an attendance capture controller using `geolocator` for fixes
    ///
    /// # Example
    ///
    /// ```
    /// use rollcall::Rollcall;
    /// use rollcall::geolocation::FixedLocation;
    ///
    /// let rollcall = Rollcall::new("https://attendance.example.edu/api")
    ///     .unwrap()
    ///     .with_token("user-token");
    /// let capture = rollcall.capture(FixedLocation::new(43.5842, -84.7674)).unwrap();
    /// assert!(!capture.can_clock_out());
    /// ```
    pub fn capture<G>(&self, geolocator: G) -> Result<AttendanceCaptureController, Error>
    where
        G: GeolocationProvider + 'static,
    {
        Ok(AttendanceCaptureController::new(
            Arc::new(self.attendance()?),
            Arc::new(geolocator),
            self.options.clone(),
        ))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::capture::{
        AttendanceCaptureController, CaptureError, CaptureEvent, ClockState, ClockStatus, Phase,
        SubmitOutcome,
    };
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::Rollcall;
}
