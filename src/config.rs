//! Configuration options for the rollcall client

use crate::error::Error;
use std::env;
use std::time::Duration;
use url::Url;

/// Configuration options for the rollcall client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The HTTP request timeout
    pub request_timeout: Option<Duration>,

    /// How long a position request may take
    pub geolocation_timeout: Duration,

    /// Oldest fix accepted when marking attendance. Clock-out always
    /// requires a fresh fix.
    pub mark_maximum_age: Duration,

    /// Period of the clock-out countdown
    pub tick_interval: Duration,

    /// How long a notification stays visible
    pub notice_ttl: Duration,

    /// Device description sent with attendance marks
    pub user_agent: String,

    /// Screen description sent with attendance marks
    pub screen_resolution: Option<String>,

    /// Open clock-ins whose session ended longer ago than this are treated
    /// as abandoned. `None` keeps them open indefinitely.
    pub abandoned_clock_in_cutoff: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            geolocation_timeout: Duration::from_secs(10),
            mark_maximum_age: Duration::ZERO,
            tick_interval: Duration::from_secs(1),
            notice_ttl: Duration::from_secs(5),
            user_agent: format!("rollcall/{}", env!("CARGO_PKG_VERSION")),
            screen_resolution: None,
            abandoned_clock_in_cutoff: None,
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the geolocation timeout
    pub fn with_geolocation_timeout(mut self, value: Duration) -> Self {
        self.geolocation_timeout = value;
        self
    }

    /// Set the oldest acceptable fix for attendance marks
    pub fn with_mark_maximum_age(mut self, value: Duration) -> Self {
        self.mark_maximum_age = value;
        self
    }

    /// Set the countdown period
    pub fn with_tick_interval(mut self, value: Duration) -> Self {
        self.tick_interval = value;
        self
    }

    /// Set how long notifications stay visible
    pub fn with_notice_ttl(mut self, value: Duration) -> Self {
        self.notice_ttl = value;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, value: &str) -> Self {
        self.user_agent = value.to_string();
        self
    }

    /// Set the screen resolution
    pub fn with_screen_resolution(mut self, value: &str) -> Self {
        self.screen_resolution = Some(value.to_string());
        self
    }

    /// Set the abandoned clock-in cutoff
    pub fn with_abandoned_clock_in_cutoff(mut self, value: Option<Duration>) -> Self {
        self.abandoned_clock_in_cutoff = value;
        self
    }
}

/// Everything needed to talk to an attendance backend
#[derive(Debug, Clone)]
pub struct RollcallConfig {
    pub api_url: Url,
    pub token: Option<String>,
    pub options: ClientOptions,
}

impl RollcallConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, Error> {
        let api_url = Url::parse(api_url)?;
        if api_url.cannot_be_a_base() {
            return Err(Error::config(format!("{} cannot be used as an API base", api_url)));
        }
        Ok(Self {
            api_url,
            token: token.filter(|t| !t.trim().is_empty()),
            options: ClientOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads the configuration from the environment, honoring a `.env` file.
    ///
    /// `ROLLCALL_API_URL` is required. `ROLLCALL_TOKEN`,
    /// `ROLLCALL_REQUEST_TIMEOUT_SECS`, `ROLLCALL_GEOLOCATION_TIMEOUT_SECS` and
    /// `ROLLCALL_SCREEN_RESOLUTION` are optional.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let api_url = env::var("ROLLCALL_API_URL")
            .map_err(|_| Error::config("ROLLCALL_API_URL environment variable is required"))?;
        let token = env::var("ROLLCALL_TOKEN").ok();

        let mut options = ClientOptions::default();
        if let Some(secs) = seconds_var("ROLLCALL_REQUEST_TIMEOUT_SECS")? {
            options = options.with_request_timeout(Some(secs));
        }
        if let Some(secs) = seconds_var("ROLLCALL_GEOLOCATION_TIMEOUT_SECS")? {
            options = options.with_geolocation_timeout(secs);
        }
        if let Ok(resolution) = env::var("ROLLCALL_SCREEN_RESOLUTION") {
            options = options.with_screen_resolution(&resolution);
        }

        Ok(Self::new(&api_url, token)?.with_options(options))
    }
}

fn seconds_var(name: &str) -> Result<Option<Duration>, Error> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| Error::config(format!("{} must be a whole number of seconds", name))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.geolocation_timeout, Duration::from_secs(10));
        assert_eq!(options.tick_interval, Duration::from_secs(1));
        assert_eq!(options.mark_maximum_age, Duration::ZERO);
        assert!(options.abandoned_clock_in_cutoff.is_none());
        assert!(options.user_agent.starts_with("rollcall/"));
    }

    #[test]
    fn config_rejects_unusable_urls() {
        assert!(RollcallConfig::new("not a url", None).is_err());
        assert!(RollcallConfig::new("mailto:someone@example.com", None).is_err());
    }

    #[test]
    fn blank_token_is_dropped() {
        let config =
            RollcallConfig::new("https://api.example.com", Some("  ".to_string())).unwrap();
        assert!(config.token.is_none());
    }
}
