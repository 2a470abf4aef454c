use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point on the earth in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A single fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: Coordinates,
    /// Accuracy radius in meters
    pub accuracy: f64,
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(coords: Coordinates, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coords,
            accuracy,
            timestamp,
        }
    }

    /// Age of the fix at `now`; zero for fixes stamped in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Options of a single position request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Upper bound on how long the request may take
    pub timeout: Duration,
    /// Oldest fix that is still acceptable; zero means a fresh fix only
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

impl PositionOptions {
    pub fn with_high_accuracy(mut self, value: bool) -> Self {
        self.enable_high_accuracy = value;
        self
    }

    pub fn with_timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    pub fn with_maximum_age(mut self, value: Duration) -> Self {
        self.maximum_age = value;
        self
    }
}
