use super::state::Phase;
use rollcall_geolocation::GeolocationError;
use std::time::Duration;
use thiserror::Error;

/// Input refused before any request is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter the attendance code")]
    EmptyOtp,

    #[error("The scanned code does not contain an attendance code")]
    UnreadableCode,

    #[error("Not clocked in")]
    NotClockedIn,

    #[error("Clock-out opens when the class ends ({remaining:?} remaining)")]
    ClockOutTooEarly { remaining: Duration },
}

/// Outcome of a failed attendance attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Location unavailable: {0}")]
    Location(#[from] GeolocationError),

    /// The server refused the attempt; `message` is what it said.
    #[error("{message}")]
    BusinessRule { message: String },

    #[error("{message}")]
    Transport { message: String },

    /// Another attempt is running or the phase does not allow this action.
    #[error("Action not available while {phase}")]
    Busy { phase: Phase },

    /// The controller was shut down while the attempt was running.
    #[error("Attendance capture was shut down")]
    Detached,
}

pub type Result<T> = std::result::Result<T, CaptureError>;
