use thiserror::Error;

/// Why a position could not be obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Timed out waiting for a position")]
    Timeout,
}

impl GeolocationError {
    /// Numeric code as used by the W3C Geolocation API.
    pub fn code(&self) -> u8 {
        match self {
            GeolocationError::PermissionDenied => 1,
            GeolocationError::PositionUnavailable(_) => 2,
            GeolocationError::Timeout => 3,
        }
    }

    /// Map a W3C numeric code back to an error.
    pub fn from_code(code: u8, message: &str) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::PositionUnavailable(message.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeolocationError>;
