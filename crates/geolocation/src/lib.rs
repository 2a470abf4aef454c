//! Geolocation capability for rollcall
//!
//! A provider yields a single position fix on request. [`acquire`] wraps any
//! provider with the request contract: a hard timeout and a bound on how old
//! the returned fix may be.

mod error;
mod position;
mod provider;

pub use error::{GeolocationError, Result};
pub use position::{Coordinates, Position, PositionOptions};
pub use provider::{acquire, CachedLocation, FixedLocation, GeolocationProvider};
