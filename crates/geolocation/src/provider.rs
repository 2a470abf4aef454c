use crate::error::{GeolocationError, Result};
use crate::position::{Coordinates, Position, PositionOptions};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use std::sync::{Mutex, PoisonError};

/// Source of device positions
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Obtain the current position honoring `options` as far as the
    /// platform allows. [`acquire`] enforces the timeout and freshness on top.
    async fn current_position(&self, options: &PositionOptions) -> Result<Position>;
}

/// Request a single position.
///
/// The request fails with [`GeolocationError::Timeout`] once
/// `options.timeout` elapses, whatever the provider does, and a fix older
/// than `options.maximum_age` at request time is refused.
pub async fn acquire(
    provider: &dyn GeolocationProvider,
    options: &PositionOptions,
) -> Result<Position> {
    let requested_at = Utc::now();
    debug!(
        "Requesting position (high_accuracy={}, timeout={:?}, maximum_age={:?})",
        options.enable_high_accuracy, options.timeout, options.maximum_age
    );

    let request = provider.current_position(options);
    let position = match tokio::time::timeout(options.timeout, request).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("Position request timed out after {:?}", options.timeout);
            return Err(GeolocationError::Timeout);
        }
    };

    let age = position.age_at(requested_at);
    if age > options.maximum_age {
        warn!("Discarding stale fix ({:?} old)", age);
        return Err(GeolocationError::PositionUnavailable(format!(
            "fix is {}s old",
            age.as_secs()
        )));
    }

    Ok(position)
}

/// Provider that always reports the same place, stamped at request time
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coords: Coordinates,
    accuracy: f64,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coords: Coordinates::new(latitude, longitude),
            accuracy: 0.0,
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = meters;
        self
    }
}

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position> {
        Ok(Position::new(self.coords, self.accuracy, Utc::now()))
    }
}

/// Keeps the last fix of another provider and serves it while it is younger
/// than the requested `maximum_age`.
pub struct CachedLocation<P> {
    inner: P,
    last: Mutex<Option<Position>>,
}

impl<P: GeolocationProvider> CachedLocation<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    /// Forget the cached fix
    pub fn clear(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn cached(&self, options: &PositionOptions) -> Option<Position> {
        if options.maximum_age.is_zero() {
            return None;
        }
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.filter(|p| p.age_at(Utc::now()) <= options.maximum_age)
    }
}

#[async_trait]
impl<P: GeolocationProvider> GeolocationProvider for CachedLocation<P> {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position> {
        if let Some(position) = self.cached(options) {
            debug!("Serving cached fix from {}", position.timestamp);
            return Ok(position);
        }

        let position = self.inner.current_position(options).await?;
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        calls: AtomicUsize,
        age: chrono::Duration,
    }

    #[async_trait]
    impl GeolocationProvider for Counting {
        async fn current_position(&self, _options: &PositionOptions) -> Result<Position> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Position::new(
                Coordinates::new(1.0, 2.0),
                5.0,
                Utc::now() - self.age,
            ))
        }
    }

    #[test]
    fn fixed_location_is_fresh() {
        tokio_test::block_on(async {
            let provider = FixedLocation::new(43.5842, -84.7674).with_accuracy(12.0);
            let position = acquire(&provider, &PositionOptions::default()).await.unwrap();
            assert_eq!(position.coords, Coordinates::new(43.5842, -84.7674));
            assert_eq!(position.accuracy, 12.0);
        });
    }

    #[tokio::test]
    async fn stale_fix_is_refused() {
        let provider = Counting {
            calls: AtomicUsize::new(0),
            age: chrono::Duration::minutes(5),
        };
        let err = acquire(&provider, &PositionOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), 2);
    }

    #[tokio::test]
    async fn fix_within_maximum_age_is_accepted() {
        let provider = Counting {
            calls: AtomicUsize::new(0),
            age: chrono::Duration::seconds(20),
        };
        let options = PositionOptions::default().with_maximum_age(Duration::from_secs(60));
        assert!(acquire(&provider, &options).await.is_ok());
    }

    #[tokio::test]
    async fn cache_is_bypassed_for_fresh_requests() {
        let cached = CachedLocation::new(Counting {
            calls: AtomicUsize::new(0),
            age: chrono::Duration::zero(),
        });
        let fresh = PositionOptions::default();
        cached.current_position(&fresh).await.unwrap();
        cached.current_position(&fresh).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_serves_recent_fix() {
        let cached = CachedLocation::new(Counting {
            calls: AtomicUsize::new(0),
            age: chrono::Duration::zero(),
        });
        let relaxed = PositionOptions::default().with_maximum_age(Duration::from_secs(30));
        let first = cached.current_position(&relaxed).await.unwrap();
        let second = cached.current_position(&relaxed).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);

        cached.clear();
        cached.current_position(&relaxed).await.unwrap();
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_codes_round_trip() {
        for err in [
            GeolocationError::PermissionDenied,
            GeolocationError::PositionUnavailable("no signal".to_string()),
            GeolocationError::Timeout,
        ] {
            assert_eq!(GeolocationError::from_code(err.code(), "no signal"), err);
        }
    }
}
