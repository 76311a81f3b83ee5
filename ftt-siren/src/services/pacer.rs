//! Fixed-interval request pacing
//!
//! Enforces a minimum delay between consecutive registry requests. Backed by
//! a `governor` GCRA limiter with a burst of one, which admits exactly one
//! request per period and never lets requests bunch up. Share one pacer
//! (behind `Arc`) between every client that calls the same registry.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

/// Minimum-interval pacer for outbound requests
pub struct RequestPacer {
    limiter: Option<DefaultDirectRateLimiter>,
    interval: Duration,
}

impl RequestPacer {
    /// Create a pacer admitting one request per `interval`
    ///
    /// A zero interval disables pacing.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(|quota| RateLimiter::direct(quota));
        Self { limiter, interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                tracing::debug!("Rate limiting: waiting up to {:?}", self.interval);
                limiter.until_ready().await;
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Requests per minute this pacer allows
    pub fn requests_per_minute(&self) -> f64 {
        if self.interval.is_zero() {
            f64::INFINITY
        } else {
            60.0 / self.interval.as_secs_f64()
        }
    }
}
