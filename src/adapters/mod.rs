//! Concrete provider adapters
//!
//! One module per external open-data source. Each adapter implements the
//! uniform [`ProviderAdapter`](crate::types::ProviderAdapter) contract:
//! issue one outbound request, respect its own timeout, and map every
//! transport or parse failure into the recoverable error taxonomy — never
//! panic, never leak a provider-specific error upward.
//!
//! Categories without a keyless open endpoint (schools, demographics,
//! market) have no adapter here; the engine still serves them wherever a
//! deployment registers its own.

pub mod open_meteo;
pub mod overpass_transit;
pub mod socrata_crime;
pub mod usgs_quake;

pub use open_meteo::OpenMeteoAdapter;
pub use overpass_transit::OverpassTransitAdapter;
pub use socrata_crime::SocrataCrimeAdapter;
pub use usgs_quake::UsgsQuakeAdapter;

use crate::error::EngineError;
use crate::types::SourceError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const USER_AGENT: &str = "geoprofile/0.1.0 (https://github.com/geoprofile/geoprofile)";

/// Build the shared-settings HTTP client for an adapter
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::Configuration(format!("HTTP client build failed: {}", e)))
}

/// Map a transport-level failure into the adapter error taxonomy
pub(crate) fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Unavailable(err.to_string())
    }
}

/// Reject non-success statuses before attempting to parse a body
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SourceError::Unavailable(format!("HTTP {}", status)))
    }
}

/// Minimum-interval rate limiter
///
/// Serializes requests to an upstream that enforces a request budget. The
/// wait happens inside the adapter's `fetch`, so it counts against that
/// adapter's own timeout and never delays sibling adapters.
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            last_request: Mutex::new(None),
            min_interval,
        })
    }

    /// Wait if necessary to comply with the interval
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait_time.as_millis() as u64, "Rate limiting");
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_enforces_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(40));

        let started = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;

        // Two enforced gaps of 40ms after the free first call
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_call_is_free() {
        let limiter = RateLimiter::new(Duration::from_millis(500));

        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
