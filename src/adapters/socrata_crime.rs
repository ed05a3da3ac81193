//! Socrata crime-incident adapter
//!
//! Counts incidents within a one-mile circle of the query point against a
//! configured Socrata open-data portal (domain + dataset id vary per city).
//! Socrata budgets requests per token, so calls go through a
//! minimum-interval rate limiter; the wait counts against this adapter's
//! own timeout and never stalls sibling adapters.

use crate::adapters::{check_status, http_client, transport_error, RateLimiter};
use crate::error::EngineError;
use crate::types::{Category, CrimeStats, GeoQuery, Payload, ProviderAdapter, SourceError};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const RADIUS_M: u32 = 1609;
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(200);
/// Coarse resident count assumed inside the one-mile circle, used to
/// normalize a raw incident count into a per-1000 rate
const ASSUMED_RADIUS_POPULATION: f64 = 5_000.0;

#[derive(Debug, Deserialize)]
struct CountRow {
    // SODA aggregates come back as strings
    count: String,
}

/// Crime provider backed by a Socrata (SODA) open-data portal
pub struct SocrataCrimeAdapter {
    client: reqwest::Client,
    domain: String,
    dataset: String,
    app_token: Option<String>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
}

impl SocrataCrimeAdapter {
    pub fn new(
        domain: impl Into<String>,
        dataset: impl Into<String>,
        app_token: Option<String>,
    ) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(10);
        Ok(Self {
            client: http_client(timeout)?,
            domain: domain.into(),
            dataset: dataset.into(),
            app_token,
            limiter: RateLimiter::new(MIN_REQUEST_INTERVAL),
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for SocrataCrimeAdapter {
    fn name(&self) -> &str {
        "socrata"
    }

    fn category(&self) -> Category {
        Category::Crime
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reliability_weight(&self) -> f32 {
        0.85
    }

    async fn fetch(&self, query: &GeoQuery) -> Result<Payload, SourceError> {
        self.limiter.wait().await;

        let url = format!("https://{}/resource/{}.json", self.domain, self.dataset);
        let where_clause = format!(
            "within_circle(location, {}, {}, {})",
            query.latitude, query.longitude, RADIUS_M
        );

        let mut request = self.client.get(&url).query(&[
            ("$select", "count(*) AS count"),
            ("$where", where_clause.as_str()),
        ]);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let rows = check_status(response)?
            .json::<Vec<CountRow>>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        let incidents = rows
            .first()
            .ok_or_else(|| SourceError::InvalidResponse("empty count result".to_string()))?
            .count
            .parse::<u64>()
            .map_err(|e| SourceError::InvalidResponse(format!("non-numeric count: {}", e)))?;

        Ok(Payload::Crime(stats_from_count(incidents)))
    }
}

fn stats_from_count(incidents: u64) -> CrimeStats {
    let incidents_per_1k = incidents as f64 / ASSUMED_RADIUS_POPULATION * 1000.0;
    let safety_score = (100.0 - incidents_per_1k * 1.1).clamp(0.0, 100.0) as u8;
    CrimeStats {
        incidents_per_1k,
        violent_share: None,
        safety_score,
    }
}
