//! USGS earthquake adapter
//!
//! Counts significant events near the query point over a 30-year window via
//! the USGS FDSN event service, and maps the count onto the seismic
//! component of [`EnvironmentalRisk`]. Other hazard components stay unset;
//! a single-hazard provider reports only what it measured.

use crate::adapters::{check_status, http_client, transport_error};
use crate::error::EngineError;
use crate::types::{
    Category, EnvironmentalRisk, GeoQuery, Payload, ProviderAdapter, SourceError,
};
use serde::Deserialize;
use std::time::Duration;

const USGS_COUNT_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/count";
const RADIUS_KM: f64 = 150.0;
const WINDOW_YEARS: i64 = 30;
const MIN_MAGNITUDE: f64 = 4.0;

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// Seismic-risk provider backed by earthquake.usgs.gov
pub struct UsgsQuakeAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl UsgsQuakeAdapter {
    pub fn new() -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(8);
        Ok(Self {
            client: http_client(timeout)?,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for UsgsQuakeAdapter {
    fn name(&self) -> &str {
        "usgs-fdsn"
    }

    fn category(&self) -> Category {
        Category::Environmental
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reliability_weight(&self) -> f32 {
        0.95
    }

    async fn fetch(&self, query: &GeoQuery) -> Result<Payload, SourceError> {
        let start = chrono::Utc::now() - chrono::Duration::days(WINDOW_YEARS * 365);

        let response = self
            .client
            .get(USGS_COUNT_URL)
            .query(&[
                ("format", "geojson".to_string()),
                ("latitude", query.latitude.to_string()),
                ("longitude", query.longitude.to_string()),
                ("maxradiuskm", RADIUS_KM.to_string()),
                ("starttime", start.format("%Y-%m-%d").to_string()),
                ("minmagnitude", MIN_MAGNITUDE.to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let counted = check_status(response)?
            .json::<CountResponse>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        Ok(Payload::Environmental(EnvironmentalRisk {
            seismic_risk: Some(seismic_score(counted.count)),
            ..EnvironmentalRisk::default()
        }))
    }
}

/// Compress an event count onto a 0-100 risk score
///
/// Logarithmic: the difference between 0 and 10 regional events matters far
/// more than between 300 and 400.
fn seismic_score(event_count: u64) -> u8 {
    ((event_count as f64).ln_1p() * 18.0).clamp(0.0, 100.0) as u8
}
