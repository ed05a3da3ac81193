//! Overpass (OpenStreetMap) transit adapter
//!
//! Counts public-transport stops within walking distance of the query point
//! and derives a proximity score. Distances use a flat-earth degree
//! approximation, which is fine at an 800 m radius.

use crate::adapters::{check_status, http_client, transport_error};
use crate::engine::fallback::transit_access_score;
use crate::error::EngineError;
use crate::types::{Category, GeoQuery, Payload, ProviderAdapter, SourceError, TransitAccess};
use serde::Deserialize;
use std::time::Duration;

const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const RADIUS_M: u32 = 800;
/// Meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    lat: f64,
    lon: f64,
}

/// Transit provider backed by the Overpass API
pub struct OverpassTransitAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl OverpassTransitAdapter {
    pub fn new() -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(10);
        Ok(Self {
            client: http_client(timeout)?,
            timeout,
        })
    }

    fn query_body(query: &GeoQuery) -> String {
        format!(
            "[out:json][timeout:8];\
             (node(around:{r},{lat},{lon})[\"highway\"=\"bus_stop\"];\
              node(around:{r},{lat},{lon})[\"public_transport\"=\"platform\"];\
              node(around:{r},{lat},{lon})[\"railway\"=\"station\"];);\
             out body;",
            r = RADIUS_M,
            lat = query.latitude,
            lon = query.longitude
        )
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OverpassTransitAdapter {
    fn name(&self) -> &str {
        "overpass"
    }

    fn category(&self) -> Category {
        Category::Transit
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reliability_weight(&self) -> f32 {
        0.8
    }

    async fn fetch(&self, query: &GeoQuery) -> Result<Payload, SourceError> {
        let response = self
            .client
            .post(OVERPASS_URL)
            .form(&[("data", Self::query_body(query))])
            .send()
            .await
            .map_err(transport_error)?;

        let elements = check_status(response)?
            .json::<OverpassResponse>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?
            .elements;

        let stop_count = elements.len() as u32;
        let nearest_stop_m = elements
            .iter()
            .map(|e| flat_distance_m(query.latitude, query.longitude, e.lat, e.lon))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let access_score =
            transit_access_score(stop_count, nearest_stop_m.unwrap_or(f64::from(RADIUS_M) * 2.0));

        Ok(Payload::Transit(TransitAccess {
            stop_count,
            nearest_stop_m,
            access_score,
        }))
    }
}

/// Straight-line distance in meters via the equirectangular approximation
fn flat_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1) * METERS_PER_DEGREE;
    let dlon = (lon2 - lon1) * METERS_PER_DEGREE * lat1.to_radians().cos();
    (dlat * dlat + dlon * dlon).sqrt()
}
