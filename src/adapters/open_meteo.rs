//! Open-Meteo weather adapter
//!
//! Queries the keyless Open-Meteo forecast API and condenses the daily
//! series into [`WeatherNormals`]. The 16-day window is a coarse stand-in
//! for climate normals; good enough for a comparative score.

use crate::adapters::{check_status, http_client, transport_error};
use crate::error::EngineError;
use crate::types::{Category, GeoQuery, Payload, ProviderAdapter, SourceError, WeatherNormals};
use serde::Deserialize;
use std::time::Duration;

const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const FORECAST_DAYS: u8 = 16;
/// Days with at least this much precipitation count as wet
const WET_DAY_MM: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_sum: Vec<f64>,
}

/// Weather provider backed by api.open-meteo.com
pub struct OpenMeteoAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenMeteoAdapter {
    pub fn new() -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(8);
        Ok(Self {
            client: http_client(timeout)?,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenMeteoAdapter {
    fn name(&self) -> &str {
        "open-meteo"
    }

    fn category(&self) -> Category {
        Category::Weather
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reliability_weight(&self) -> f32 {
        0.9
    }

    async fn fetch(&self, query: &GeoQuery) -> Result<Payload, SourceError> {
        let response = self
            .client
            .get(OPEN_METEO_BASE_URL)
            .query(&[
                ("latitude", query.latitude.to_string()),
                ("longitude", query.longitude.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_sum".to_string(),
                ),
                ("forecast_days", FORECAST_DAYS.to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let daily = check_status(response)?
            .json::<ForecastResponse>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?
            .daily;

        let days = daily.temperature_2m_max.len();
        if days == 0
            || daily.temperature_2m_min.len() != days
            || daily.precipitation_sum.len() != days
        {
            return Err(SourceError::InvalidResponse(
                "daily series empty or misaligned".to_string(),
            ));
        }

        let avg_high_c = mean(&daily.temperature_2m_max);
        let avg_low_c = mean(&daily.temperature_2m_min);
        let daily_precip = mean(&daily.precipitation_sum);
        let wet_share = daily.precipitation_sum.iter().filter(|&&p| p >= WET_DAY_MM).count()
            as f64
            / days as f64;

        Ok(Payload::Weather(WeatherNormals {
            avg_high_c,
            avg_low_c,
            annual_precip_mm: daily_precip * 365.0,
            wet_days_per_year: (wet_share * 365.0) as u16,
        }))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
