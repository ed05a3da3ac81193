//! Shared test helpers: configurable mock adapters and engine construction
//!
//! Mock adapters avoid network dependencies; delays and failure modes are
//! explicit so timing assertions stay meaningful.

use geoprofile::config::EngineConfig;
use geoprofile::registry::ProviderRegistry;
use geoprofile::types::{
    Category, CrimeStats, DemographicSnapshot, EnvironmentalRisk, GeoQuery, MarketTrends,
    Payload, ProviderAdapter, SchoolSummary, SourceError, TransitAccess, WeatherNormals,
};
use geoprofile::ProfileEngine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a mock adapter does when invoked
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Respond successfully after the delay
    Succeed(Duration),
    /// Fail with the given error after the delay
    Fail(Duration, SourceError),
    /// Never respond; the coordinator's per-adapter timeout fires
    Hang,
}

pub struct MockAdapter {
    name: String,
    category: Category,
    timeout: Duration,
    reliability: f32,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        timeout: Duration,
        behavior: Behavior,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            timeout,
            reliability: 0.9,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_reliability(mut self, reliability: f32) -> Self {
        self.reliability = reliability;
        self
    }

    /// Handle for asserting how often the adapter was actually invoked
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reliability_weight(&self) -> f32 {
        self.reliability
    }

    async fn fetch(&self, _query: &GeoQuery) -> Result<Payload, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(sample_payload(self.category))
            }
            Behavior::Fail(delay, error) => {
                tokio::time::sleep(*delay).await;
                Err(error.clone())
            }
            Behavior::Hang => {
                // Far past any timeout used in tests
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SourceError::Unavailable("unreachable".to_string()))
            }
        }
    }
}

/// Fixed, obviously-synthetic payload for a category
pub fn sample_payload(category: Category) -> Payload {
    match category {
        Category::Crime => Payload::Crime(CrimeStats {
            incidents_per_1k: 12.5,
            violent_share: Some(0.2),
            safety_score: 86,
        }),
        Category::Schools => Payload::Schools(SchoolSummary {
            nearby_count: 7,
            avg_rating: 7.8,
            students_per_teacher: Some(18.0),
        }),
        Category::Demographics => Payload::Demographics(DemographicSnapshot {
            population: 24_000,
            median_age: 36.5,
            median_household_income: 62_000,
            owner_occupied_pct: 0.55,
        }),
        Category::Environmental => Payload::Environmental(EnvironmentalRisk {
            flood_risk: Some(15),
            wildfire_risk: Some(10),
            seismic_risk: Some(30),
            air_quality_index: Some(42),
        }),
        Category::Transit => Payload::Transit(TransitAccess {
            stop_count: 12,
            nearest_stop_m: Some(240.0),
            access_score: 68,
        }),
        Category::Weather => Payload::Weather(WeatherNormals {
            avg_high_c: 22.0,
            avg_low_c: 13.0,
            annual_precip_mm: 520.0,
            wet_days_per_year: 95,
        }),
        Category::Market => Payload::Market(MarketTrends {
            median_price: 410_000,
            price_per_sqm: Some(4_100),
            yoy_change_pct: 3.2,
            avg_days_on_market: 34,
        }),
    }
}

/// Engine over the given adapters with default policy config
pub fn test_engine(adapters: Vec<Arc<dyn ProviderAdapter>>) -> ProfileEngine {
    test_engine_with_config(adapters, EngineConfig::default())
}

pub fn test_engine_with_config(
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    config: EngineConfig,
) -> ProfileEngine {
    let registry = ProviderRegistry::from_adapters(adapters);
    ProfileEngine::new(Arc::new(registry), &config)
}

/// The standard test location
pub fn main_street() -> GeoQuery {
    GeoQuery::with_address(-33.9, 18.4, "123 Main St")
}

/// Instantly-succeeding crime + weather adapters (the API test registry)
pub fn adapter_list() -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(MockAdapter::new(
            "crime-src",
            Category::Crime,
            Duration::from_millis(100),
            Behavior::Succeed(Duration::ZERO),
        )),
        Arc::new(MockAdapter::new(
            "weather-src",
            Category::Weather,
            Duration::from_millis(100),
            Behavior::Succeed(Duration::ZERO),
        )),
    ]
}
