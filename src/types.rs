//! Core Types and Trait Definitions for geoprofile
//!
//! Defines the data model shared by the aggregation engine:
//! - `Category` / `Payload` — the tagged per-category payload model
//! - `ProviderAdapter` — the uniform contract every data provider implements
//! - `ProviderOutcome` — one adapter invocation's settled result
//! - `AggregatedField` / `UnifiedProfile` — what the caller receives
//!
//! # Architecture
//! One aggregation run flows: query → fan-out over adapters → outcomes →
//! scoring + fallback → merge → `UnifiedProfile`. Everything in this module
//! is either immutable after creation (`GeoQuery`, `UnifiedProfile`) or
//! transient within a single run (`ProviderOutcome`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Categories
// ============================================================================

/// Data category the engine can aggregate
///
/// Each category is served by zero or more registered adapters. The set is
/// closed: the wire representation is the lowercase category name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Crime incident statistics
    Crime,
    /// School quality summary
    Schools,
    /// Population and income snapshot
    Demographics,
    /// Natural-hazard and air-quality risk
    Environmental,
    /// Public-transport proximity
    Transit,
    /// Local weather normals
    Weather,
    /// Housing market trends
    Market,
}

impl Category {
    /// All categories, in canonical order
    pub const ALL: [Category; 7] = [
        Category::Crime,
        Category::Schools,
        Category::Demographics,
        Category::Environmental,
        Category::Transit,
        Category::Weather,
        Category::Market,
    ];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Crime => "crime",
            Category::Schools => "schools",
            Category::Demographics => "demographics",
            Category::Environmental => "environmental",
            Category::Transit => "transit",
            Category::Weather => "weather",
            Category::Market => "market",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crime" => Ok(Category::Crime),
            "schools" => Ok(Category::Schools),
            "demographics" => Ok(Category::Demographics),
            "environmental" => Ok(Category::Environmental),
            "transit" => Ok(Category::Transit),
            "weather" => Ok(Category::Weather),
            "market" => Ok(Category::Market),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Subject of one aggregation run
///
/// Immutable after creation; cloned freely into adapter tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoQuery {
    /// Latitude in decimal degrees (-90..=90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180..=180)
    pub longitude: f64,
    /// Free-form address hint; passed through to adapters that accept one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl GeoQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    pub fn with_address(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: Some(address.into()),
        }
    }

    /// Coordinate range check; the API layer rejects out-of-range queries
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Crime incident statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeStats {
    /// Reported incidents per 1000 residents per year
    pub incidents_per_1k: f64,
    /// Share of incidents classified violent (0.0-1.0), when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violent_share: Option<f64>,
    /// Derived safety score (0-100, higher is safer)
    pub safety_score: u8,
}

/// School quality summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolSummary {
    /// Schools within the search radius
    pub nearby_count: u32,
    /// Average rating on a 0-10 scale
    pub avg_rating: f64,
    /// Average students per teacher, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students_per_teacher: Option<f64>,
}

/// Population and income snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicSnapshot {
    pub population: u32,
    pub median_age: f64,
    pub median_household_income: u32,
    /// Owner-occupied housing share (0.0-1.0)
    pub owner_occupied_pct: f64,
}

/// Natural-hazard and air-quality risk scores
///
/// Each component is 0-100 (higher is worse) and optional: a single-hazard
/// provider fills only what it measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalRisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood_risk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildfire_risk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seismic_risk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality_index: Option<u16>,
}

/// Public-transport proximity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitAccess {
    /// Stops within the search radius
    pub stop_count: u32,
    /// Straight-line distance to the nearest stop, meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_stop_m: Option<f64>,
    /// Derived access score (0-100)
    pub access_score: u8,
}

/// Local weather normals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherNormals {
    pub avg_high_c: f64,
    pub avg_low_c: f64,
    pub annual_precip_mm: f64,
    pub wet_days_per_year: u16,
}

/// Housing market trends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrends {
    pub median_price: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_sqm: Option<u32>,
    pub yoy_change_pct: f64,
    pub avg_days_on_market: u16,
}

/// Tagged per-category payload
///
/// The engine treats the inner structs opaquely; the tag lets the scorer and
/// merger operate generically without losing type safety. A fallback payload
/// is structurally identical to a real one — only the `sources` list on the
/// enclosing [`AggregatedField`] reveals provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Crime(CrimeStats),
    Schools(SchoolSummary),
    Demographics(DemographicSnapshot),
    Environmental(EnvironmentalRisk),
    Transit(TransitAccess),
    Weather(WeatherNormals),
    Market(MarketTrends),
}

impl Payload {
    /// Category this payload belongs to
    pub fn category(&self) -> Category {
        match self {
            Payload::Crime(_) => Category::Crime,
            Payload::Schools(_) => Category::Schools,
            Payload::Demographics(_) => Category::Demographics,
            Payload::Environmental(_) => Category::Environmental,
            Payload::Transit(_) => Category::Transit,
            Payload::Weather(_) => Category::Weather,
            Payload::Market(_) => Category::Market,
        }
    }
}

// ============================================================================
// Provider contract
// ============================================================================

/// Per-adapter failure taxonomy
///
/// All three variants are recoverable: the engine converts them into reduced
/// confidence and (if the whole category failed) a fallback value. None of
/// them ever surface to the caller of `aggregate`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The adapter exceeded its own declared timeout
    #[error("request timed out")]
    Timeout,

    /// Transport failure or non-success status from the provider
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl SourceError {
    /// Stable kind label for logs and outcome records
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Timeout => "timeout",
            SourceError::Unavailable(_) => "unavailable",
            SourceError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Uniform provider contract
///
/// One implementation per external data source. `fetch` must respect the
/// adapter's own `timeout` (the coordinator enforces it regardless) and
/// return a [`SourceError`] rather than panicking on transport or parse
/// failures. Implementations hold no unsynchronized mutable state: the same
/// adapter is invoked concurrently for different queries.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for provenance tracking
    fn name(&self) -> &str;

    /// Category this adapter serves
    fn category(&self) -> Category;

    /// Per-invocation deadline; exceeding it yields a `Timeout` outcome
    fn timeout(&self) -> Duration;

    /// Prior reliability of this source (0.0-1.0), used by the scorer
    fn reliability_weight(&self) -> f32;

    /// Issue one outbound request and return a typed payload
    async fn fetch(&self, query: &GeoQuery) -> Result<Payload, SourceError>;
}

/// Static description of a registered adapter (registry introspection)
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub category: Category,
    /// Per-invocation deadline, milliseconds
    pub timeout_ms: u64,
    pub reliability_weight: f32,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Settled result of one adapter invocation
///
/// Owned transiently by the coordinator during a run and discarded after the
/// merge. `value` is `Some` exactly when the invocation succeeded.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub category: Category,
    /// Provider name, or `"cache"` / `"fallback"` for synthetic outcomes
    pub provider: String,
    pub reliability_weight: f32,
    pub value: Option<Payload>,
    pub error: Option<SourceError>,
    pub elapsed: Duration,
}

impl ProviderOutcome {
    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }
}

// ============================================================================
// Aggregated output
// ============================================================================

/// Discrete data-quality tier
///
/// Ordering is structural: `Poor < Fair < Good < Excellent`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// One category's aggregated result
///
/// `sources` lists only contributors that actually supplied data — real
/// provider names, `"cache"`, or `"fallback"`. Confidence is non-decreasing
/// in both the number of sources and their average reliability weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedField<T = Payload> {
    pub value: T,
    pub sources: Vec<String>,
    /// 0-100
    pub confidence: u8,
    pub data_quality: DataQuality,
    /// 0-100: share of this category's adapters that succeeded
    pub completeness: u8,
    pub last_updated: DateTime<Utc>,
}

impl<T> AggregatedField<T> {
    /// True when this field was synthesized rather than fetched
    pub fn is_fallback(&self) -> bool {
        self.sources.iter().any(|s| s == FALLBACK_SOURCE)
    }
}

/// Source label for synthesized values
pub const FALLBACK_SOURCE: &str = "fallback";

/// Source label for cache hits
pub const CACHE_SOURCE: &str = "cache";

/// Unified result of one aggregation run
///
/// Built once by the merger, immutable thereafter; safe to share read-only.
/// The profile-level triple summarizes the whole run, while each field
/// carries its own per-category triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedProfile {
    pub run_id: Uuid,
    pub query: GeoQuery,
    pub fields: BTreeMap<Category, AggregatedField>,
    /// 0-100 overall confidence for the run
    pub confidence: u8,
    pub data_quality: DataQuality,
    /// 0-100: share of requested categories satisfied by a real source
    pub completeness: u8,
    pub last_updated: DateTime<Utc>,
}

impl UnifiedProfile {
    pub fn field(&self, category: Category) -> Option<&AggregatedField> {
        self.fields.get(&category)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        assert!("schools ".parse::<Category>().is_ok(), "should trim whitespace");
        assert!("WEATHER".parse::<Category>().is_ok(), "should be case-insensitive");
        assert!("astrology".parse::<Category>().is_err());
    }

    #[test]
    fn test_payload_category_tags() {
        let payload = Payload::Weather(WeatherNormals {
            avg_high_c: 21.0,
            avg_low_c: 12.0,
            annual_precip_mm: 600.0,
            wet_days_per_year: 90,
        });
        assert_eq!(payload.category(), Category::Weather);
    }

    #[test]
    fn test_payload_serde_tagging() {
        let payload = Payload::Crime(CrimeStats {
            incidents_per_1k: 32.5,
            violent_share: Some(0.2),
            safety_score: 61,
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "crime");

        let back: Payload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(DataQuality::Poor < DataQuality::Fair);
        assert!(DataQuality::Fair < DataQuality::Good);
        assert!(DataQuality::Good < DataQuality::Excellent);
    }

    #[test]
    fn test_query_range_check() {
        assert!(GeoQuery::new(-33.9, 18.4).in_range());
        assert!(!GeoQuery::new(-91.0, 18.4).in_range());
        assert!(!GeoQuery::new(0.0, 190.0).in_range());
    }

    #[test]
    fn test_source_error_kinds() {
        assert_eq!(SourceError::Timeout.kind(), "timeout");
        assert_eq!(
            SourceError::Unavailable("503".into()).kind(),
            "unavailable"
        );
        assert_eq!(
            SourceError::InvalidResponse("bad json".into()).kind(),
            "invalid_response"
        );
    }
}
