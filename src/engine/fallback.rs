//! Fallback Generator
//!
//! Produces a synthetic-but-plausible payload for a category whose adapters
//! all failed. Generation is a pure function of `(category, query)`: the RNG
//! seed is derived from a SHA-256 digest of both, never from wall-clock
//! time, so repeated generation for the same query is reproducible.
//!
//! A fallback payload type-checks as a normal payload for its category;
//! only the `sources` list on the enclosing field reveals provenance.

use crate::types::{
    Category, CrimeStats, DemographicSnapshot, EnvironmentalRisk, GeoQuery, MarketTrends,
    Payload, SchoolSummary, TransitAccess, WeatherNormals,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Deterministic synthetic payload generator
///
/// Stateless; safe to share across concurrent runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a plausible payload for the category at this location
    pub fn generate(&self, category: Category, query: &GeoQuery) -> Payload {
        let mut rng = seeded_rng(category, query);
        match category {
            Category::Crime => {
                let incidents_per_1k = rng.gen_range(5.0..80.0f64);
                // Safety tracks the incident rate inversely
                let safety_score = (100.0 - incidents_per_1k * 1.1).clamp(0.0, 100.0) as u8;
                Payload::Crime(CrimeStats {
                    incidents_per_1k,
                    violent_share: Some(rng.gen_range(0.05..0.35)),
                    safety_score,
                })
            }
            Category::Schools => Payload::Schools(SchoolSummary {
                nearby_count: rng.gen_range(2..25),
                avg_rating: rng.gen_range(4.0..9.5),
                students_per_teacher: Some(rng.gen_range(12.0..28.0)),
            }),
            Category::Demographics => Payload::Demographics(DemographicSnapshot {
                population: rng.gen_range(1_000..80_000),
                median_age: rng.gen_range(28.0..48.0),
                median_household_income: rng.gen_range(30_000..120_000),
                owner_occupied_pct: rng.gen_range(0.3..0.8),
            }),
            Category::Environmental => Payload::Environmental(EnvironmentalRisk {
                flood_risk: Some(rng.gen_range(0..60)),
                wildfire_risk: Some(rng.gen_range(0..60)),
                seismic_risk: Some(rng.gen_range(0..60)),
                air_quality_index: Some(rng.gen_range(10..120)),
            }),
            Category::Transit => {
                let stop_count = rng.gen_range(0..40u32);
                let nearest_stop_m = rng.gen_range(80.0..1500.0f64);
                let access_score = transit_access_score(stop_count, nearest_stop_m);
                Payload::Transit(TransitAccess {
                    stop_count,
                    nearest_stop_m: Some(nearest_stop_m),
                    access_score,
                })
            }
            Category::Weather => {
                // Rough latitude-driven climate: hotter near the equator
                let avg_high_c =
                    30.0 - query.latitude.abs() * 0.35 + rng.gen_range(-3.0..3.0f64);
                let avg_low_c = avg_high_c - rng.gen_range(6.0..12.0f64);
                let annual_precip_mm = rng.gen_range(200.0..1500.0f64);
                let wet_days_per_year = (annual_precip_mm / 9.0) as u16;
                Payload::Weather(WeatherNormals {
                    avg_high_c,
                    avg_low_c,
                    annual_precip_mm,
                    wet_days_per_year,
                })
            }
            Category::Market => {
                let median_price = rng.gen_range(150_000..900_000u32);
                Payload::Market(MarketTrends {
                    median_price,
                    price_per_sqm: Some(median_price / rng.gen_range(60..140)),
                    yoy_change_pct: rng.gen_range(-5.0..10.0),
                    avg_days_on_market: rng.gen_range(10..90),
                })
            }
        }
    }
}

/// Transit score from stop density and walking distance
pub(crate) fn transit_access_score(stop_count: u32, nearest_stop_m: f64) -> u8 {
    let density = f64::from(stop_count.min(30)) / 30.0 * 60.0;
    let proximity = ((1600.0 - nearest_stop_m.min(1600.0)) / 1600.0) * 40.0;
    (density + proximity).clamp(0.0, 100.0) as u8
}

/// Seed the RNG from a digest of (category, query)
fn seeded_rng(category: Category, query: &GeoQuery) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(query.latitude.to_bits().to_le_bytes());
    hasher.update(query.longitude.to_bits().to_le_bytes());
    if let Some(address) = &query.address {
        hasher.update(address.as_bytes());
    }
    let digest = hasher.finalize();

    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    StdRng::seed_from_u64(u64::from_le_bytes(seed_bytes))
}
