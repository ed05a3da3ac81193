//! Aggregation engine
//!
//! The coordinator fans a query out to every adapter registered for the
//! requested categories, settles all of them (success or failure never
//! blocks or cancels a sibling), then scores, fills fallbacks, and merges
//! the outcomes into one [`UnifiedProfile`].
//!
//! # Concurrency
//! Every adapter invocation is an independent future with its own deadline;
//! the coordinator performs a bulk join and proceeds only once all of them
//! have settled. Wall-clock time for a run is bounded by the slowest single
//! adapter's timeout, never the sum.
//!
//! # Error policy
//! The only error `aggregate` can return is a configuration error raised
//! before any fan-out. Adapter failures are absorbed: they lower confidence
//! and completeness, and a fully failed category is replaced by a
//! deterministic fallback value.

pub mod fallback;
pub mod merger;
pub mod scorer;

pub use fallback::FallbackGenerator;
pub use scorer::{classify_quality, ConfidenceScorer, Score};

use crate::cache::GeoCache;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::types::{
    AggregatedField, Category, DataQuality, GeoQuery, Payload, ProviderAdapter,
    ProviderOutcome, SourceError, UnifiedProfile, CACHE_SOURCE, FALLBACK_SOURCE,
};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Categories cached between runs (slow or rate-limited upstreams)
const CACHED_CATEGORIES: &[Category] = &[Category::Weather];

/// Aggregation Coordinator
///
/// Constructed once at startup with an explicit registry (no module-level
/// singletons) and shared read-only across concurrent requests; the caches
/// are the only interior mutability.
pub struct ProfileEngine {
    registry: Arc<ProviderRegistry>,
    scorer: ConfidenceScorer,
    fallback: FallbackGenerator,
    caches: HashMap<Category, GeoCache>,
    fallback_confidence: u8,
    cache_reliability_weight: f32,
}

impl ProfileEngine {
    pub fn new(registry: Arc<ProviderRegistry>, config: &EngineConfig) -> Self {
        let caches = if config.cache.enabled {
            CACHED_CATEGORIES
                .iter()
                .map(|&category| {
                    (
                        category,
                        GeoCache::new(
                            config.cache.ttl(),
                            config.cache.epsilon_degrees,
                            config.cache.max_entries,
                        ),
                    )
                })
                .collect()
        } else {
            HashMap::new()
        };

        Self {
            registry,
            scorer: ConfidenceScorer::new(&config.scoring),
            fallback: FallbackGenerator::new(),
            caches,
            fallback_confidence: config.scoring.fallback_confidence,
            cache_reliability_weight: config.scoring.cache_reliability_weight,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Aggregate a profile for the query across the requested categories
    ///
    /// Settles every adapter before scoring ("settle all, then continue" —
    /// never fail-fast past validation). Always returns a complete profile
    /// for a valid request; degraded sources show up only as lower scores
    /// and `"fallback"` provenance.
    pub async fn aggregate(
        &self,
        query: &GeoQuery,
        categories: &[Category],
    ) -> Result<UnifiedProfile> {
        let requested = self.registry.validate_request(categories)?;
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            run_id = %run_id,
            latitude = query.latitude,
            longitude = query.longitude,
            categories = requested.len(),
            "Starting aggregation run"
        );

        // Cache pre-pass: a fresh entry short-circuits that category's fan-out
        let mut outcomes: Vec<ProviderOutcome> = Vec::new();
        let mut live: Vec<Category> = Vec::new();
        for &category in &requested {
            match self.cache_lookup(category, query) {
                Some(payload) => outcomes.push(ProviderOutcome {
                    category,
                    provider: CACHE_SOURCE.to_string(),
                    reliability_weight: self.cache_reliability_weight,
                    value: Some(payload),
                    error: None,
                    elapsed: std::time::Duration::ZERO,
                }),
                None => live.push(category),
            }
        }

        // Fan out: one independent future per (category, adapter)
        let mut tasks = Vec::new();
        for &category in &live {
            for adapter in self.registry.adapters_for(category) {
                tasks.push(invoke_adapter(Arc::clone(adapter), query.clone()));
            }
        }
        outcomes.extend(join_all(tasks).await);

        // Refresh caches from live successes
        for outcome in &outcomes {
            if outcome.provider != CACHE_SOURCE {
                if let Some(payload) = &outcome.value {
                    self.cache_store(outcome.category, query, payload);
                }
            }
        }

        let overall = self.scorer.score_run(&outcomes, requested.len());

        let mut by_category: BTreeMap<Category, Vec<ProviderOutcome>> = BTreeMap::new();
        for outcome in outcomes {
            by_category.entry(outcome.category).or_default().push(outcome);
        }

        let mut fields: BTreeMap<Category, AggregatedField> = BTreeMap::new();
        let stamped = Utc::now();
        for &category in &requested {
            let category_outcomes = by_category.remove(&category).unwrap_or_default();
            let field = match self.build_field(&category_outcomes, stamped) {
                Some(field) => field,
                None => {
                    debug!(category = %category, "No source succeeded, synthesizing fallback");
                    AggregatedField {
                        value: self.fallback.generate(category, query),
                        sources: vec![FALLBACK_SOURCE.to_string()],
                        confidence: self.fallback_confidence,
                        data_quality: DataQuality::Poor,
                        completeness: 0,
                        last_updated: stamped,
                    }
                }
            };
            fields.insert(category, field);
        }

        let profile = merger::merge_profile(
            run_id,
            query,
            fields,
            &requested,
            overall,
            &self.fallback,
            self.fallback_confidence,
        );

        info!(
            run_id = %run_id,
            confidence = profile.confidence,
            completeness = profile.completeness,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation run complete"
        );
        Ok(profile)
    }

    /// Build one category's field from its settled outcomes
    ///
    /// The value comes from the first success in settle order; every other
    /// successful sibling still corroborates (listed in `sources`, raises
    /// confidence). Returns `None` when nothing succeeded.
    fn build_field(
        &self,
        outcomes: &[ProviderOutcome],
        stamped: chrono::DateTime<Utc>,
    ) -> Option<AggregatedField> {
        let value = outcomes
            .iter()
            .find_map(|o| o.value.clone())?;

        let sources: Vec<String> = outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.provider.clone())
            .collect();
        let score = self.scorer.score_category(outcomes);

        Some(AggregatedField {
            value,
            sources,
            confidence: score.confidence,
            data_quality: score.quality,
            completeness: score.completeness,
            last_updated: stamped,
        })
    }

    fn cache_lookup(&self, category: Category, query: &GeoQuery) -> Option<Payload> {
        self.caches
            .get(&category)?
            .lookup(query.latitude, query.longitude)
    }

    fn cache_store(&self, category: Category, query: &GeoQuery, payload: &Payload) {
        if let Some(cache) = self.caches.get(&category) {
            cache.store(query.latitude, query.longitude, payload.clone());
        }
    }
}

/// Run one adapter with its own deadline and settle into an outcome
///
/// Never propagates: a timeout, transport failure, or mis-typed payload all
/// become failed outcomes for this adapter alone.
async fn invoke_adapter(
    adapter: Arc<dyn ProviderAdapter>,
    query: GeoQuery,
) -> ProviderOutcome {
    let name = adapter.name().to_string();
    let category = adapter.category();
    let started = Instant::now();

    let settled = tokio::time::timeout(adapter.timeout(), adapter.fetch(&query)).await;
    let elapsed = started.elapsed();

    let result = match settled {
        Ok(Ok(payload)) if payload.category() != category => Err(SourceError::InvalidResponse(
            format!(
                "adapter for {} returned a {} payload",
                category,
                payload.category()
            ),
        )),
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    };

    match result {
        Ok(payload) => {
            debug!(
                provider = %name,
                category = %category,
                elapsed_ms = elapsed.as_millis() as u64,
                "Provider fetch succeeded"
            );
            ProviderOutcome {
                category,
                provider: name,
                reliability_weight: adapter.reliability_weight(),
                value: Some(payload),
                error: None,
                elapsed,
            }
        }
        Err(error) => {
            warn!(
                provider = %name,
                category = %category,
                kind = error.kind(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Provider fetch failed, continuing without it"
            );
            ProviderOutcome {
                category,
                provider: name,
                reliability_weight: adapter.reliability_weight(),
                value: None,
                error: Some(error),
                elapsed,
            }
        }
    }
}
