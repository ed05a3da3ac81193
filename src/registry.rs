//! Provider registry
//!
//! Maps each category to the adapters that serve it. Built once at startup
//! and handed to the engine by reference — read-only afterwards, so it is
//! shared across concurrent aggregation runs without locking.

use crate::types::{Category, ProviderAdapter, ProviderDescriptor};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only category → adapters map
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Category, Vec<Arc<dyn ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a flat adapter list
    pub fn from_adapters(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let mut registry = Self::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        registry
    }

    /// Register one adapter under its declared category
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters
            .entry(adapter.category())
            .or_default()
            .push(adapter);
    }

    /// Adapters serving a category (empty slice when none registered)
    pub fn adapters_for(&self, category: Category) -> &[Arc<dyn ProviderAdapter>] {
        self.adapters
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Registered categories in canonical order
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.adapters.contains_key(c))
            .collect()
    }

    /// Static descriptors for every registered adapter
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<ProviderDescriptor> = self
            .adapters
            .values()
            .flatten()
            .map(|a| ProviderDescriptor {
                name: a.name().to_string(),
                category: a.category(),
                timeout_ms: a.timeout().as_millis() as u64,
                reliability_weight: a.reliability_weight(),
            })
            .collect();
        descriptors.sort_by_key(|d| (d.category, d.name.clone()));
        descriptors
    }

    /// Validate a request before any fan-out begins
    ///
    /// Deduplicates while preserving order. A category with no registered
    /// adapter is a configuration error — the one failure mode that reaches
    /// the caller.
    pub fn validate_request(&self, categories: &[Category]) -> Result<Vec<Category>> {
        if categories.is_empty() {
            return Err(EngineError::Configuration(
                "no categories requested".to_string(),
            ));
        }

        let mut requested = Vec::with_capacity(categories.len());
        let mut unknown = Vec::new();
        for &category in categories {
            if requested.contains(&category) {
                continue;
            }
            if self.adapters.contains_key(&category) {
                requested.push(category);
            } else {
                unknown.push(category.as_str());
            }
        }

        if !unknown.is_empty() {
            return Err(EngineError::Configuration(format!(
                "no adapter registered for category: {}",
                unknown.join(", ")
            )));
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoQuery, Payload, SourceError, WeatherNormals};
    use std::time::Duration;

    struct StubAdapter(Category);

    #[async_trait::async_trait]
    impl ProviderAdapter for StubAdapter {
        fn name(&self) -> &str {
            "stub"
        }
        fn category(&self) -> Category {
            self.0
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(100)
        }
        fn reliability_weight(&self) -> f32 {
            0.8
        }
        async fn fetch(&self, _query: &GeoQuery) -> std::result::Result<Payload, SourceError> {
            Ok(Payload::Weather(WeatherNormals {
                avg_high_c: 20.0,
                avg_low_c: 10.0,
                annual_precip_mm: 500.0,
                wet_days_per_year: 80,
            }))
        }
    }

    fn registry_with(categories: &[Category]) -> ProviderRegistry {
        ProviderRegistry::from_adapters(
            categories
                .iter()
                .map(|&c| Arc::new(StubAdapter(c)) as Arc<dyn ProviderAdapter>)
                .collect(),
        )
    }

    #[test]
    fn test_validate_rejects_unregistered() {
        let registry = registry_with(&[Category::Weather, Category::Crime]);

        let err = registry
            .validate_request(&[Category::Weather, Category::Market])
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(err.to_string().contains("market"));
    }

    #[test]
    fn test_validate_dedupes_preserving_order() {
        let registry = registry_with(&[Category::Weather, Category::Crime]);

        let requested = registry
            .validate_request(&[Category::Crime, Category::Weather, Category::Crime])
            .unwrap();
        assert_eq!(requested, vec![Category::Crime, Category::Weather]);
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        let registry = registry_with(&[Category::Weather]);
        assert!(registry.validate_request(&[]).is_err());
    }

    #[test]
    fn test_categories_in_canonical_order() {
        let registry = registry_with(&[Category::Weather, Category::Crime, Category::Transit]);
        assert_eq!(
            registry.categories(),
            vec![Category::Crime, Category::Transit, Category::Weather]
        );
    }

    #[test]
    fn test_multiple_adapters_per_category() {
        let mut registry = registry_with(&[Category::Weather]);
        registry.register(Arc::new(StubAdapter(Category::Weather)));
        assert_eq!(registry.adapters_for(Category::Weather).len(), 2);
        assert_eq!(registry.descriptors().len(), 2);
    }
}
