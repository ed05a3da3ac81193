//! Profile Merger
//!
//! Final structural step of an aggregation run: every requested category
//! must have a field, any gap is closed with a last-resort fallback field,
//! and the whole profile gets one uniform `last_updated` stamp. No I/O; the
//! result is immutable once returned.

use crate::engine::fallback::FallbackGenerator;
use crate::engine::scorer::Score;
use crate::types::{
    AggregatedField, Category, DataQuality, GeoQuery, UnifiedProfile, FALLBACK_SOURCE,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Combine per-category fields into one unified profile
///
/// Field insertion order does not matter: the map is ordered by category, so
/// the merge is commutative over its inputs.
pub fn merge_profile(
    run_id: Uuid,
    query: &GeoQuery,
    mut fields: BTreeMap<Category, AggregatedField>,
    requested: &[Category],
    overall: Score,
    fallback: &FallbackGenerator,
    fallback_confidence: u8,
) -> UnifiedProfile {
    let last_updated = Utc::now();

    // Safety net: a requested category with no field at all still gets a
    // poor-quality synthetic entry. The coordinator normally fills these
    // before merging; this guarantees the invariant regardless.
    for &category in requested {
        fields.entry(category).or_insert_with(|| AggregatedField {
            value: fallback.generate(category, query),
            sources: vec![FALLBACK_SOURCE.to_string()],
            confidence: fallback_confidence,
            data_quality: DataQuality::Poor,
            completeness: 0,
            last_updated,
        });
    }

    // One timestamp for the whole profile
    for field in fields.values_mut() {
        field.last_updated = last_updated;
    }

    UnifiedProfile {
        run_id,
        query: query.clone(),
        fields,
        confidence: overall.confidence,
        data_quality: overall.quality,
        completeness: overall.completeness,
        last_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrimeStats, Payload};

    fn crime_field(confidence: u8) -> AggregatedField {
        field_with(
            Payload::Crime(CrimeStats {
                incidents_per_1k: 12.0,
                violent_share: None,
                safety_score: 85,
            }),
            confidence,
        )
    }

    fn schools_field(confidence: u8) -> AggregatedField {
        field_with(
            Payload::Schools(crate::types::SchoolSummary {
                nearby_count: 5,
                avg_rating: 7.0,
                students_per_teacher: None,
            }),
            confidence,
        )
    }

    fn field_with(value: Payload, confidence: u8) -> AggregatedField {
        AggregatedField {
            value,
            sources: vec!["city-data".to_string()],
            confidence,
            data_quality: DataQuality::Poor,
            completeness: 100,
            last_updated: Utc::now(),
        }
    }

    fn overall() -> Score {
        Score {
            confidence: 70,
            quality: DataQuality::Fair,
            completeness: 50,
        }
    }

    #[test]
    fn test_gap_filled_with_poor_fallback() {
        let query = GeoQuery::new(-33.9, 18.4);
        let mut fields = BTreeMap::new();
        fields.insert(Category::Crime, crime_field(90));

        let profile = merge_profile(
            Uuid::new_v4(),
            &query,
            fields,
            &[Category::Crime, Category::Weather],
            overall(),
            &FallbackGenerator::new(),
            40,
        );

        let weather = profile.field(Category::Weather).expect("gap must be filled");
        assert_eq!(weather.sources, vec![FALLBACK_SOURCE.to_string()]);
        assert_eq!(weather.confidence, 40);
        assert_eq!(weather.data_quality, DataQuality::Poor);
        assert_eq!(weather.completeness, 0);
        assert_eq!(weather.value.category(), Category::Weather);
    }

    #[test]
    fn test_existing_fields_not_overwritten() {
        let query = GeoQuery::new(-33.9, 18.4);
        let mut fields = BTreeMap::new();
        fields.insert(Category::Crime, crime_field(90));

        let profile = merge_profile(
            Uuid::new_v4(),
            &query,
            fields,
            &[Category::Crime],
            overall(),
            &FallbackGenerator::new(),
            40,
        );

        let crime = profile.field(Category::Crime).unwrap();
        assert_eq!(crime.confidence, 90);
        assert_eq!(crime.sources, vec!["city-data".to_string()]);
    }

    #[test]
    fn test_single_timestamp_for_profile() {
        let query = GeoQuery::new(-33.9, 18.4);
        let mut fields = BTreeMap::new();
        fields.insert(Category::Crime, crime_field(90));

        let profile = merge_profile(
            Uuid::new_v4(),
            &query,
            fields,
            &[Category::Crime, Category::Schools],
            overall(),
            &FallbackGenerator::new(),
            40,
        );

        for field in profile.fields.values() {
            assert_eq!(field.last_updated, profile.last_updated);
        }
    }

    #[test]
    fn test_merge_is_order_independent() {
        let query = GeoQuery::new(-33.9, 18.4);
        let requested = [Category::Crime, Category::Schools, Category::Weather];

        let mut forward = BTreeMap::new();
        forward.insert(Category::Crime, crime_field(90));
        forward.insert(Category::Schools, schools_field(60));

        let mut reverse = BTreeMap::new();
        reverse.insert(Category::Schools, schools_field(60));
        reverse.insert(Category::Crime, crime_field(90));

        let a = merge_profile(
            Uuid::new_v4(),
            &query,
            forward,
            &requested,
            overall(),
            &FallbackGenerator::new(),
            40,
        );
        let b = merge_profile(
            Uuid::new_v4(),
            &query,
            reverse,
            &requested,
            overall(),
            &FallbackGenerator::new(),
            40,
        );

        let keys_a: Vec<Category> = a.fields.keys().copied().collect();
        let keys_b: Vec<Category> = b.fields.keys().copied().collect();
        assert_eq!(keys_a, keys_b);
        assert_eq!(
            a.field(Category::Crime).unwrap().confidence,
            b.field(Category::Crime).unwrap().confidence
        );
    }
}
