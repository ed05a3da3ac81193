//! Confidence Scorer
//!
//! Turns a set of settled provider outcomes into a numeric confidence
//! (0-100), a discrete data-quality tier, and a completeness percentage.
//!
//! # Scoring policy
//! One coherent blend, applied at both the per-category and whole-run level:
//!
//! `confidence = clamp(completeness * completeness_weight
//!                     + avg_reliability * 100 * reliability_weight
//!                     - fallback_count * fallback_penalty, 0, 100)`
//!
//! Completeness is the floor of `successful / requested * 100`. The blend is
//! monotone in successful-source count (holding reliability constant) and in
//! average reliability, for any non-negative coefficient choice.

use crate::config::ScoringConfig;
use crate::types::{Category, DataQuality, ProviderOutcome};
use std::collections::BTreeSet;

/// Scoring result triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// 0-100
    pub confidence: u8,
    pub quality: DataQuality,
    /// 0-100, floor of the success ratio
    pub completeness: u8,
}

/// Confidence Scorer
///
/// Coefficients are configuration; the classification thresholds below are
/// policy constants whose ordering (`excellent > good > fair > poor`) is
/// structural.
pub struct ConfidenceScorer {
    completeness_weight: f32,
    reliability_weight: f32,
    fallback_penalty: f32,
}

impl ConfidenceScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            completeness_weight: config.completeness_weight.max(0.0),
            reliability_weight: config.reliability_weight.max(0.0),
            fallback_penalty: config.fallback_penalty.max(0.0),
        }
    }

    /// Score the outcomes of one category's adapters
    ///
    /// Every outcome passed here was actually attempted; a category that
    /// produced no success at all never reaches the scorer (it gets the
    /// fixed fallback confidence instead).
    pub fn score_category(&self, outcomes: &[ProviderOutcome]) -> Score {
        let requested = outcomes.len();
        let successes: Vec<&ProviderOutcome> =
            outcomes.iter().filter(|o| o.succeeded()).collect();

        let completeness = floor_pct(successes.len(), requested);
        let avg_reliability = average_reliability(successes.iter().copied());
        let confidence = self.blend(completeness, avg_reliability, 0);
        let quality = classify_quality(successes.len(), confidence);

        Score {
            confidence,
            quality,
            completeness,
        }
    }

    /// Score a whole aggregation run
    ///
    /// `requested_categories` is how many categories the caller asked for;
    /// a category counts as satisfied when any real source (adapter or
    /// cache) succeeded for it. Every shortfall becomes one fallback and
    /// costs one fixed penalty.
    pub fn score_run<'a, I>(&self, outcomes: I, requested_categories: usize) -> Score
    where
        I: IntoIterator<Item = &'a ProviderOutcome>,
    {
        let mut satisfied: BTreeSet<Category> = BTreeSet::new();
        let mut reliability_sum = 0.0f32;
        let mut success_count = 0usize;

        for outcome in outcomes {
            if outcome.succeeded() {
                satisfied.insert(outcome.category);
                reliability_sum += outcome.reliability_weight;
                success_count += 1;
            }
        }

        let completeness = floor_pct(satisfied.len(), requested_categories);
        let fallback_count = requested_categories.saturating_sub(satisfied.len());
        let avg_reliability = if success_count > 0 {
            reliability_sum / success_count as f32
        } else {
            0.0
        };

        let confidence = self.blend(completeness, avg_reliability, fallback_count);
        let quality = classify_quality(success_count, confidence);

        Score {
            confidence,
            quality,
            completeness,
        }
    }

    fn blend(&self, completeness: u8, avg_reliability: f32, fallback_count: usize) -> u8 {
        let raw = f32::from(completeness) * self.completeness_weight
            + avg_reliability.clamp(0.0, 1.0) * 100.0 * self.reliability_weight
            - fallback_count as f32 * self.fallback_penalty;
        raw.round().clamp(0.0, 100.0) as u8
    }
}

/// Four-tier quality classification over (source count, confidence)
pub fn classify_quality(source_count: usize, confidence: u8) -> DataQuality {
    if source_count >= 4 && confidence > 85 {
        DataQuality::Excellent
    } else if source_count >= 3 && confidence > 70 {
        DataQuality::Good
    } else if source_count >= 2 && confidence > 50 {
        DataQuality::Fair
    } else {
        DataQuality::Poor
    }
}

fn floor_pct(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part * 100) / whole).min(100) as u8
}

fn average_reliability<'a, I>(successes: I) -> f32
where
    I: IntoIterator<Item = &'a ProviderOutcome>,
{
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for outcome in successes {
        sum += outcome.reliability_weight;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrimeStats, Payload};
    use std::time::Duration;

    fn outcome(category: Category, succeeded: bool, reliability: f32) -> ProviderOutcome {
        ProviderOutcome {
            category,
            provider: "test".to_string(),
            reliability_weight: reliability,
            value: succeeded.then(|| {
                Payload::Crime(CrimeStats {
                    incidents_per_1k: 10.0,
                    violent_share: None,
                    safety_score: 80,
                })
            }),
            error: None,
            elapsed: Duration::from_millis(10),
        }
    }

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(&ScoringConfig::default())
    }

    #[test]
    fn test_completeness_is_floored() {
        let outcomes = vec![
            outcome(Category::Crime, true, 0.9),
            outcome(Category::Schools, false, 0.9),
            outcome(Category::Weather, true, 0.9),
        ];
        let score = scorer().score_run(&outcomes, 3);
        // 2/3 floored, not rounded
        assert_eq!(score.completeness, 66);
    }

    #[test]
    fn test_completeness_bounds() {
        let all_fail = vec![
            outcome(Category::Crime, false, 0.9),
            outcome(Category::Schools, false, 0.9),
        ];
        assert_eq!(scorer().score_run(&all_fail, 2).completeness, 0);

        let all_pass = vec![
            outcome(Category::Crime, true, 0.9),
            outcome(Category::Schools, true, 0.9),
        ];
        assert_eq!(scorer().score_run(&all_pass, 2).completeness, 100);
    }

    #[test]
    fn test_confidence_monotone_in_success_count() {
        let s = scorer();
        let categories = [
            Category::Crime,
            Category::Schools,
            Category::Demographics,
            Category::Transit,
            Category::Weather,
        ];

        let mut previous = 0u8;
        for successes in 0..=categories.len() {
            let outcomes: Vec<ProviderOutcome> = categories
                .iter()
                .enumerate()
                .map(|(i, &c)| outcome(c, i < successes, 0.8))
                .collect();
            let score = s.score_run(&outcomes, categories.len());
            assert!(
                score.confidence >= previous,
                "confidence dropped from {} to {} at {} successes",
                previous,
                score.confidence,
                successes
            );
            previous = score.confidence;
        }
    }

    #[test]
    fn test_confidence_monotone_in_reliability() {
        let s = scorer();
        let low = vec![
            outcome(Category::Crime, true, 0.5),
            outcome(Category::Weather, true, 0.5),
        ];
        let high = vec![
            outcome(Category::Crime, true, 0.95),
            outcome(Category::Weather, true, 0.95),
        ];
        assert!(
            s.score_run(&high, 2).confidence >= s.score_run(&low, 2).confidence
        );
    }

    #[test]
    fn test_fallback_penalty_lowers_confidence() {
        let s = scorer();
        let partial = vec![
            outcome(Category::Crime, true, 0.9),
            outcome(Category::Weather, false, 0.9),
        ];
        let full = vec![
            outcome(Category::Crime, true, 0.9),
            outcome(Category::Weather, true, 0.9),
        ];
        let partial_score = s.score_run(&partial, 2);
        let full_score = s.score_run(&full, 2);
        assert!(partial_score.confidence < full_score.confidence);
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(classify_quality(4, 90), DataQuality::Excellent);
        assert_eq!(classify_quality(4, 85), DataQuality::Good, "86 is the excellent floor");
        assert_eq!(classify_quality(3, 80), DataQuality::Good);
        assert_eq!(classify_quality(2, 60), DataQuality::Fair);
        assert_eq!(classify_quality(2, 50), DataQuality::Poor);
        assert_eq!(classify_quality(1, 99), DataQuality::Poor);
        assert_eq!(classify_quality(0, 0), DataQuality::Poor);
    }

    #[test]
    fn test_zero_requested_scores_zero() {
        let outcomes: Vec<ProviderOutcome> = Vec::new();
        let score = scorer().score_run(&outcomes, 0);
        assert_eq!(score.completeness, 0);
        assert_eq!(score.confidence, 0);
        assert_eq!(score.quality, DataQuality::Poor);
    }

    #[test]
    fn test_category_score_single_success() {
        let outcomes = vec![outcome(Category::Crime, true, 0.9)];
        let score = scorer().score_category(&outcomes);
        assert_eq!(score.completeness, 100);
        // One source is never better than poor, regardless of confidence
        assert_eq!(score.quality, DataQuality::Poor);
        assert!(score.confidence > 90);
    }

    #[test]
    fn test_category_score_corroboration_improves_quality() {
        let outcomes = vec![
            outcome(Category::Crime, true, 0.9),
            outcome(Category::Crime, true, 0.85),
        ];
        let score = scorer().score_category(&outcomes);
        assert_eq!(score.quality, DataQuality::Fair);
    }
}
