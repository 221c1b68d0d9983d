//! Composite scoring of candidates against a weighted criteria vector.
//!
//! Scoring is a pure function of its inputs: the normalization context is
//! passed in as a value rather than read from ambient state, which keeps it
//! trivially testable and safe to evaluate from multiple threads.

use crate::normalize::NormalizationContext;
use crate::types::Weights;

/// Compute the composite score for one candidate.
///
/// `score = w_d * (1 - norm_distance) + w_r * norm_rating + w_n * norm_reviews`
///
/// The distance term is inverted so that closer candidates score higher;
/// rating and review count contribute directly. Weights are normalized by
/// their sum, so the result lies in [0, 1].
///
/// `max_distance` is the query-scoped normalization bound (see
/// [`NormalizationContext::normalize_distance`]).
pub fn score(
    distance: f64,
    rating: f64,
    review_count: u64,
    weights: &Weights,
    max_distance: f64,
    norm: &NormalizationContext,
) -> f64 {
    let (w_distance, w_rating, w_reviews) = weights.normalized();

    let norm_distance = NormalizationContext::normalize_distance(distance, max_distance);
    let norm_rating = norm.normalize_rating(rating);
    let norm_reviews = norm.normalize_reviews(review_count);

    w_distance * (1.0 - norm_distance) + w_rating * norm_rating + w_reviews * norm_reviews
}
