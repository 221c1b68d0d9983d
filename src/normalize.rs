//! Min-max normalization of heterogeneous scoring criteria.
//!
//! Rating and review bounds are captured once per dataset; the distance
//! bound is query-scoped and supplied by the caller at scoring time.

use crate::store::EntityStore;

/// Normalized value used when a criterion carries no discriminating signal
/// (all observed values identical). Treating the criterion as "best" for
/// every entity makes its weighted contribution a constant offset, leaving
/// the ranking to the remaining criteria.
pub const DEGENERATE_NORMALIZED: f64 = 1.0;

/// Precomputed min/max statistics for the dataset-scoped criteria.
///
/// Derived from an [`EntityStore`] and invalidated with it: rebuilding the
/// store means rebuilding this context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationContext {
    rating_min: f64,
    rating_max: f64,
    reviews_min: f64,
    reviews_max: f64,
}

impl NormalizationContext {
    /// Capture rating and review-count bounds over the full dataset.
    ///
    /// Degenerate bounds (all values equal, including the empty and
    /// single-entity datasets) are logged as a data-quality signal; they
    /// are handled by policy at normalization time, never as an error.
    pub fn from_store(store: &EntityStore) -> Self {
        let mut rating_min = f64::INFINITY;
        let mut rating_max = f64::NEG_INFINITY;
        let mut reviews_min = f64::INFINITY;
        let mut reviews_max = f64::NEG_INFINITY;

        for entity in store.iter() {
            rating_min = rating_min.min(entity.rating);
            rating_max = rating_max.max(entity.rating);
            let reviews = entity.review_count as f64;
            reviews_min = reviews_min.min(reviews);
            reviews_max = reviews_max.max(reviews);
        }

        if store.is_empty() {
            rating_min = 0.0;
            rating_max = 0.0;
            reviews_min = 0.0;
            reviews_max = 0.0;
        }

        if rating_min == rating_max {
            log::warn!(
                "all {} entities share rating {}; rating carries no ranking signal",
                store.len(),
                rating_max
            );
        }
        if reviews_min == reviews_max {
            log::warn!(
                "all {} entities share review count {}; reviews carry no ranking signal",
                store.len(),
                reviews_max
            );
        }

        Self {
            rating_min,
            rating_max,
            reviews_min,
            reviews_max,
        }
    }

    /// Observed rating bounds `(min, max)`.
    pub fn rating_bounds(&self) -> (f64, f64) {
        (self.rating_min, self.rating_max)
    }

    /// Observed review-count bounds `(min, max)`.
    pub fn review_bounds(&self) -> (f64, f64) {
        (self.reviews_min, self.reviews_max)
    }

    /// Rescale a rating into [0, 1] against the dataset bounds.
    pub fn normalize_rating(&self, raw: f64) -> f64 {
        min_max(raw, self.rating_min, self.rating_max)
    }

    /// Rescale a review count into [0, 1] against the dataset bounds.
    pub fn normalize_reviews(&self, raw: u64) -> f64 {
        min_max(raw as f64, self.reviews_min, self.reviews_max)
    }

    /// Rescale a distance into [0, 1] against a query-scoped bound.
    ///
    /// The bound is either the query's explicit cutoff or the farthest
    /// candidate distance observed in that query; it is never a
    /// dataset-wide constant. A zero bound means every candidate sits at
    /// the reference point, so the distance is mapped to 0.0 ("as close as
    /// possible") and the inverted contribution in the scoring formula
    /// becomes maximal for all of them.
    pub fn normalize_distance(raw: f64, max_distance: f64) -> f64 {
        if max_distance <= 0.0 {
            return 0.0;
        }
        (raw / max_distance).clamp(0.0, 1.0)
    }
}

/// `(x - min) / (max - min)`, with the degenerate-range policy applied.
fn min_max(x: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return DEGENERATE_NORMALIZED;
    }
    ((x - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;

    fn store_with_ratings(ratings: &[f64]) -> EntityStore {
        let entities = ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| Entity::new(i as u64 + 1, 37.9, 23.7, r, (i as u64 + 1) * 10))
            .collect();
        EntityStore::new(entities).unwrap()
    }

    #[test]
    fn test_bounds_capture() {
        let store = store_with_ratings(&[3.0, 4.5, 2.5]);
        let norm = NormalizationContext::from_store(&store);

        assert_eq!(norm.rating_bounds(), (2.5, 4.5));
        assert_eq!(norm.review_bounds(), (10.0, 30.0));
    }

    #[test]
    fn test_min_max_endpoints() {
        let store = store_with_ratings(&[2.0, 5.0]);
        let norm = NormalizationContext::from_store(&store);

        assert_eq!(norm.normalize_rating(2.0), 0.0);
        assert_eq!(norm.normalize_rating(5.0), 1.0);
        assert_eq!(norm.normalize_rating(3.5), 0.5);
    }

    #[test]
    fn test_degenerate_rating_uses_fixed_constant() {
        let store = store_with_ratings(&[4.0, 4.0, 4.0]);
        let norm = NormalizationContext::from_store(&store);

        // Explicit policy, not an incidental NaN.
        assert_eq!(norm.normalize_rating(4.0), DEGENERATE_NORMALIZED);
        assert!(!norm.normalize_rating(4.0).is_nan());
    }

    #[test]
    fn test_degenerate_reviews() {
        let entities = vec![
            Entity::new(1, 37.9, 23.7, 3.0, 50),
            Entity::new(2, 37.8, 23.6, 4.0, 50),
        ];
        let store = EntityStore::new(entities).unwrap();
        let norm = NormalizationContext::from_store(&store);

        assert_eq!(norm.normalize_reviews(50), DEGENERATE_NORMALIZED);
    }

    #[test]
    fn test_empty_store_bounds() {
        let store = EntityStore::new(Vec::new()).unwrap();
        let norm = NormalizationContext::from_store(&store);

        assert_eq!(norm.rating_bounds(), (0.0, 0.0));
        assert_eq!(norm.normalize_rating(0.0), DEGENERATE_NORMALIZED);
    }

    #[test]
    fn test_distance_normalization_is_query_scoped() {
        assert_eq!(NormalizationContext::normalize_distance(0.0, 1000.0), 0.0);
        assert_eq!(NormalizationContext::normalize_distance(500.0, 1000.0), 0.5);
        assert_eq!(
            NormalizationContext::normalize_distance(1000.0, 1000.0),
            1.0
        );
    }

    #[test]
    fn test_distance_zero_bound_maps_to_best() {
        // All candidates at the reference point: distance contributes its
        // maximum (1 - 0.0) for every one of them.
        assert_eq!(NormalizationContext::normalize_distance(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_distance_clamped_to_unit_interval() {
        assert_eq!(
            NormalizationContext::normalize_distance(2000.0, 1000.0),
            1.0
        );
    }

    #[test]
    fn test_scale_invariance() {
        let base = store_with_ratings(&[1.0, 2.0, 3.0]);
        let scaled = store_with_ratings(&[10.0, 20.0, 30.0]);

        let norm_base = NormalizationContext::from_store(&base);
        let norm_scaled = NormalizationContext::from_store(&scaled);

        for (raw, scaled_raw) in [(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)] {
            assert!(
                (norm_base.normalize_rating(raw) - norm_scaled.normalize_rating(scaled_raw)).abs()
                    < 1e-12
            );
        }
    }
}
