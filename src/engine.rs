//! The ranking engine: an immutable dataset snapshot plus query execution.
//!
//! An [`Engine`] binds together the validated store, the spatial index, and
//! the dataset-scoped normalization bounds, all built once from the same
//! entity set. Queries never mutate the engine; loading a new dataset means
//! building a new engine and swapping it in.

use crate::error::{GeoRankError, Result};
use crate::index::SpatialIndex;
use crate::normalize::NormalizationContext;
use crate::score::score;
use crate::spatial::{DistanceMetric, Rect, distance_between, radius_envelope};
use crate::store::EntityStore;
use crate::topk::{ScoredCandidate, TopKSelector};
use crate::types::{Config, Entity, EntityId, Query, RankedEntity};

/// Spatial top-K ranking engine.
///
/// # Examples
///
/// ```rust
/// use georank::{Engine, Entity, Point, Query};
///
/// let engine = Engine::new(vec![
///     Entity::new(1, 37.9838, 23.7275, 4.5, 320),
///     Entity::new(2, 37.9750, 23.7340, 3.8, 95),
///     Entity::new(3, 37.9920, 23.7300, 4.9, 12),
/// ])?;
///
/// let results = engine.top_k(&Query::new(Point::new(23.7275, 37.9838), 2))?;
/// assert_eq!(results.len(), 2);
/// assert!(results[0].score >= results[1].score);
/// # Ok::<(), georank::GeoRankError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    store: EntityStore,
    index: SpatialIndex,
    norm: NormalizationContext,
    config: Config,
}

impl Engine {
    /// Build an engine over `entities` with the default configuration.
    pub fn new(entities: Vec<Entity>) -> Result<Self> {
        Self::with_config(entities, Config::default())
    }

    /// Build an engine over `entities` with an explicit configuration.
    ///
    /// Validates every record, bulk-loads the spatial index, verifies its
    /// structural invariants, and captures the normalization bounds. An
    /// empty entity list builds a valid engine that answers every query
    /// with an empty result.
    pub fn with_config(entities: Vec<Entity>, config: Config) -> Result<Self> {
        let store = EntityStore::new(entities)?;
        let index = SpatialIndex::bulk_load(&store, &config)?;
        index.check_invariants()?;
        let norm = NormalizationContext::from_store(&store);

        log::info!(
            "engine ready: {} entities, index height {}",
            store.len(),
            index.height()
        );

        Ok(Self {
            store,
            index,
            norm,
            config,
        })
    }

    /// Number of entities in the dataset.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn normalization(&self) -> &NormalizationContext {
        &self.norm
    }

    /// Rank the dataset against `query` and return the top K entries.
    ///
    /// Candidates are gathered through the spatial index when the query
    /// carries a distance cutoff (envelope prune, then exact distance
    /// filter) and by full scan otherwise. Each candidate is scored against
    /// the query weights and streamed through a bounded selector, so memory
    /// stays O(K) regardless of how many candidates qualify.
    ///
    /// Results come back in descending score order; equal scores are
    /// ordered by ascending id. Fewer than K entries are returned when
    /// fewer than K candidates qualify.
    pub fn top_k(&self, query: &Query) -> Result<Vec<RankedEntity>> {
        query.validate()?;

        let candidates = match query.max_distance {
            Some(radius) => self.candidates_within(query, radius)?,
            None => self.candidates_all(query)?,
        };

        // Query-scoped distance bound: the explicit cutoff when given,
        // otherwise the farthest candidate seen by this query.
        let max_distance = query
            .max_distance
            .unwrap_or_else(|| candidates.iter().fold(0.0f64, |acc, &(_, d)| acc.max(d)));

        let mut selector = TopKSelector::new(query.k);
        for &(entity, distance) in &candidates {
            let s = score(
                distance,
                entity.rating,
                entity.review_count,
                &query.weights,
                max_distance,
                &self.norm,
            );
            selector.offer(ScoredCandidate::new(entity.id, s, distance));
        }

        log::debug!(
            "query scored {} candidates, returning {}",
            candidates.len(),
            selector.len()
        );

        selector
            .drain_sorted()
            .into_iter()
            .map(|candidate| self.resolve(candidate))
            .collect()
    }

    /// Gather candidates within `radius` of the reference point, pruning
    /// through the index and then filtering by exact distance.
    fn candidates_within(&self, query: &Query, radius: f64) -> Result<Vec<(&Entity, f64)>> {
        let envelope = match self.config.distance_metric {
            // Euclidean distances are in degrees, so the envelope is too.
            DistanceMetric::Euclidean => Rect {
                min_lon: query.reference.x() - radius,
                min_lat: query.reference.y() - radius,
                max_lon: query.reference.x() + radius,
                max_lat: query.reference.y() + radius,
            },
            _ => radius_envelope(&query.reference, radius),
        };

        let mut candidates = Vec::new();
        for id in self.index.query_within(&envelope) {
            let entity = self.lookup(id)?;
            let distance = self.distance_to(query, entity);
            if distance <= radius {
                candidates.push((entity, distance));
            }
        }
        Ok(candidates)
    }

    /// Gather every entity as a candidate via the index's full-scan
    /// iterator (the fallback when no distance cutoff bounds the search).
    fn candidates_all(&self, query: &Query) -> Result<Vec<(&Entity, f64)>> {
        let mut candidates = Vec::with_capacity(self.index.len());
        for id in self.index.iter() {
            let entity = self.lookup(id)?;
            candidates.push((entity, self.distance_to(query, entity)));
        }
        Ok(candidates)
    }

    fn distance_to(&self, query: &Query, entity: &Entity) -> f64 {
        distance_between(
            &query.reference,
            &entity.position(),
            self.config.distance_metric,
        )
    }

    fn lookup(&self, id: EntityId) -> Result<&Entity> {
        self.store.get(id).ok_or_else(|| {
            GeoRankError::StructuralInvariant(format!(
                "index references unknown entity id {}",
                id
            ))
        })
    }

    fn resolve(&self, candidate: ScoredCandidate) -> Result<RankedEntity> {
        let entity = self.lookup(candidate.id)?;
        Ok(RankedEntity {
            id: entity.id,
            lat: entity.lat,
            lon: entity.lon,
            rating: entity.rating,
            review_count: entity.review_count,
            name: entity.name.clone(),
            website: entity.website.clone(),
            distance: candidate.distance,
            score: candidate.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Weights;
    use geo::Point;

    fn athens_reference() -> Point {
        Point::new(23.7275, 37.9838)
    }

    fn sample_engine() -> Engine {
        Engine::new(vec![
            // ~"close, mediocre": right at the reference.
            Entity::new(1, 37.9838, 23.7275, 3.0, 50).with_name("Central Budget"),
            // ~1.2km away, excellent rating, well reviewed.
            Entity::new(2, 37.9930, 23.7320, 4.8, 900).with_name("Hilltop Grand"),
            // ~5km away, good rating, few reviews.
            Entity::new(3, 38.0200, 23.7600, 4.2, 30),
        ])
        .unwrap()
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let engine = sample_engine();
        let results = engine.top_k(&Query::new(athens_reference(), 3)).unwrap();

        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_full_scan_considers_every_entity() {
        let entities: Vec<_> = (1..=40)
            .map(|i| {
                Entity::new(
                    i,
                    37.9 + i as f64 * 0.001,
                    23.7,
                    3.0 + (i % 5) as f64 * 0.3,
                    i * 7,
                )
            })
            .collect();
        let engine = Engine::new(entities).unwrap();

        let results = engine.top_k(&Query::new(athens_reference(), 40)).unwrap();
        let mut ids: Vec<_> = results.iter().map(|r| r.id.0).collect();
        ids.sort();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_larger_than_dataset() {
        let engine = sample_engine();
        let results = engine.top_k(&Query::new(athens_reference(), 50)).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_k_zero_is_rejected() {
        let engine = sample_engine();
        let err = engine.top_k(&Query::new(athens_reference(), 0)).unwrap_err();
        assert!(matches!(err, GeoRankError::InvalidQuery(_)));
    }

    #[test]
    fn test_empty_dataset_returns_empty() {
        let engine = Engine::new(Vec::new()).unwrap();
        let results = engine.top_k(&Query::new(athens_reference(), 5)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_distance_weight_dominates_when_others_zero() {
        let engine = sample_engine();
        let query = Query::new(athens_reference(), 3).with_weights(Weights::new(1.0, 0.0, 0.0));

        let results = engine.top_k(&query).unwrap();
        // Pure proximity ranking: 1 (at reference), 2 (~1.2km), 3 (~5km).
        let ids: Vec<_> = results.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rating_weight_dominates_when_others_zero() {
        let engine = sample_engine();
        let query = Query::new(athens_reference(), 3).with_weights(Weights::new(0.0, 1.0, 0.0));

        let results = engine.top_k(&query).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_max_distance_excludes_far_entities() {
        let engine = sample_engine();
        let query = Query::new(athens_reference(), 10).with_max_distance(2_000.0);

        let results = engine.top_k(&query).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.0).collect();
        assert!(ids.contains(&1) && ids.contains(&2));
        assert!(!ids.contains(&3));
    }

    #[test]
    fn test_result_carries_raw_attributes() {
        let engine = sample_engine();
        let results = engine.top_k(&Query::new(athens_reference(), 3)).unwrap();

        let hilltop = results.iter().find(|r| r.id.0 == 2).unwrap();
        assert_eq!(hilltop.rating, 4.8);
        assert_eq!(hilltop.review_count, 900);
        assert_eq!(hilltop.name.as_deref(), Some("Hilltop Grand"));
        assert!(hilltop.distance > 800.0 && hilltop.distance < 2_000.0);
        assert!(hilltop.score >= 0.0 && hilltop.score <= 1.0);
    }

    #[test]
    fn test_all_entities_identical_attributes_rank_by_id() {
        let entities: Vec<_> = (1..=5)
            .map(|i| Entity::new(i, 37.9838, 23.7275, 4.0, 100))
            .collect();
        let engine = Engine::new(entities).unwrap();

        let results = engine.top_k(&Query::new(athens_reference(), 5)).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rebuild_determinism() {
        let entities = vec![
            Entity::new(1, 37.9838, 23.7275, 3.0, 50),
            Entity::new(2, 37.9930, 23.7320, 4.8, 900),
            Entity::new(3, 38.0200, 23.7600, 4.2, 30),
        ];
        let mut shuffled = entities.clone();
        shuffled.reverse();

        let a = Engine::new(entities).unwrap();
        let b = Engine::new(shuffled).unwrap();

        let query = Query::new(athens_reference(), 3);
        assert_eq!(a.top_k(&query).unwrap(), b.top_k(&query).unwrap());
    }
}
