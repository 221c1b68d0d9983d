//! Immutable, indexed entity storage.
//!
//! The store is the input boundary of the engine: records are validated on
//! the way in, and everything downstream (index, normalization, scoring)
//! may assume finite, in-range attributes.

use crate::error::{GeoRankError, Result};
use crate::spatial::validate_point;
use crate::types::{Entity, EntityId};
use rustc_hash::FxHashMap;

/// An immutable collection of validated entities with O(1) id lookup.
///
/// Built once per dataset version; a new dataset means a new store (and a
/// new engine), never in-place mutation.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    by_id: FxHashMap<EntityId, usize>,
}

impl EntityStore {
    /// Build a store from a finite sequence of entity records.
    ///
    /// An empty input is valid and yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the entity and field for out-of-range
    /// or non-finite coordinates, negative or non-finite ratings, and
    /// duplicate ids.
    pub fn new(entities: Vec<Entity>) -> Result<Self> {
        let mut by_id = FxHashMap::default();
        by_id.reserve(entities.len());

        for (slot, entity) in entities.iter().enumerate() {
            validate_entity(entity)?;
            if by_id.insert(entity.id, slot).is_some() {
                return Err(GeoRankError::InvalidInput(format!(
                    "duplicate entity id: {}",
                    entity.id
                )));
            }
        }

        log::debug!("entity store built with {} records", entities.len());

        Ok(Self { entities, by_id })
    }

    /// Look up an entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id).map(|&slot| &self.entities[slot])
    }

    /// Iterate all entities in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<'a> IntoIterator for &'a EntityStore {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate_entity(entity: &Entity) -> Result<()> {
    validate_point(&entity.position())
        .map_err(|e| GeoRankError::InvalidInput(format!("entity {}: {}", entity.id, e)))?;

    if !entity.rating.is_finite() {
        return Err(GeoRankError::InvalidInput(format!(
            "entity {}: rating must be finite, got: {}",
            entity.id, entity.rating
        )));
    }

    if entity.rating < 0.0 {
        return Err(GeoRankError::InvalidInput(format!(
            "entity {}: rating must be non-negative, got: {}",
            entity.id, entity.rating
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entities() -> Vec<Entity> {
        vec![
            Entity::new(1, 37.9838, 23.7275, 4.5, 320).with_name("Plaka Hotel"),
            Entity::new(2, 37.9750, 23.7340, 3.8, 95),
            Entity::new(3, 37.9920, 23.7300, 4.9, 12),
        ]
    }

    #[test]
    fn test_store_lookup_and_iteration() {
        let store = EntityStore::new(sample_entities()).unwrap();

        assert_eq!(store.len(), 3);
        assert!(!store.is_empty());
        assert_eq!(store.get(EntityId(2)).unwrap().review_count, 95);
        assert!(store.get(EntityId(42)).is_none());

        let ids: Vec<_> = store.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_store_is_valid() {
        let store = EntityStore::new(Vec::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.iter().count(), 0);
    }

    #[test]
    fn test_store_rejects_bad_coordinates() {
        let err = EntityStore::new(vec![Entity::new(1, 95.0, 23.7, 4.0, 10)]).unwrap_err();
        assert!(err.to_string().contains("latitude"));

        let err = EntityStore::new(vec![Entity::new(1, 37.9, 181.0, 4.0, 10)]).unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_store_rejects_bad_rating() {
        assert!(EntityStore::new(vec![Entity::new(1, 37.9, 23.7, -1.0, 10)]).is_err());
        assert!(EntityStore::new(vec![Entity::new(1, 37.9, 23.7, f64::NAN, 10)]).is_err());
    }

    #[test]
    fn test_store_rejects_duplicate_ids() {
        let entities = vec![
            Entity::new(1, 37.9, 23.7, 4.0, 10),
            Entity::new(1, 37.8, 23.6, 3.0, 20),
        ];
        let err = EntityStore::new(entities).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
