//! Fluent construction of a ranking engine.

use crate::engine::Engine;
use crate::error::Result;
use crate::spatial::DistanceMetric;
use crate::types::{Config, Entity};

/// Builder for [`Engine`] instances.
///
/// # Examples
///
/// ```rust
/// use georank::{EngineBuilder, Entity, spatial::DistanceMetric};
///
/// let engine = EngineBuilder::new()
///     .distance_metric(DistanceMetric::Geodesic)
///     .node_entries(4, 32)
///     .entity(Entity::new(1, 37.9838, 23.7275, 4.5, 320))
///     .entity(Entity::new(2, 37.9750, 23.7340, 3.8, 95))
///     .build()?;
/// assert_eq!(engine.len(), 2);
/// # Ok::<(), georank::GeoRankError>(())
/// ```
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Config,
    entities: Vec<Entity>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the node fill bounds of the spatial index.
    pub fn node_entries(mut self, min: usize, max: usize) -> Self {
        self.config = self.config.with_node_entries(min, max);
        self
    }

    /// Set the distance metric for scoring and radius filtering.
    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.config = self.config.with_distance_metric(metric);
        self
    }

    /// Add a single entity to the dataset.
    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a batch of entities to the dataset.
    pub fn entities(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.entities.extend(entities);
        self
    }

    /// Validate the dataset and configuration and build the engine.
    pub fn build(self) -> Result<Engine> {
        Engine::with_config(self.entities, self.config)
    }
}
