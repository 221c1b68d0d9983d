//! # georank
//!
//! A spatial top-K ranking engine: geographic entities carrying quality
//! attributes (rating, review count) are ranked against a reference point
//! by a weighted composite of proximity, rating, and review volume.
//!
//! ## Features
//!
//! - **Spatial index**: a height-balanced R-tree, Hilbert bulk-loaded for
//!   a known dataset and supporting incremental insertion
//! - **Weighted scoring**: per-query criterion weights, normalized by their
//!   sum so scores always land in [0, 1]
//! - **Bounded selection**: the top K candidates are kept in O(K) memory
//!   regardless of dataset size
//! - **Deterministic results**: ties break on entity id, and identical
//!   datasets produce identical rankings across rebuilds
//! - **Configurable metrics**: Haversine (default), Geodesic, or planar
//!   Euclidean distance
//!
//! ## Quick start
//!
//! ```rust
//! use georank::{Engine, Entity, Point, Query, Weights};
//!
//! let engine = Engine::new(vec![
//!     Entity::new(1, 37.9838, 23.7275, 4.5, 320).with_name("Plaka Hotel"),
//!     Entity::new(2, 37.9750, 23.7340, 3.8, 95),
//!     Entity::new(3, 37.9920, 23.7300, 4.9, 12),
//! ])?;
//!
//! // Rank by proximity to Syntagma Square, weighting rating double.
//! let query = Query::new(Point::new(23.7275, 37.9838), 2)
//!     .with_weights(Weights::new(1.0, 2.0, 1.0));
//!
//! for entry in engine.top_k(&query)? {
//!     println!("#{} score {:.3} at {:.0}m", entry.id, entry.score, entry.distance);
//! }
//! # Ok::<(), georank::GeoRankError>(())
//! ```
//!
//! ## Dataset lifecycle
//!
//! An engine is an immutable snapshot: store, index, and normalization
//! bounds are all derived from the same entity set at build time, and
//! queries only take `&self`. To rank a changed dataset, build a new
//! engine and swap it in; there is no in-place mutation to keep the three
//! components consistent with each other.

pub mod builder;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod score;
pub mod spatial;
pub mod store;
pub mod topk;
pub mod types;

pub use builder::EngineBuilder;
pub use engine::Engine;
pub use error::{GeoRankError, Result};
pub use index::SpatialIndex;
pub use normalize::NormalizationContext;
pub use spatial::{DistanceMetric, Rect};
pub use store::EntityStore;
pub use topk::TopKSelector;
pub use types::{Config, Entity, EntityId, Query, RankedEntity, Weights};

// Re-exported so downstream code can name coordinates without depending on
// `geo` directly.
pub use geo::Point;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
