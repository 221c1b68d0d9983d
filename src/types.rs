//! Core types and configuration for georank.
//!
//! Entity records, query parameters, ranked results, and the serializable
//! engine configuration live here.

use crate::error::{GeoRankError, Result};
use crate::spatial::DistanceMetric;
use geo::Point;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque entity identifier.
///
/// Ordered so that score ties can be broken deterministically (lower id
/// wins) and results stay reproducible across rebuilds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// An immutable spatial entity record.
///
/// Created once at load time and owned by the [`EntityStore`] for the
/// lifetime of the engine. `name` and `website` are carried opaquely for
/// downstream renderers and never participate in scoring.
///
/// [`EntityStore`]: crate::store::EntityStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
    /// Longitude in degrees, [-180, 180]
    pub lon: f64,
    /// Aggregate rating, >= 0
    pub rating: f64,
    /// Number of reviews backing the rating
    pub review_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Entity {
    /// Create an entity with the required scored attributes.
    pub fn new(id: u64, lat: f64, lon: f64, rating: f64, review_count: u64) -> Self {
        Self {
            id: EntityId(id),
            lat,
            lon,
            rating,
            review_count,
            name: None,
            website: None,
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a website URL.
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Coordinates as a `geo::Point` (x = lon, y = lat).
    pub fn position(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// Per-criterion weights for the scoring formula.
///
/// Weights must be finite and non-negative, and at least one must be
/// positive. They are normalized internally by their sum, so
/// `Weights::new(2.0, 1.0, 1.0)` and `Weights::new(0.5, 0.25, 0.25)`
/// produce identical rankings and scores always land in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Weight for proximity to the reference point
    pub distance: f64,
    /// Weight for the entity rating
    pub rating: f64,
    /// Weight for the review count
    pub reviews: f64,
}

impl Weights {
    pub fn new(distance: f64, rating: f64, reviews: f64) -> Self {
        Self {
            distance,
            rating,
            reviews,
        }
    }

    /// Validate the weight vector.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weight_distance", self.distance),
            ("weight_rating", self.rating),
            ("weight_reviews", self.reviews),
        ] {
            if !value.is_finite() {
                return Err(GeoRankError::InvalidQuery(format!(
                    "{} must be finite, got: {}",
                    name, value
                )));
            }
            if value < 0.0 {
                return Err(GeoRankError::InvalidQuery(format!(
                    "{} must be non-negative, got: {}",
                    name, value
                )));
            }
        }

        if self.distance + self.rating + self.reviews <= 0.0 {
            return Err(GeoRankError::InvalidQuery(
                "at least one weight must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Weights divided by their sum. Assumes `validate` has passed.
    pub(crate) fn normalized(&self) -> (f64, f64, f64) {
        let sum = self.distance + self.rating + self.reviews;
        (self.distance / sum, self.rating / sum, self.reviews / sum)
    }
}

impl Default for Weights {
    /// Equal emphasis on all three criteria.
    fn default() -> Self {
        Self {
            distance: 1.0,
            rating: 1.0,
            reviews: 1.0,
        }
    }
}

/// A top-K ranking query.
///
/// # Examples
///
/// ```rust
/// use georank::{Point, Query, Weights};
///
/// let query = Query::new(Point::new(23.7275, 37.9838), 5)
///     .with_weights(Weights::new(2.0, 1.0, 1.0))
///     .with_max_distance(1_000.0);
/// assert!(query.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Reference point the ranking is relative to (x = lon, y = lat)
    pub reference: Point,
    /// Number of results requested, >= 1
    pub k: usize,
    /// Criterion weights
    pub weights: Weights,
    /// Optional candidate cutoff in meters. When set, only entities within
    /// this distance are considered and it becomes the distance
    /// normalization bound; when unset, every entity is a candidate and the
    /// bound is the farthest candidate distance observed in this query.
    pub max_distance: Option<f64>,
}

impl Query {
    /// Create a query with default (equal) weights and no distance cutoff.
    pub fn new(reference: Point, k: usize) -> Self {
        Self {
            reference,
            k,
            weights: Weights::default(),
            max_distance: None,
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Restrict candidates to a radius around the reference point (meters).
    pub fn with_max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    /// Validate every query parameter, naming the first violation found.
    ///
    /// Nothing is clamped: a `k` of zero, a negative weight, or an
    /// out-of-range reference point is an error, not a correction.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(GeoRankError::InvalidQuery(
                "k must be at least 1, got 0".to_string(),
            ));
        }

        self.weights.validate()?;

        crate::spatial::validate_point(&self.reference)
            .map_err(|e| GeoRankError::InvalidQuery(format!("reference point: {}", e)))?;

        if let Some(max_distance) = self.max_distance {
            if !max_distance.is_finite() || max_distance <= 0.0 {
                return Err(GeoRankError::InvalidQuery(format!(
                    "max_distance must be positive and finite, got: {}",
                    max_distance
                )));
            }
        }

        Ok(())
    }
}

/// A fully resolved ranking result entry.
///
/// Carries the raw (unnormalized) attributes alongside the computed score
/// so a downstream renderer can display markers without recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    pub id: EntityId,
    pub lat: f64,
    pub lon: f64,
    pub rating: f64,
    pub review_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Distance from the query reference point, in the units of the
    /// configured metric: meters for `Haversine`/`Geodesic`, degrees for
    /// `Euclidean`
    pub distance: f64,
    /// Composite score in [0, 1], higher is better
    pub score: f64,
}

/// Engine configuration.
///
/// Designed to be easily serializable and loadable from JSON or TOML while
/// keeping complexity minimal.
///
/// # Example
///
/// ```rust
/// use georank::Config;
///
/// let config = Config::default();
/// assert_eq!(config.max_node_entries, 16);
///
/// let json = r#"{
///     "max_node_entries": 32,
///     "min_node_entries": 12,
///     "distance_metric": "geodesic"
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.min_node_entries, 12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum entries per tree node (M). Higher values mean shallower
    /// trees with coarser pruning.
    #[serde(default = "Config::default_max_node_entries")]
    pub max_node_entries: usize,

    /// Minimum entries per non-root node (m). Must satisfy
    /// `1 <= m <= M / 2`.
    #[serde(default = "Config::default_min_node_entries")]
    pub min_node_entries: usize,

    /// Distance metric used for scoring and radius filtering.
    #[serde(default)]
    pub distance_metric: DistanceMetric,
}

impl Config {
    const fn default_max_node_entries() -> usize {
        16
    }

    const fn default_min_node_entries() -> usize {
        8
    }

    pub fn with_node_entries(mut self, min: usize, max: usize) -> Self {
        self.min_node_entries = min;
        self.max_node_entries = max;
        self
    }

    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_node_entries < 2 {
            return Err("max_node_entries must be at least 2".to_string());
        }
        if self.min_node_entries < 1 {
            return Err("min_node_entries must be at least 1".to_string());
        }
        if self.min_node_entries > self.max_node_entries / 2 {
            return Err(format!(
                "min_node_entries ({}) must be <= max_node_entries / 2 ({})",
                self.min_node_entries,
                self.max_node_entries / 2
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a TOML string (requires `toml` feature).
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a TOML string (requires `toml` feature).
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_node_entries: Self::default_max_node_entries(),
            min_node_entries: Self::default_min_node_entries(),
            distance_metric: DistanceMetric::default(),
        }
    }
}
