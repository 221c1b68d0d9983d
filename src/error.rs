//! Error types for georank.

use thiserror::Error;

/// All the ways the engine can fail.
///
/// Invalid data and invalid queries are caller errors and carry a message
/// naming the offending field. `StructuralInvariant` signals internal
/// corruption of the spatial index; the holding engine should be discarded
/// and rebuilt rather than queried further.
#[derive(Error, Debug)]
pub enum GeoRankError {
    /// A query parameter failed validation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An entity record or configuration value failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A structural invariant of the spatial index was violated.
    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),
}

/// Result type alias for georank operations.
pub type Result<T> = std::result::Result<T, GeoRankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_cause() {
        let err = GeoRankError::InvalidQuery("k must be at least 1, got 0".to_string());
        assert_eq!(err.to_string(), "invalid query: k must be at least 1, got 0");

        let err = GeoRankError::StructuralInvariant("leaf 3 underfilled".to_string());
        assert!(err.to_string().contains("structural invariant"));
    }
}
