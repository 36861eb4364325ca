//! Error types for the rating recomputation service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific recomputation scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RatingError {
    #[error("Fixture {fixture_id} references unknown participants: {}", missing.join(", "))]
    MissingParticipant {
        fixture_id: String,
        missing: Vec<String>,
    },

    #[error("Fixture {fixture_id} has invalid score {score_a}-{score_b}")]
    InvalidScore {
        fixture_id: String,
        score_a: i64,
        score_b: i64,
    },

    #[error("Fixture {fixture_id} lists participant {participant} more than once")]
    DuplicateParticipant {
        fixture_id: String,
        participant: String,
    },

    #[error("Fixture {fixture_id} at position {index} is out of order")]
    OrderingViolation { index: usize, fixture_id: String },

    #[error("Conflicting starting ratings for {participant}: {first} vs {second}")]
    ConflictingStartingRating {
        participant: String,
        first: f64,
        second: f64,
    },

    #[error("Season not found: {season_id}")]
    SeasonNotFound { season_id: String },

    #[error("Ledger write failed: {message}")]
    LedgerWriteFailed { message: String },

    #[error("Rating storage write failed: {message}")]
    StorageWriteFailed { message: String },

    #[error("Rollback after failed write did not complete ({cause}): {rollback_error}")]
    RollbackFailed {
        cause: String,
        rollback_error: String,
    },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
