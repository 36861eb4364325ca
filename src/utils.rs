//! Utility functions for the recomputation service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique recompute run ID
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round a rating for reporting
pub fn round_rating(rating: f64) -> i64 {
    rating.round() as i64
}

/// Clamp a rating into the configured bounds
pub fn clamp_rating(rating: f64, floor: f64, ceiling: f64) -> f64 {
    rating.max(floor).min(ceiling)
}
