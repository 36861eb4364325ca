//! Service layer for season recomputation
//!
//! Coordinates the feed, the rating engine and the persistence collaborators.

pub mod recompute;

pub use recompute::{RecomputeReport, RecomputeService};
