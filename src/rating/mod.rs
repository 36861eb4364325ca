//! Elo rating recomputation for doubles seasons
//!
//! This module provides the rating formulas, participant name resolution,
//! the sequential season fold and the reports built on its output.

pub mod aggregator;
pub mod engine;
pub mod formula;
pub mod prediction;
pub mod resolver;

// Re-export commonly used types
pub use aggregator::{compare_scenarios, Improvement, RankedParticipant, RatingTier, ResultAggregator};
pub use engine::{RatingEngine, RecomputeOutcome, SkipReason, SkippedFixture};
pub use formula::{actual_scores, expected_score, rating_delta};
pub use prediction::{predict, MatchBalance, MatchPrediction};
pub use resolver::NameResolver;
