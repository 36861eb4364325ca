//! Season ELO - deterministic rating recomputation for doubles seasons
//!
//! This crate replays a season's recorded doubles fixtures over a
//! starting-rating table, producing final ratings plus an audit trail of
//! every rating change, and persists both as whole-season replacements.

pub mod config;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use feed::{MatchFeed, SeasonFile, StaticMatchFeed};
pub use ledger::{HistoryLedger, SeasonRatingStorage};
pub use rating::{NameResolver, RatingEngine, RecomputeOutcome, ResultAggregator};
pub use service::{RecomputeReport, RecomputeService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
