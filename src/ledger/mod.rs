//! Persistence collaborators for recompute output
//!
//! The history ledger holds rating-change events; season rating storage holds
//! the final per-participant table. Both are replaced whole per season.

pub mod history;
pub mod storage;

pub use history::{HistoryLedger, InMemoryHistoryLedger};
pub use storage::{InMemorySeasonRatingStorage, SeasonRatingStorage, SeasonRatings};
