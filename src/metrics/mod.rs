//! Metrics for season recompute runs

pub mod collector;

pub use collector::{FoldMetrics, MetricsCollector, MetricsTimer, RunMetrics};
