//! Metrics collection using Prometheus
//!
//! Counters and histograms describing season recompute runs.

use crate::rating::engine::RecomputeOutcome;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for recompute runs
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Run-level metrics
    run_metrics: RunMetrics,

    /// Fixture and event throughput
    fold_metrics: FoldMetrics,
}

/// Run-level metrics
#[derive(Clone)]
pub struct RunMetrics {
    /// Recompute runs by final status
    pub recompute_runs_total: IntCounterVec,

    /// Wall time of a full recompute including persistence
    pub recompute_duration_seconds: Histogram,

    /// Seasons currently being recomputed
    pub seasons_in_flight: IntGauge,
}

/// Fixture and event throughput
#[derive(Clone)]
pub struct FoldMetrics {
    pub fixtures_processed_total: IntCounter,

    /// Skipped fixtures by reason label
    pub fixtures_skipped_total: IntCounterVec,

    pub rating_events_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let run_metrics = RunMetrics::new(&registry)?;
        let fold_metrics = FoldMetrics::new(&registry)?;

        Ok(Self {
            registry,
            run_metrics,
            fold_metrics,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn runs(&self) -> &RunMetrics {
        &self.run_metrics
    }

    pub fn fold(&self) -> &FoldMetrics {
        &self.fold_metrics
    }

    /// Record the counts of a finished engine fold
    pub fn record_outcome(&self, outcome: &RecomputeOutcome) {
        self.fold_metrics
            .fixtures_processed_total
            .inc_by(outcome.fixtures_processed as u64);
        self.fold_metrics
            .rating_events_total
            .inc_by(outcome.events.len() as u64);

        for skipped in &outcome.skipped {
            self.fold_metrics
                .fixtures_skipped_total
                .with_label_values(&[skipped.reason.label()])
                .inc();
        }
    }

    /// Record a finished run
    pub fn record_run(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failed" };

        self.run_metrics
            .recompute_runs_total
            .with_label_values(&[status])
            .inc();

        self.run_metrics
            .recompute_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn season_started(&self) {
        self.run_metrics.seasons_in_flight.inc();
    }

    pub fn season_finished(&self) {
        self.run_metrics.seasons_in_flight.dec();
    }

    /// Text exposition of every registered metric
    pub fn gather_text(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RunMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let recompute_runs_total = IntCounterVec::new(
            Opts::new("season_elo_recompute_runs_total", "Recompute runs by status"),
            &["status"],
        )?;
        registry.register(Box::new(recompute_runs_total.clone()))?;

        let recompute_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "season_elo_recompute_duration_seconds",
                "Season recompute time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(recompute_duration_seconds.clone()))?;

        let seasons_in_flight = IntGauge::new(
            "season_elo_seasons_in_flight",
            "Seasons currently being recomputed",
        )?;
        registry.register(Box::new(seasons_in_flight.clone()))?;

        Ok(Self {
            recompute_runs_total,
            recompute_duration_seconds,
            seasons_in_flight,
        })
    }
}

impl FoldMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let fixtures_processed_total = IntCounter::new(
            "season_elo_fixtures_processed_total",
            "Fixtures applied to ratings",
        )?;
        registry.register(Box::new(fixtures_processed_total.clone()))?;

        let fixtures_skipped_total = IntCounterVec::new(
            Opts::new(
                "season_elo_fixtures_skipped_total",
                "Fixtures left out of the fold",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(fixtures_skipped_total.clone()))?;

        let rating_events_total = IntCounter::new(
            "season_elo_rating_events_total",
            "Rating change events emitted",
        )?;
        registry.register(Box::new(rating_events_total.clone()))?;

        Ok(Self {
            fixtures_processed_total,
            fixtures_skipped_total,
            rating_events_total,
        })
    }
}
