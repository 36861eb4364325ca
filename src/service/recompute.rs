//! Season recompute orchestration
//!
//! Reads a season from the feed, folds it on a blocking thread, then replaces
//! the season's ledger and rating table. If either write fails both stores are
//! restored to their state before the run. Runs of the same season are
//! serialized so one run's rollback cannot undo another run's writes.

use crate::config::AppConfig;
use crate::error::{RatingError, Result};
use crate::feed::MatchFeed;
use crate::ledger::{HistoryLedger, SeasonRatingStorage, SeasonRatings};
use crate::metrics::MetricsCollector;
use crate::rating::aggregator::ResultAggregator;
use crate::rating::engine::{RatingEngine, RecomputeOutcome, SkippedFixture};
use crate::rating::resolver::NameResolver;
use crate::types::{RatingChangeEvent, RatingMap, RunId, SeasonId};
use crate::utils::{current_timestamp, generate_run_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Summary of one successful recompute run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub run_id: RunId,
    pub season_id: SeasonId,
    pub participants: usize,
    pub fixtures_processed: usize,
    pub events_written: usize,
    pub skipped: Vec<SkippedFixture>,
    pub final_ratings: RatingMap,
    pub completed_at: DateTime<Utc>,
}

impl RecomputeReport {
    fn new(run_id: RunId, season_id: &str, outcome: &RecomputeOutcome) -> Self {
        Self {
            run_id,
            season_id: season_id.to_string(),
            participants: outcome.participants.len(),
            fixtures_processed: outcome.fixtures_processed,
            events_written: outcome.events.len(),
            skipped: outcome.skipped.clone(),
            final_ratings: outcome.final_ratings(),
            completed_at: current_timestamp(),
        }
    }
}

/// Drives feed -> engine -> {ledger, storage} for whole seasons
#[derive(Clone)]
pub struct RecomputeService {
    feed: Arc<dyn MatchFeed>,
    ledger: Arc<dyn HistoryLedger>,
    storage: Arc<dyn SeasonRatingStorage>,
    engine: Arc<RatingEngine>,
    metrics: Arc<MetricsCollector>,
    max_concurrent_seasons: usize,
    season_locks: Arc<StdMutex<HashMap<SeasonId, Arc<Mutex<()>>>>>,
}

impl RecomputeService {
    pub fn new(
        feed: Arc<dyn MatchFeed>,
        ledger: Arc<dyn HistoryLedger>,
        storage: Arc<dyn SeasonRatingStorage>,
        engine: RatingEngine,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            feed,
            ledger,
            storage,
            engine: Arc::new(engine),
            metrics,
            max_concurrent_seasons: 1,
            season_locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Build the engine and concurrency limit from application config
    pub fn from_config(
        config: &AppConfig,
        feed: Arc<dyn MatchFeed>,
        ledger: Arc<dyn HistoryLedger>,
        storage: Arc<dyn SeasonRatingStorage>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let engine = RatingEngine::new(
            config.rating.to_rating_config(),
            NameResolver::new(&config.aliases),
        )?;
        info!(
            "Recompute service ready - K={}, aliases: {}, max concurrent seasons: {}",
            engine.config().k_factor,
            engine.resolver().alias_count(),
            config.service.max_concurrent_seasons
        );
        Ok(Self::new(feed, ledger, storage, engine, metrics)
            .with_max_concurrent_seasons(config.service.max_concurrent_seasons))
    }

    pub fn with_max_concurrent_seasons(mut self, max: usize) -> Self {
        self.max_concurrent_seasons = max.max(1);
        self
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    pub fn ledger(&self) -> Arc<dyn HistoryLedger> {
        self.ledger.clone()
    }

    pub fn storage(&self) -> Arc<dyn SeasonRatingStorage> {
        self.storage.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Recompute one season from scratch and persist the result
    pub async fn recompute(&self, season_id: &str) -> Result<RecomputeReport> {
        let timer = self.metrics.start_timer();
        self.metrics.season_started();

        let result = self.run(season_id).await;

        self.metrics.season_finished();
        let duration = timer.stop();
        self.metrics.record_run(result.is_ok(), duration);

        match &result {
            Ok(report) => info!(
                "Season {} recomputed in {:.2}ms - run: {}, fixtures: {}, skipped: {}, events: {}",
                season_id,
                duration.as_secs_f64() * 1000.0,
                report.run_id,
                report.fixtures_processed,
                report.skipped.len(),
                report.events_written
            ),
            Err(e) => error!("Season {} recompute failed: {}", season_id, e),
        }

        result
    }

    /// Recompute several independent seasons concurrently
    ///
    /// Results are keyed by season. Duplicate ids are recomputed once.
    pub async fn recompute_all(
        &self,
        season_ids: &[SeasonId],
    ) -> BTreeMap<SeasonId, Result<RecomputeReport>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_seasons));
        let mut tasks = JoinSet::new();
        let mut unique: Vec<SeasonId> = season_ids.to_vec();
        unique.sort();
        unique.dedup();

        for season_id in unique.iter().cloned() {
            let service = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => service.recompute(&season_id).await,
                    Err(e) => Err(RatingError::InternalError {
                        message: format!("Concurrency limiter closed: {}", e),
                    }
                    .into()),
                };
                (season_id, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((season_id, result)) => {
                    results.insert(season_id, result);
                }
                Err(e) => error!("Recompute task failed to complete: {}", e),
            }
        }

        // A task that panicked never reported its season
        for season_id in unique {
            results.entry(season_id.clone()).or_insert_with(|| {
                Err(RatingError::InternalError {
                    message: format!("Recompute task for season {} did not complete", season_id),
                }
                .into())
            });
        }

        results
    }

    /// Reporting view over a season's persisted ratings and ledger
    pub async fn aggregator(&self, season_id: &str) -> Result<ResultAggregator> {
        let ratings = self
            .storage
            .get_season_ratings(season_id)?
            .ok_or_else(|| RatingError::SeasonNotFound {
                season_id: season_id.to_string(),
            })?;
        let events = self
            .ledger
            .season_events(season_id)
            .await?
            .unwrap_or_default();
        let engine = self.season_engine(season_id).await?;

        Ok(ResultAggregator::new(
            ratings.participants,
            &events,
            engine.config().default_starting_rating,
        ))
    }

    /// Engine configured with the season's own K-factor and default rating
    pub async fn season_engine(&self, season_id: &str) -> Result<RatingEngine> {
        let settings = self.feed.season_settings(season_id).await?;
        if !settings.is_empty() {
            debug!("Season {} overrides rating settings: {:?}", season_id, settings);
        }
        self.engine.for_season(&settings)
    }

    /// Guard shared by every run of one season
    fn season_lock(&self, season_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .season_locks
            .lock()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire season lock table".to_string(),
            })?;
        Ok(locks.entry(season_id.to_string()).or_default().clone())
    }

    async fn run(&self, season_id: &str) -> Result<RecomputeReport> {
        let lock = self.season_lock(season_id)?;
        let _guard = lock.lock().await;

        let run_id = generate_run_id();
        info!("Starting recompute run {} for season {}", run_id, season_id);

        let fixtures = self.feed.fixtures(season_id).await?;
        let starting = self.feed.starting_ratings(season_id).await?;
        let engine = self.season_engine(season_id).await?;
        let outcome = tokio::task::spawn_blocking(move || engine.recompute(&starting, &fixtures))
            .await
            .map_err(|e| RatingError::InternalError {
                message: format!("Engine task for season {} failed: {}", season_id, e),
            })??;

        self.metrics.record_outcome(&outcome);
        self.persist(season_id, run_id, &outcome).await?;

        Ok(RecomputeReport::new(run_id, season_id, &outcome))
    }

    async fn persist(&self, season_id: &str, run_id: RunId, outcome: &RecomputeOutcome) -> Result<()> {
        let prior_events = self.ledger.season_events(season_id).await?;
        let prior_ratings = self.storage.get_season_ratings(season_id)?;

        if let Err(e) = self
            .ledger
            .replace_season(season_id, outcome.events.clone())
            .await
        {
            let cause = RatingError::LedgerWriteFailed {
                message: e.to_string(),
            };
            return Err(self.roll_back(season_id, prior_events, prior_ratings, cause).await);
        }

        let ratings = SeasonRatings::new(season_id.to_string(), run_id, outcome.participants.clone());
        if let Err(e) = self.storage.replace_season_ratings(ratings) {
            let cause = RatingError::StorageWriteFailed {
                message: e.to_string(),
            };
            return Err(self.roll_back(season_id, prior_events, prior_ratings, cause).await);
        }

        Ok(())
    }

    /// Restore the season after a failed write and build the caller's error
    async fn roll_back(
        &self,
        season_id: &str,
        prior_events: Option<Vec<RatingChangeEvent>>,
        prior_ratings: Option<SeasonRatings>,
        cause: RatingError,
    ) -> anyhow::Error {
        match self.restore(season_id, prior_events, prior_ratings).await {
            Ok(()) => cause.into(),
            Err(rollback) => RatingError::RollbackFailed {
                cause: cause.to_string(),
                rollback_error: rollback.to_string(),
            }
            .into(),
        }
    }

    /// Attempts both stores even when the first restore fails
    async fn restore(
        &self,
        season_id: &str,
        prior_events: Option<Vec<RatingChangeEvent>>,
        prior_ratings: Option<SeasonRatings>,
    ) -> Result<()> {
        warn!("Rolling back season {} to its previous state", season_id);
        let mut failures = Vec::new();

        let ledger_result = match prior_events {
            Some(events) => self.ledger.replace_season(season_id, events).await,
            None => self.ledger.clear_season(season_id).await.map(|_| ()),
        };
        if let Err(e) = ledger_result {
            error!("Failed to restore ledger for season {}: {}", season_id, e);
            failures.push(format!("ledger: {}", e));
        }

        let storage_result = match prior_ratings {
            Some(ratings) => self.storage.replace_season_ratings(ratings),
            None => self.storage.remove_season(season_id).map(|_| ()),
        };
        if let Err(e) = storage_result {
            error!("Failed to restore ratings for season {}: {}", season_id, e);
            failures.push(format!("ratings: {}", e));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(failures.join("; ")))
        }
    }
}
