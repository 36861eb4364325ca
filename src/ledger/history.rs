//! Rating history ledger
//!
//! Stores the ordered rating-change events of each season. Events are never
//! edited one by one: a recompute swaps in the complete new set for a season.

use crate::error::Result;
use crate::types::{RatingChangeEvent, SeasonId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for the season event ledger
#[async_trait]
pub trait HistoryLedger: Send + Sync {
    /// Atomically replace every event of a season
    async fn replace_season(&self, season_id: &str, events: Vec<RatingChangeEvent>) -> Result<()>;

    /// All events of a season in fold order, if the season was ever written
    async fn season_events(&self, season_id: &str) -> Result<Option<Vec<RatingChangeEvent>>>;

    /// One participant's events in fold order
    async fn participant_events(
        &self,
        season_id: &str,
        key: &str,
    ) -> Result<Vec<RatingChangeEvent>>;

    /// The event a fixture produced for one participant
    async fn fixture_impact(
        &self,
        season_id: &str,
        fixture_id: &str,
        key: &str,
    ) -> Result<Option<RatingChangeEvent>>;

    /// Remove a season; false when nothing was stored
    async fn clear_season(&self, season_id: &str) -> Result<bool>;

    async fn event_count(&self, season_id: &str) -> Result<usize>;
}

/// In-memory ledger keyed by season
#[derive(Debug, Default)]
pub struct InMemoryHistoryLedger {
    seasons: RwLock<HashMap<SeasonId, Vec<RatingChangeEvent>>>,
}

impl InMemoryHistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryLedger for InMemoryHistoryLedger {
    async fn replace_season(&self, season_id: &str, events: Vec<RatingChangeEvent>) -> Result<()> {
        let mut seasons = self.seasons.write().await;
        debug!(
            "Replacing ledger for season {} with {} events",
            season_id,
            events.len()
        );
        seasons.insert(season_id.to_string(), events);
        Ok(())
    }

    async fn season_events(&self, season_id: &str) -> Result<Option<Vec<RatingChangeEvent>>> {
        let seasons = self.seasons.read().await;
        Ok(seasons.get(season_id).cloned())
    }

    async fn participant_events(
        &self,
        season_id: &str,
        key: &str,
    ) -> Result<Vec<RatingChangeEvent>> {
        let seasons = self.seasons.read().await;
        Ok(seasons
            .get(season_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.participant_key == key)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fixture_impact(
        &self,
        season_id: &str,
        fixture_id: &str,
        key: &str,
    ) -> Result<Option<RatingChangeEvent>> {
        let seasons = self.seasons.read().await;
        Ok(seasons.get(season_id).and_then(|events| {
            events
                .iter()
                .find(|event| event.fixture_id == fixture_id && event.participant_key == key)
                .cloned()
        }))
    }

    async fn clear_season(&self, season_id: &str) -> Result<bool> {
        let mut seasons = self.seasons.write().await;
        Ok(seasons.remove(season_id).is_some())
    }

    async fn event_count(&self, season_id: &str) -> Result<usize> {
        let seasons = self.seasons.read().await;
        Ok(seasons.get(season_id).map(Vec::len).unwrap_or(0))
    }
}
