//! Season rating storage interface and implementations
//!
//! Final per-season participant ratings are written as one unit per recompute
//! run. Readers either see the previous run's table or the new one, never a
//! mixture.

use crate::error::{RatingError, Result};
use crate::types::{PlayerKey, RunId, SeasonId, SeasonParticipant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Stored rating table for one season with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRatings {
    pub season_id: SeasonId,
    pub run_id: RunId,
    pub participants: BTreeMap<PlayerKey, SeasonParticipant>,
    pub updated_at: DateTime<Utc>,
}

impl SeasonRatings {
    pub fn new(
        season_id: SeasonId,
        run_id: RunId,
        participants: BTreeMap<PlayerKey, SeasonParticipant>,
    ) -> Self {
        Self {
            season_id,
            run_id,
            participants,
            updated_at: Utc::now(),
        }
    }
}

/// Trait for season rating storage operations
#[cfg_attr(test, mockall::automock)]
pub trait SeasonRatingStorage: Send + Sync {
    /// Replace a season's whole rating table
    fn replace_season_ratings(&self, ratings: SeasonRatings) -> Result<()>;

    /// Get a season's rating table, if one was ever stored
    fn get_season_ratings(&self, season_id: &str) -> Result<Option<SeasonRatings>>;

    /// Get one participant's stored state in a season
    fn get_rating(&self, season_id: &str, key: &str) -> Result<Option<SeasonParticipant>>;

    /// Drop a season's table
    fn remove_season(&self, season_id: &str) -> Result<bool>;

    /// Seasons with a stored table, sorted
    fn season_ids(&self) -> Result<Vec<SeasonId>>;
}

/// In-memory season rating storage
#[derive(Debug, Default)]
pub struct InMemorySeasonRatingStorage {
    seasons: RwLock<HashMap<SeasonId, SeasonRatings>>,
}

impl InMemorySeasonRatingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(kind: &str) -> RatingError {
        RatingError::InternalError {
            message: format!("Failed to acquire season ratings {} lock", kind),
        }
    }
}

impl SeasonRatingStorage for InMemorySeasonRatingStorage {
    fn replace_season_ratings(&self, ratings: SeasonRatings) -> Result<()> {
        let mut seasons = self
            .seasons
            .write()
            .map_err(|_| Self::lock_error("write"))?;

        seasons.insert(ratings.season_id.clone(), ratings);
        Ok(())
    }

    fn get_season_ratings(&self, season_id: &str) -> Result<Option<SeasonRatings>> {
        let seasons = self.seasons.read().map_err(|_| Self::lock_error("read"))?;

        Ok(seasons.get(season_id).cloned())
    }

    fn get_rating(&self, season_id: &str, key: &str) -> Result<Option<SeasonParticipant>> {
        let seasons = self.seasons.read().map_err(|_| Self::lock_error("read"))?;

        Ok(seasons
            .get(season_id)
            .and_then(|season| season.participants.get(key))
            .cloned())
    }

    fn remove_season(&self, season_id: &str) -> Result<bool> {
        let mut seasons = self
            .seasons
            .write()
            .map_err(|_| Self::lock_error("write"))?;

        Ok(seasons.remove(season_id).is_some())
    }

    fn season_ids(&self) -> Result<Vec<SeasonId>> {
        let seasons = self.seasons.read().map_err(|_| Self::lock_error("read"))?;

        let mut ids: Vec<SeasonId> = seasons.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
