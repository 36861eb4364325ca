//! Match feed traits and implementations
//!
//! A feed supplies, per season, the starting-rating table and the recorded
//! fixtures sorted by `(timestamp, sequence_key)`.

pub mod file;
pub mod seeding;

pub use file::SeasonFile;
pub use seeding::{parse_seeding, RejectedLine, SeedingSheet};

use crate::config::rating::SeasonSettings;
use crate::error::{RatingError, Result};
use crate::types::{MatchFixture, SeasonId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Trait for supplying season inputs to a recompute
#[async_trait]
pub trait MatchFeed: Send + Sync {
    /// Fixtures of a season in recorded order
    async fn fixtures(&self, season_id: &str) -> Result<Vec<MatchFixture>>;

    /// Raw starting ratings of a season, labels not yet canonicalized
    async fn starting_ratings(&self, season_id: &str) -> Result<BTreeMap<String, f64>>;

    /// Season-level overrides of the global rating config
    async fn season_settings(&self, season_id: &str) -> Result<SeasonSettings>;

    /// Seasons this feed can supply, sorted
    fn season_ids(&self) -> Vec<SeasonId>;
}

/// Feed backed by season data held in memory
///
/// Fixtures are sorted when a season is added so the feed always hands out
/// recorded order.
#[derive(Debug, Clone, Default)]
pub struct StaticMatchFeed {
    seasons: HashMap<SeasonId, SeasonFile>,
}

impl StaticMatchFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed holding a single season
    pub fn from_season(season: SeasonFile) -> Self {
        let mut feed = Self::new();
        feed.insert_season(season);
        feed
    }

    /// Add or replace a season
    pub fn insert_season(&mut self, mut season: SeasonFile) {
        season
            .fixtures
            .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.seasons.insert(season.season_id.clone(), season);
    }

    pub fn season(&self, season_id: &str) -> Result<&SeasonFile> {
        self.seasons.get(season_id).ok_or_else(|| {
            RatingError::SeasonNotFound {
                season_id: season_id.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl MatchFeed for StaticMatchFeed {
    async fn fixtures(&self, season_id: &str) -> Result<Vec<MatchFixture>> {
        Ok(self.season(season_id)?.fixtures.clone())
    }

    async fn starting_ratings(&self, season_id: &str) -> Result<BTreeMap<String, f64>> {
        Ok(self.season(season_id)?.starting_ratings.clone())
    }

    async fn season_settings(&self, season_id: &str) -> Result<SeasonSettings> {
        Ok(self.season(season_id)?.settings.clone())
    }

    fn season_ids(&self) -> Vec<SeasonId> {
        let mut ids: Vec<SeasonId> = self.seasons.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fixture(id: &str, minute: u32, sequence: &str) -> MatchFixture {
        MatchFixture {
            fixture_id: id.to_string(),
            team_a: ["A".to_string(), "B".to_string()],
            team_b: ["C".to_string(), "D".to_string()],
            score_a: 6,
            score_b: 4,
            timestamp: Utc.with_ymd_and_hms(2025, 9, 1, 19, minute, 0).unwrap(),
            sequence_key: sequence.to_string(),
            k_factor: None,
        }
    }

    #[tokio::test]
    async fn test_feed_sorts_fixtures() {
        let season = SeasonFile {
            season_id: "autumn".to_string(),
            starting_ratings: BTreeMap::new(),
            fixtures: vec![
                fixture("late", 30, "1"),
                fixture("second", 0, "2"),
                fixture("first", 0, "1"),
            ],
            settings: SeasonSettings {
                k_factor: Some(20.0),
                default_starting_rating: None,
            },
        };
        let feed = StaticMatchFeed::from_season(season);

        let ids: Vec<String> = feed
            .fixtures("autumn")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.fixture_id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "late"]);

        let settings = feed.season_settings("autumn").await.unwrap();
        assert_eq!(settings.k_factor, Some(20.0));
    }

    #[tokio::test]
    async fn test_unknown_season() {
        let feed = StaticMatchFeed::new();
        let err = feed.fixtures("winter").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::SeasonNotFound { season_id }) if season_id == "winter"
        ));
        assert!(feed.season_ids().is_empty());
    }
}
