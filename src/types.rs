//! Common types used throughout the recomputation service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Canonical participant identifier (output of the name resolver)
pub type PlayerKey = String;

/// Identifier of a recorded fixture
pub type FixtureId = String;

/// Identifier of a season
pub type SeasonId = String;

/// Identifier of a single recompute run
pub type RunId = Uuid;

/// Starting ratings keyed by participant
pub type StartingRatings = BTreeMap<PlayerKey, f64>;

/// Final ratings keyed by participant
pub type RatingMap = BTreeMap<PlayerKey, f64>;

/// A player with a canonical identity and a display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerKey,
    pub display_name: String,
}

/// A player's rating state within one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonParticipant {
    pub key: PlayerKey,
    pub starting_rating: f64,
    pub rating: f64,
    pub games_played: u32,
}

impl SeasonParticipant {
    pub fn new(key: PlayerKey, starting_rating: f64) -> Self {
        Self {
            key,
            starting_rating,
            rating: starting_rating,
            games_played: 0,
        }
    }

    /// Apply a rating delta and count the game
    pub fn apply_delta(&mut self, delta: f64) {
        self.rating += delta;
        self.games_played += 1;
    }
}

/// Which side of a fixture a participant played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// One recorded doubles encounter within a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFixture {
    pub fixture_id: FixtureId,
    pub team_a: [PlayerKey; 2],
    pub team_b: [PlayerKey; 2],
    pub score_a: i64,
    pub score_b: i64,
    pub timestamp: DateTime<Utc>,
    /// Tie-break when two fixtures share a timestamp
    pub sequence_key: String,
    /// Per-fixture K-factor override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_factor: Option<f64>,
}

impl MatchFixture {
    /// Key the feed must be sorted by
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.sequence_key.as_str())
    }
}

impl std::fmt::Display for MatchFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} & {} vs {} & {} ({}-{})",
            self.team_a[0], self.team_a[1], self.team_b[0], self.team_b[1], self.score_a, self.score_b
        )
    }
}

/// Immutable audit record of one participant's rating change in one fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChangeEvent {
    pub participant_key: PlayerKey,
    pub fixture_id: FixtureId,
    pub old_rating: f64,
    pub new_rating: f64,
    pub delta: f64,
    pub opponent_avg_rating: f64,
    pub expected_score: f64,
    pub actual_score: f64,
    pub k_factor: f64,
    pub timestamp: DateTime<Utc>,
}
