//! Reporting views over a season's final ratings and rating history

use crate::rating::engine::RecomputeOutcome;
use crate::types::{PlayerKey, RatingChangeEvent, SeasonParticipant};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A participant's position in the rating table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedParticipant {
    pub rank: usize,
    pub key: PlayerKey,
    pub rating: f64,
    pub games_played: u32,
    pub tier: RatingTier,
}

/// Rating movement over a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub key: PlayerKey,
    pub starting_rating: f64,
    pub current_rating: f64,
    pub delta: f64,
    pub games_played: u32,
}

/// Coarse skill band used in league tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingTier {
    Beginner,
    Developing,
    Good,
    Strong,
    Elite,
}

impl RatingTier {
    pub fn for_rating(rating: f64) -> Self {
        if rating >= 1400.0 {
            RatingTier::Elite
        } else if rating >= 1300.0 {
            RatingTier::Strong
        } else if rating >= 1200.0 {
            RatingTier::Good
        } else if rating >= 1100.0 {
            RatingTier::Developing
        } else {
            RatingTier::Beginner
        }
    }
}

impl std::fmt::Display for RatingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingTier::Elite => write!(f, "Elite"),
            RatingTier::Strong => write!(f, "Strong"),
            RatingTier::Good => write!(f, "Good"),
            RatingTier::Developing => write!(f, "Developing"),
            RatingTier::Beginner => write!(f, "Beginner"),
        }
    }
}

/// One participant's standing under two different seedings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub key: PlayerKey,
    pub rank_a: usize,
    pub rating_a: f64,
    pub rank_b: usize,
    pub rating_b: f64,
    /// Positive when the participant ranks lower under scenario B
    pub rank_diff: i64,
    pub rating_diff: f64,
}

/// Read-only reports over final ratings and the event ledger
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    participants: BTreeMap<PlayerKey, SeasonParticipant>,
    /// First recorded pre-fixture rating per participant
    first_old_ratings: BTreeMap<PlayerKey, f64>,
    default_rating: f64,
}

impl ResultAggregator {
    /// Build from persisted final ratings plus the season's events in fold order
    pub fn new(
        participants: BTreeMap<PlayerKey, SeasonParticipant>,
        events: &[RatingChangeEvent],
        default_rating: f64,
    ) -> Self {
        let mut first_old_ratings = BTreeMap::new();
        for event in events {
            first_old_ratings
                .entry(event.participant_key.clone())
                .or_insert(event.old_rating);
        }

        Self {
            participants,
            first_old_ratings,
            default_rating,
        }
    }

    pub fn from_outcome(outcome: &RecomputeOutcome, default_rating: f64) -> Self {
        Self::new(outcome.participants.clone(), &outcome.events, default_rating)
    }

    /// Participants by rating, highest first; ties by key
    pub fn rank_by_rating(&self) -> Vec<RankedParticipant> {
        let mut sorted: Vec<&SeasonParticipant> = self.participants.values().collect();
        sorted.sort_by(|a, b| rating_desc(a.rating, b.rating).then_with(|| a.key.cmp(&b.key)));

        sorted
            .into_iter()
            .enumerate()
            .map(|(i, p)| RankedParticipant {
                rank: i + 1,
                key: p.key.clone(),
                rating: p.rating,
                games_played: p.games_played,
                tier: RatingTier::for_rating(p.rating),
            })
            .collect()
    }

    /// Rating movement since the participant's first recorded fixture
    pub fn improvement(&self, key: &str) -> Option<Improvement> {
        let participant = self.participants.get(key)?;
        let starting_rating = self
            .first_old_ratings
            .get(key)
            .copied()
            .unwrap_or(self.default_rating);

        Some(Improvement {
            key: participant.key.clone(),
            starting_rating,
            current_rating: participant.rating,
            delta: participant.rating - starting_rating,
            games_played: participant.games_played,
        })
    }

    pub fn most_improved(&self, n: usize) -> Vec<Improvement> {
        let mut improvements = self.played_improvements();
        improvements.sort_by(|a, b| rating_desc(a.delta, b.delta).then_with(|| a.key.cmp(&b.key)));
        improvements.truncate(n);
        improvements
    }

    pub fn most_declined(&self, n: usize) -> Vec<Improvement> {
        let mut improvements = self.played_improvements();
        improvements.sort_by(|a, b| {
            rating_desc(b.delta, a.delta).then_with(|| a.key.cmp(&b.key))
        });
        improvements.truncate(n);
        improvements
    }

    // Participants who never played have no movement to report
    fn played_improvements(&self) -> Vec<Improvement> {
        self.participants
            .values()
            .filter(|p| p.games_played > 0)
            .filter_map(|p| self.improvement(&p.key))
            .collect()
    }
}

/// Compare the final tables of two runs over the same fixtures
///
/// Only participants present in both runs are compared. Rows follow the rank
/// order of scenario A.
pub fn compare_scenarios(
    scenario_a: &ResultAggregator,
    scenario_b: &ResultAggregator,
) -> Vec<ScenarioComparison> {
    let ranked_b: BTreeMap<PlayerKey, RankedParticipant> = scenario_b
        .rank_by_rating()
        .into_iter()
        .map(|r| (r.key.clone(), r))
        .collect();

    scenario_a
        .rank_by_rating()
        .into_iter()
        .filter_map(|a| {
            let b = ranked_b.get(&a.key)?;
            Some(ScenarioComparison {
                key: a.key.clone(),
                rank_a: a.rank,
                rating_a: a.rating,
                rank_b: b.rank,
                rating_b: b.rating,
                rank_diff: b.rank as i64 - a.rank as i64,
                rating_diff: b.rating - a.rating,
            })
        })
        .collect()
}

fn rating_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
