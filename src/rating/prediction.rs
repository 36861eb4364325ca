//! Pre-match prediction for two proposed pairs

use crate::rating::formula::{expected_score, team_average};
use crate::rating::resolver::NameResolver;
use crate::types::{PlayerKey, RatingMap};
use serde::{Deserialize, Serialize};

/// Average-rating gap below which a pairing counts as very balanced
pub const VERY_BALANCED_GAP: f64 = 50.0;
/// Average-rating gap above which an upset is worth flagging
pub const UPSET_ALERT_GAP: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBalance {
    VeryBalanced,
    Balanced,
    UpsetAlert,
}

impl MatchBalance {
    pub fn for_gap(gap: f64) -> Self {
        if gap > UPSET_ALERT_GAP {
            MatchBalance::UpsetAlert
        } else if gap < VERY_BALANCED_GAP {
            MatchBalance::VeryBalanced
        } else {
            MatchBalance::Balanced
        }
    }
}

impl std::fmt::Display for MatchBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchBalance::VeryBalanced => write!(f, "very balanced"),
            MatchBalance::Balanced => write!(f, "balanced"),
            MatchBalance::UpsetAlert => write!(f, "upset alert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub team_a: [PlayerKey; 2],
    pub team_b: [PlayerKey; 2],
    pub team_a_avg_rating: f64,
    pub team_b_avg_rating: f64,
    pub team_a_win_probability: f64,
    pub team_b_win_probability: f64,
    pub rating_difference: f64,
    pub balance: MatchBalance,
}

impl MatchPrediction {
    /// Win probabilities as whole percentages
    pub fn win_percentages(&self) -> (u32, u32) {
        (
            (self.team_a_win_probability * 100.0).round() as u32,
            (self.team_b_win_probability * 100.0).round() as u32,
        )
    }
}

/// Predict a proposed fixture from current ratings
///
/// Players without a rating are treated as newcomers at `default_rating`.
pub fn predict(
    team_a: &[PlayerKey; 2],
    team_b: &[PlayerKey; 2],
    ratings: &RatingMap,
    resolver: &NameResolver,
    default_rating: f64,
) -> MatchPrediction {
    let team_a = resolver.canonicalize_team(team_a);
    let team_b = resolver.canonicalize_team(team_b);
    let rating_of = |key: &PlayerKey| ratings.get(key).copied().unwrap_or(default_rating);

    let avg_a = team_average([rating_of(&team_a[0]), rating_of(&team_a[1])]);
    let avg_b = team_average([rating_of(&team_b[0]), rating_of(&team_b[1])]);
    let win_a = expected_score(avg_a, avg_b);
    let gap = (avg_a - avg_b).abs();

    MatchPrediction {
        team_a,
        team_b,
        team_a_avg_rating: avg_a,
        team_b_avg_rating: avg_b,
        team_a_win_probability: win_a,
        team_b_win_probability: 1.0 - win_a,
        rating_difference: gap,
        balance: MatchBalance::for_gap(gap),
    }
}
