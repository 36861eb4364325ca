//! Elo expected-score and rating-delta functions
//!
//! Team strength is the mean of the two partners' ratings; the same formulas
//! then apply as for a one-on-one Elo game.

use skillratings::elo::EloRating;

/// Expected score of a side rated `rating_a` against a side rated `rating_b`
///
/// `1 / (1 + 10^((rating_b - rating_a) / 400))`, always strictly inside (0, 1)
/// for finite inputs.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    let (expected_a, _expected_b) = skillratings::elo::expected_score(
        &EloRating { rating: rating_a },
        &EloRating { rating: rating_b },
    );
    expected_a
}

/// Rating change for an actual vs expected score
pub fn rating_delta(actual: f64, expected: f64, k_factor: f64) -> f64 {
    k_factor * (actual - expected)
}

/// Normalise a game score pair into actual scores in [0, 1]
///
/// Both sides get `draw_actual_score` when no games were recorded. The total
/// is taken in `f64` so scores near `i64::MAX` cannot overflow.
pub fn actual_scores(score_a: i64, score_b: i64, draw_actual_score: f64) -> (f64, f64) {
    let total = score_a as f64 + score_b as f64;
    if total > 0.0 {
        let actual_a = score_a as f64 / total;
        (actual_a, 1.0 - actual_a)
    } else {
        (draw_actual_score, draw_actual_score)
    }
}

/// Arithmetic mean of a pair's ratings
pub fn team_average(ratings: [f64; 2]) -> f64 {
    (ratings[0] + ratings[1]) / 2.0
}
