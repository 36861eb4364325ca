//! Season recompute engine
//!
//! Folds a season's fixtures, in recorded order, over a starting-rating table.
//! Each fixture sees the ratings left by every earlier fixture, so the fold is
//! strictly sequential within a season. The engine performs no I/O and reads
//! no clock: identical inputs always produce an identical [`RecomputeOutcome`].

use crate::config::rating::{
    InvalidFixturePolicy, MissingParticipantPolicy, RatingConfig, SeasonSettings,
};
use crate::error::{RatingError, Result};
use crate::rating::formula::{actual_scores, expected_score, rating_delta, team_average};
use crate::rating::resolver::NameResolver;
use crate::types::{
    FixtureId, MatchFixture, PlayerKey, RatingChangeEvent, RatingMap, SeasonParticipant, Side,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Why a fixture was left out of the fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    MissingParticipant { missing: Vec<PlayerKey> },
    InvalidScore { score_a: i64, score_b: i64 },
    DuplicateParticipant { participant: PlayerKey },
    InvalidKFactor { k_factor: f64 },
}

impl SkipReason {
    /// Short label used for metrics and tables
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingParticipant { .. } => "missing_participant",
            SkipReason::InvalidScore { .. } => "invalid_score",
            SkipReason::DuplicateParticipant { .. } => "duplicate_participant",
            SkipReason::InvalidKFactor { .. } => "invalid_k_factor",
        }
    }

    pub fn into_error(self, fixture_id: FixtureId) -> RatingError {
        match self {
            SkipReason::MissingParticipant { missing } => RatingError::MissingParticipant {
                fixture_id,
                missing,
            },
            SkipReason::InvalidScore { score_a, score_b } => RatingError::InvalidScore {
                fixture_id,
                score_a,
                score_b,
            },
            SkipReason::DuplicateParticipant { participant } => {
                RatingError::DuplicateParticipant {
                    fixture_id,
                    participant,
                }
            }
            SkipReason::InvalidKFactor { k_factor } => RatingError::ConfigurationError {
                message: format!("Fixture {} has invalid K-factor {}", fixture_id, k_factor),
            },
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingParticipant { missing } => {
                write!(f, "unknown participants: {}", missing.join(", "))
            }
            SkipReason::InvalidScore { score_a, score_b } => {
                write!(f, "invalid score {}-{}", score_a, score_b)
            }
            SkipReason::DuplicateParticipant { participant } => {
                write!(f, "{} listed more than once", participant)
            }
            SkipReason::InvalidKFactor { k_factor } => write!(f, "invalid K-factor {}", k_factor),
        }
    }
}

/// Diagnostic for a fixture that produced no events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFixture {
    pub fixture_id: FixtureId,
    /// Position of the fixture in the input feed
    pub position: usize,
    pub reason: SkipReason,
}

/// Everything a recompute derives from its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    /// One entry per starting participant, including those who never played
    pub participants: BTreeMap<PlayerKey, SeasonParticipant>,
    /// Rating changes in fold order
    pub events: Vec<RatingChangeEvent>,
    pub skipped: Vec<SkippedFixture>,
    pub fixtures_processed: usize,
}

impl RecomputeOutcome {
    pub fn final_ratings(&self) -> RatingMap {
        self.participants
            .iter()
            .map(|(key, participant)| (key.clone(), participant.rating))
            .collect()
    }

    pub fn participant(&self, key: &str) -> Option<&SeasonParticipant> {
        self.participants.get(key)
    }

    /// A participant's events in fold order
    pub fn events_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a RatingChangeEvent> {
        self.events
            .iter()
            .filter(move |event| event.participant_key == key)
    }

    /// Verify that replaying every participant's deltas reproduces their rating
    pub fn replay_check(&self) -> Result<()> {
        let mut replayed: BTreeMap<&str, (f64, u32)> = self
            .participants
            .iter()
            .map(|(key, p)| (key.as_str(), (p.starting_rating, 0)))
            .collect();

        for event in &self.events {
            let entry = replayed
                .get_mut(event.participant_key.as_str())
                .ok_or_else(|| RatingError::InternalError {
                    message: format!("Event for unknown participant {}", event.participant_key),
                })?;
            entry.0 += event.delta;
            entry.1 += 1;
        }

        for (key, participant) in &self.participants {
            let (rating, games) = replayed[key.as_str()];
            if rating != participant.rating || games != participant.games_played {
                return Err(RatingError::InternalError {
                    message: format!(
                        "Replay mismatch for {}: replayed {} over {} games, stored {} over {}",
                        key, rating, games, participant.rating, participant.games_played
                    ),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Sequential Elo fold over one season's fixtures
#[derive(Debug, Clone)]
pub struct RatingEngine {
    config: RatingConfig,
    resolver: NameResolver,
}

impl RatingEngine {
    pub fn new(config: RatingConfig, resolver: NameResolver) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, resolver })
    }

    /// Engine for one season, with the season's settings over this config
    pub fn for_season(&self, settings: &SeasonSettings) -> Result<Self> {
        if settings.is_empty() {
            return Ok(self.clone());
        }
        Self::new(self.config.for_season(settings)?, self.resolver.clone())
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Recompute a season from raw starting ratings and fixtures
    ///
    /// Fixtures must already be sorted by timestamp, then sequence key. An
    /// out-of-order feed is rejected before any rating moves.
    pub fn recompute(
        &self,
        starting_ratings: &BTreeMap<String, f64>,
        fixtures: &[MatchFixture],
    ) -> Result<RecomputeOutcome> {
        check_ordering(fixtures)?;

        let starting = self.resolver.canonicalize_ratings(starting_ratings)?;
        if let Some((key, rating)) = starting.iter().find(|(_, r)| !r.is_finite()) {
            return Err(RatingError::ConfigurationError {
                message: format!("Starting rating for {} is not finite: {}", key, rating),
            }
            .into());
        }

        let mut participants: BTreeMap<PlayerKey, SeasonParticipant> = starting
            .into_iter()
            .map(|(key, rating)| (key.clone(), SeasonParticipant::new(key, rating)))
            .collect();

        info!(
            "Recomputing {} fixtures for {} participants (K={})",
            fixtures.len(),
            participants.len(),
            self.config.k_factor
        );

        let mut events = Vec::with_capacity(fixtures.len() * 4);
        let mut skipped = Vec::new();
        let mut fixtures_processed = 0;

        for (position, fixture) in fixtures.iter().enumerate() {
            let team_a = self.resolver.canonicalize_team(&fixture.team_a);
            let team_b = self.resolver.canonicalize_team(&fixture.team_b);

            if let Some(reason) = self.validate_fixture(fixture, &team_a, &team_b) {
                self.handle_skip(
                    fixture,
                    position,
                    reason,
                    self.config.invalid_fixture_policy == InvalidFixturePolicy::Abort,
                    &mut skipped,
                )?;
                continue;
            }

            let missing = missing_participants(&participants, &team_a, &team_b);
            if !missing.is_empty() {
                self.handle_skip(
                    fixture,
                    position,
                    SkipReason::MissingParticipant { missing },
                    self.config.missing_participant_policy == MissingParticipantPolicy::Abort,
                    &mut skipped,
                )?;
                continue;
            }

            self.apply_fixture(fixture, &team_a, &team_b, &mut participants, &mut events)?;
            fixtures_processed += 1;
        }

        info!(
            "Recompute finished: {} fixtures processed, {} skipped, {} events",
            fixtures_processed,
            skipped.len(),
            events.len()
        );

        Ok(RecomputeOutcome {
            participants,
            events,
            skipped,
            fixtures_processed,
        })
    }

    fn validate_fixture(
        &self,
        fixture: &MatchFixture,
        team_a: &[PlayerKey; 2],
        team_b: &[PlayerKey; 2],
    ) -> Option<SkipReason> {
        if fixture.score_a < 0 || fixture.score_b < 0 {
            return Some(SkipReason::InvalidScore {
                score_a: fixture.score_a,
                score_b: fixture.score_b,
            });
        }

        if let Some(k) = fixture.k_factor {
            if !k.is_finite() || k <= 0.0 {
                return Some(SkipReason::InvalidKFactor { k_factor: k });
            }
        }

        let slots: Vec<&PlayerKey> = team_a.iter().chain(team_b.iter()).collect();
        for (i, key) in slots.iter().enumerate() {
            if slots[i + 1..].contains(key) {
                return Some(SkipReason::DuplicateParticipant {
                    participant: (*key).clone(),
                });
            }
        }

        None
    }

    fn handle_skip(
        &self,
        fixture: &MatchFixture,
        position: usize,
        reason: SkipReason,
        abort: bool,
        skipped: &mut Vec<SkippedFixture>,
    ) -> Result<()> {
        if abort {
            return Err(reason.into_error(fixture.fixture_id.clone()).into());
        }

        warn!(
            "Skipping fixture {} at position {}: {}",
            fixture.fixture_id, position, reason
        );
        skipped.push(SkippedFixture {
            fixture_id: fixture.fixture_id.clone(),
            position,
            reason,
        });
        Ok(())
    }

    fn apply_fixture(
        &self,
        fixture: &MatchFixture,
        team_a: &[PlayerKey; 2],
        team_b: &[PlayerKey; 2],
        participants: &mut BTreeMap<PlayerKey, SeasonParticipant>,
        events: &mut Vec<RatingChangeEvent>,
    ) -> Result<()> {
        let avg_a = team_average([
            participant_mut(participants, fixture, &team_a[0])?.rating,
            participant_mut(participants, fixture, &team_a[1])?.rating,
        ]);
        let avg_b = team_average([
            participant_mut(participants, fixture, &team_b[0])?.rating,
            participant_mut(participants, fixture, &team_b[1])?.rating,
        ]);

        let expected_a = expected_score(avg_a, avg_b);
        let expected_b = 1.0 - expected_a;
        let (actual_a, actual_b) =
            actual_scores(fixture.score_a, fixture.score_b, self.config.draw_actual_score);
        let k_factor = fixture.k_factor.unwrap_or(self.config.k_factor);

        debug!(
            "Fixture {}: {} | avg {:.1} vs {:.1} | expected {:.3} | actual {:.3}",
            fixture.fixture_id, fixture, avg_a, avg_b, expected_a, actual_a
        );

        for side in [Side::A, Side::B] {
            let (team, expected, actual, opponent_avg) = match side {
                Side::A => (team_a, expected_a, actual_a, avg_b),
                Side::B => (team_b, expected_b, actual_b, avg_a),
            };
            let delta = rating_delta(actual, expected, k_factor);

            for key in team {
                let participant = participant_mut(participants, fixture, key)?;
                let old_rating = participant.rating;
                participant.apply_delta(delta);

                events.push(RatingChangeEvent {
                    participant_key: key.clone(),
                    fixture_id: fixture.fixture_id.clone(),
                    old_rating,
                    new_rating: participant.rating,
                    delta,
                    opponent_avg_rating: opponent_avg,
                    expected_score: expected,
                    actual_score: actual,
                    k_factor,
                    timestamp: fixture.timestamp,
                });
            }
        }

        Ok(())
    }
}

/// Look up a participant that `missing_participants` already cleared
fn participant_mut<'a>(
    participants: &'a mut BTreeMap<PlayerKey, SeasonParticipant>,
    fixture: &MatchFixture,
    key: &str,
) -> Result<&'a mut SeasonParticipant> {
    participants.get_mut(key).ok_or_else(|| {
        RatingError::InternalError {
            message: format!(
                "Fixture {} reached the fold with unknown participant {}",
                fixture.fixture_id, key
            ),
        }
        .into()
    })
}

/// Reject a feed that is not sorted by (timestamp, sequence key)
pub fn check_ordering(fixtures: &[MatchFixture]) -> Result<()> {
    for (index, pair) in fixtures.windows(2).enumerate() {
        if pair[1].sort_key() < pair[0].sort_key() {
            return Err(RatingError::OrderingViolation {
                index: index + 1,
                fixture_id: pair[1].fixture_id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn missing_participants(
    participants: &BTreeMap<PlayerKey, SeasonParticipant>,
    team_a: &[PlayerKey; 2],
    team_b: &[PlayerKey; 2],
) -> Vec<PlayerKey> {
    let mut missing: Vec<PlayerKey> = Vec::new();
    for key in team_a.iter().chain(team_b.iter()) {
        if !participants.contains_key(key) && !missing.contains(key) {
            missing.push(key.clone());
        }
    }
    missing
}
