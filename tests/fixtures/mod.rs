//! Test fixtures and collaborator doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use season_elo::config::SeasonSettings;
use season_elo::error::{RatingError, Result};
use season_elo::feed::SeasonFile;
use season_elo::ledger::{HistoryLedger, InMemoryHistoryLedger};
use season_elo::types::{MatchFixture, RatingChangeEvent};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tolerance for ratings reached through different arithmetic paths
pub const RATING_EPSILON: f64 = 1e-9;

pub fn ratings_within_tolerance(rating1: f64, rating2: f64, tolerance: f64) -> bool {
    (rating1 - rating2).abs() <= tolerance
}

/// A fixture played `round` weeks after the season opener
pub fn fixture(
    id: &str,
    team_a: [&str; 2],
    team_b: [&str; 2],
    score: (i64, i64),
    round: i64,
) -> MatchFixture {
    let opener = Utc.with_ymd_and_hms(2025, 9, 1, 19, 0, 0).unwrap();
    MatchFixture {
        fixture_id: id.to_string(),
        team_a: [team_a[0].to_string(), team_a[1].to_string()],
        team_b: [team_b[0].to_string(), team_b[1].to_string()],
        score_a: score.0,
        score_b: score.1,
        timestamp: opener + Duration::weeks(round),
        sequence_key: id.to_string(),
        k_factor: None,
    }
}

pub fn ratings(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(name, rating)| (name.to_string(), *rating))
        .collect()
}

/// A small club season with a mix of seeds, aliases and one bad fixture
pub fn club_season(season_id: &str) -> SeasonFile {
    SeasonFile {
        season_id: season_id.to_string(),
        starting_ratings: ratings(&[
            ("Sid Abraham", 1400.0),
            ("Jon Best", 1100.0),
            ("Liz", 1200.0),
            ("Bev", 1050.0),
            ("Dave", 1300.0),
            ("Ann", 1150.0),
            ("Oxy", 1250.0),
        ]),
        fixtures: vec![
            fixture("r1-c1", ["Sid Abraham ", "Jon"], ["Liz", "Bev"], (6, 4), 0),
            fixture("r1-c2", ["Dave", "Ann"], ["Oxy", "Liz"], (3, 7), 0),
            fixture("r2-c1", ["Jon", "Liz"], ["Dave", "Bev"], (5, 5), 1),
            fixture("r2-c2", ["Sid Abraham", "Ann"], ["Oxy", "Guest"], (8, 2), 1),
            fixture("r3-c1", ["Bev", "Oxy"], ["Sid Abraham", "Dave"], (7, 3), 2),
            fixture("r3-c2", ["Ann", "Jon"], ["Liz", "Dave"], (0, 0), 2),
        ],
        settings: SeasonSettings::default(),
    }
}

pub fn club_aliases() -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    aliases.insert("Jon".to_string(), "Jon Best".to_string());
    aliases
}

/// Round-robin season with `players` participants and `rounds` fixtures
pub fn generated_season(season_id: &str, players: usize, rounds: usize) -> SeasonFile {
    let names: Vec<String> = (0..players).map(|i| format!("player{:03}", i)).collect();
    let starting_ratings = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), 1000.0 + (i % 9) as f64 * 50.0))
        .collect();

    let fixtures = (0..rounds)
        .map(|round| {
            let pick = |offset: usize| names[(round * 3 + offset * 7) % players].as_str();
            fixture(
                &format!("{}-{:05}", season_id, round),
                [pick(0), pick(1)],
                [pick(2), pick(3)],
                ((round % 9) as i64, ((round * 5) % 7) as i64),
                round as i64,
            )
        })
        .collect();

    SeasonFile {
        season_id: season_id.to_string(),
        starting_ratings,
        fixtures,
        settings: SeasonSettings::default(),
    }
}

/// Ledger that fails every write after the first `allowed_writes`
#[derive(Debug, Default)]
pub struct FlakyHistoryLedger {
    inner: InMemoryHistoryLedger,
    allowed_writes: usize,
    writes: AtomicUsize,
}

impl FlakyHistoryLedger {
    pub fn new(allowed_writes: usize) -> Self {
        Self {
            inner: InMemoryHistoryLedger::new(),
            allowed_writes,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistoryLedger for FlakyHistoryLedger {
    async fn replace_season(&self, season_id: &str, events: Vec<RatingChangeEvent>) -> Result<()> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.allowed_writes {
            return Err(RatingError::InternalError {
                message: "ledger unavailable".to_string(),
            }
            .into());
        }
        self.inner.replace_season(season_id, events).await
    }

    async fn season_events(&self, season_id: &str) -> Result<Option<Vec<RatingChangeEvent>>> {
        self.inner.season_events(season_id).await
    }

    async fn participant_events(
        &self,
        season_id: &str,
        key: &str,
    ) -> Result<Vec<RatingChangeEvent>> {
        self.inner.participant_events(season_id, key).await
    }

    async fn fixture_impact(
        &self,
        season_id: &str,
        fixture_id: &str,
        key: &str,
    ) -> Result<Option<RatingChangeEvent>> {
        self.inner.fixture_impact(season_id, fixture_id, key).await
    }

    async fn clear_season(&self, season_id: &str) -> Result<bool> {
        self.inner.clear_season(season_id).await
    }

    async fn event_count(&self, season_id: &str) -> Result<usize> {
        self.inner.event_count(season_id).await
    }
}
