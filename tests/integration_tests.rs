//! Integration tests for the season-elo recompute service
//!
//! These tests drive the whole pipeline together:
//! - Feed, engine, ledger and storage over a full season
//! - Idempotent recomputes
//! - Rollback when a persistence write fails
//! - Concurrent recomputation of independent seasons

mod fixtures;

use futures::future::join_all;
use mockall::{mock, Sequence};
use season_elo::config::{AppConfig, RatingConfig};
use season_elo::error::{RatingError, Result};
use season_elo::feed::{SeasonFile, StaticMatchFeed};
use season_elo::ledger::{
    HistoryLedger, InMemoryHistoryLedger, InMemorySeasonRatingStorage, SeasonRatingStorage,
    SeasonRatings,
};
use season_elo::metrics::MetricsCollector;
use season_elo::rating::{compare_scenarios, expected_score, rating_delta, NameResolver, RatingEngine};
use season_elo::service::RecomputeService;
use season_elo::types::{SeasonId, SeasonParticipant};
use season_elo::utils::generate_run_id;
use std::collections::BTreeMap;
use std::sync::Arc;

use fixtures::{
    club_aliases, club_season, fixture, generated_season, ratings, ratings_within_tolerance,
    FlakyHistoryLedger, RATING_EPSILON,
};

mock! {
    pub Storage {}

    impl SeasonRatingStorage for Storage {
        fn replace_season_ratings(&self, ratings: SeasonRatings) -> Result<()>;
        fn get_season_ratings(&self, season_id: &str) -> Result<Option<SeasonRatings>>;
        fn get_rating(&self, season_id: &str, key: &str) -> Result<Option<SeasonParticipant>>;
        fn remove_season(&self, season_id: &str) -> Result<bool>;
        fn season_ids(&self) -> Result<Vec<SeasonId>>;
    }
}

fn club_config() -> AppConfig {
    AppConfig {
        aliases: club_aliases(),
        ..AppConfig::default()
    }
}

/// Service over in-memory collaborators holding the given seasons
fn create_test_service(config: &AppConfig, seasons: Vec<SeasonFile>) -> RecomputeService {
    let mut feed = StaticMatchFeed::new();
    for season in seasons {
        feed.insert_season(season);
    }

    RecomputeService::from_config(
        config,
        Arc::new(feed),
        Arc::new(InMemoryHistoryLedger::new()),
        Arc::new(InMemorySeasonRatingStorage::new()),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_season_lifecycle() {
    let service = create_test_service(&club_config(), vec![club_season("autumn")]);

    let report = service.recompute("autumn").await.unwrap();

    // r2-c2 names a guest who was never seeded
    assert_eq!(report.fixtures_processed, 5);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].fixture_id, "r2-c2");
    assert_eq!(report.skipped[0].reason.label(), "missing_participant");
    assert_eq!(report.events_written, 20);
    assert_eq!(report.participants, 7);

    // Aliased and padded labels land on the canonical keys
    let storage = service.storage();
    let jon = storage.get_rating("autumn", "Jon Best").unwrap().unwrap();
    assert_eq!(jon.games_played, 3);
    let sid = storage.get_rating("autumn", "Sid Abraham").unwrap().unwrap();
    assert_eq!(sid.games_played, 2);
    assert!(storage.get_rating("autumn", "Jon").unwrap().is_none());
    assert!(storage.get_rating("autumn", "Guest").unwrap().is_none());

    // First fixture: 1250 average against 1125, won 6-4
    let expected = expected_score(1250.0, 1125.0);
    let delta = rating_delta(0.6, expected, 32.0);
    let impact = service
        .ledger()
        .fixture_impact("autumn", "r1-c1", "Sid Abraham")
        .await
        .unwrap()
        .unwrap();
    assert!(ratings_within_tolerance(impact.delta, delta, RATING_EPSILON));
    assert!(impact.delta < 0.0);
    assert_eq!(impact.opponent_avg_rating, 1125.0);

    // Rating is conserved across the season
    let starting_total: f64 = club_season("autumn").starting_ratings.values().sum();
    let final_total: f64 = report.final_ratings.values().sum();
    assert!((starting_total - final_total).abs() < 1e-6);

    let table = service.aggregator("autumn").await.unwrap().rank_by_rating();
    assert_eq!(table.len(), 7);
    assert_eq!(table[0].rank, 1);
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let service = create_test_service(&club_config(), vec![club_season("autumn")]);

    let first = service.recompute("autumn").await.unwrap();
    let first_events = service.ledger().season_events("autumn").await.unwrap();

    let second = service.recompute("autumn").await.unwrap();
    let second_events = service.ledger().season_events("autumn").await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.final_ratings, second.final_ratings);
    assert_eq!(first_events, second_events);
    assert_eq!(service.ledger().event_count("autumn").await.unwrap(), 20);
}

#[tokio::test]
async fn test_engine_output_replays_exactly() {
    let config = club_config();
    let engine = RatingEngine::new(
        config.rating.to_rating_config(),
        NameResolver::new(&config.aliases),
    )
    .unwrap();
    let season = club_season("autumn");

    let outcome = engine
        .recompute(&season.starting_ratings, &season.fixtures)
        .unwrap();
    assert!(outcome.replay_check().is_ok());

    // Liz never gets an event from the skipped fixture
    let liz_fixtures: Vec<&str> = outcome
        .events_for("Liz")
        .map(|event| event.fixture_id.as_str())
        .collect();
    assert_eq!(liz_fixtures, vec!["r1-c1", "r1-c2", "r2-c1", "r3-c2"]);
}

#[tokio::test]
async fn test_ledger_failure_keeps_previous_state() {
    let config = club_config();
    let ledger = Arc::new(FlakyHistoryLedger::new(1));
    let storage = Arc::new(InMemorySeasonRatingStorage::new());

    let first_service = RecomputeService::from_config(
        &config,
        Arc::new(StaticMatchFeed::from_season(club_season("autumn"))),
        ledger.clone(),
        storage.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();
    let first = first_service.recompute("autumn").await.unwrap();

    // Same season with one more result recorded
    let mut extended = club_season("autumn");
    extended
        .fixtures
        .push(fixture("r4-c1", ["Liz", "Bev"], ["Ann", "Oxy"], (9, 1), 3));
    let second_service = RecomputeService::from_config(
        &config,
        Arc::new(StaticMatchFeed::from_season(extended)),
        ledger.clone(),
        storage.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();

    let err = second_service.recompute("autumn").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RatingError>(),
        Some(RatingError::LedgerWriteFailed { .. })
    ));

    let stored = storage.get_season_ratings("autumn").unwrap().unwrap();
    assert_eq!(stored.run_id, first.run_id);
    let stored_ratings: BTreeMap<String, f64> = stored
        .participants
        .iter()
        .map(|(key, p)| (key.clone(), p.rating))
        .collect();
    assert_eq!(stored_ratings, first.final_ratings);
    assert_eq!(ledger.event_count("autumn").await.unwrap(), 20);
    assert!(ledger.write_attempts() >= 2);
}

#[tokio::test]
async fn test_storage_failure_restores_prior_season() {
    let prior_run = generate_run_id();
    let prior = SeasonRatings::new("autumn".to_string(), prior_run, BTreeMap::new());

    let mut storage = MockStorage::new();
    let snapshot = prior.clone();
    storage
        .expect_get_season_ratings()
        .returning(move |_| Ok(Some(snapshot.clone())));
    storage
        .expect_replace_season_ratings()
        .withf(move |ratings| ratings.run_id != prior_run)
        .times(1)
        .returning(|_| {
            Err(RatingError::InternalError {
                message: "write timed out".to_string(),
            }
            .into())
        });
    storage
        .expect_replace_season_ratings()
        .withf(move |ratings| ratings.run_id == prior_run)
        .times(1)
        .returning(|_| Ok(()));

    let ledger = Arc::new(InMemoryHistoryLedger::new());
    let service = RecomputeService::from_config(
        &club_config(),
        Arc::new(StaticMatchFeed::from_season(club_season("autumn"))),
        ledger.clone(),
        Arc::new(storage),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();

    let err = service.recompute("autumn").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RatingError>(),
        Some(RatingError::StorageWriteFailed { .. })
    ));

    // The season had no ledger before the run, so none is left behind
    assert!(ledger.season_events("autumn").await.unwrap().is_none());
    assert_eq!(
        service
            .metrics()
            .runs()
            .recompute_runs_total
            .with_label_values(&["failed"])
            .get(),
        1
    );
}

#[tokio::test]
async fn test_failed_restore_reports_rollback_failure() {
    let config = club_config();
    // Allows the first run's write and the second run's write, not the restore
    let ledger = Arc::new(FlakyHistoryLedger::new(2));

    let stored: Arc<std::sync::Mutex<Option<SeasonRatings>>> = Arc::default();
    let mut storage = MockStorage::new();
    let reads = stored.clone();
    storage
        .expect_get_season_ratings()
        .returning(move |_| Ok(reads.lock().unwrap().clone()));

    let mut seq = Sequence::new();
    let writes = stored.clone();
    storage
        .expect_replace_season_ratings()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |ratings| {
            *writes.lock().unwrap() = Some(ratings);
            Ok(())
        });
    storage
        .expect_replace_season_ratings()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Err(RatingError::InternalError {
                message: "disk full".to_string(),
            }
            .into())
        });
    storage
        .expect_replace_season_ratings()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let storage = Arc::new(storage);

    let first_service = RecomputeService::from_config(
        &config,
        Arc::new(StaticMatchFeed::from_season(club_season("autumn"))),
        ledger.clone(),
        storage.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();
    let first = first_service.recompute("autumn").await.unwrap();
    assert_eq!(first.events_written, 20);

    let mut extended = club_season("autumn");
    extended
        .fixtures
        .push(fixture("r4-c1", ["Liz", "Bev"], ["Ann", "Oxy"], (9, 1), 3));
    let second_service = RecomputeService::from_config(
        &config,
        Arc::new(StaticMatchFeed::from_season(extended)),
        ledger.clone(),
        storage.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .unwrap();

    let err = second_service.recompute("autumn").await.unwrap_err();
    match err.downcast_ref::<RatingError>() {
        Some(RatingError::RollbackFailed {
            cause,
            rollback_error,
        }) => {
            assert!(cause.contains("disk full"));
            assert!(rollback_error.contains("ledger unavailable"));
        }
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
    assert_eq!(ledger.write_attempts(), 3);
}

#[tokio::test]
async fn test_seasons_fold_with_their_own_k_factor() {
    let mut league = generated_season("league", 12, 40);
    league.settings.k_factor = Some(16.0);
    let mut cup = generated_season("cup", 12, 40);
    cup.fixtures[0].k_factor = Some(8.0);

    let service = create_test_service(&AppConfig::default(), vec![league.clone(), cup.clone()])
        .with_max_concurrent_seasons(2);
    let results = service
        .recompute_all(&["league".to_string(), "cup".to_string()])
        .await;

    let league_events = service.ledger().season_events("league").await.unwrap().unwrap();
    assert!(league_events.iter().all(|event| event.k_factor == 16.0));

    let cup_events = service.ledger().season_events("cup").await.unwrap().unwrap();
    assert!(cup_events[..4].iter().all(|event| event.k_factor == 8.0));
    assert!(cup_events[4..].iter().all(|event| event.k_factor == 32.0));

    let league_engine = RatingEngine::new(
        RatingConfig::default().with_k_factor(16.0),
        NameResolver::identity(),
    )
    .unwrap();
    let expected = league_engine
        .recompute(&league.starting_ratings, &league.fixtures)
        .unwrap();
    assert_eq!(
        results["league"].as_ref().unwrap().final_ratings,
        expected.final_ratings()
    );
    assert!(results["cup"].is_ok());
}

#[tokio::test]
async fn test_strict_mode_writes_nothing() {
    let mut config = club_config();
    config.rating.strict_missing_participants = true;
    let service = create_test_service(&config, vec![club_season("autumn")]);

    let err = service.recompute("autumn").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RatingError>(),
        Some(RatingError::MissingParticipant { fixture_id, missing })
            if fixture_id == "r2-c2" && missing == &vec!["Guest".to_string()]
    ));

    assert!(service.storage().get_season_ratings("autumn").unwrap().is_none());
    assert!(service.ledger().season_events("autumn").await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_seasons_match_sequential_folds() {
    let config = AppConfig::default();
    let seasons: Vec<SeasonFile> = (0..4)
        .map(|i| generated_season(&format!("league-{}", i), 24, 200 + i * 50))
        .collect();
    let season_ids: Vec<String> = seasons.iter().map(|s| s.season_id.clone()).collect();

    let service =
        create_test_service(&config, seasons.clone()).with_max_concurrent_seasons(2);
    let results = service.recompute_all(&season_ids).await;
    assert_eq!(results.len(), 4);

    let engine = RatingEngine::new(RatingConfig::default(), NameResolver::identity()).unwrap();
    for season in &seasons {
        let sequential = engine
            .recompute(&season.starting_ratings, &season.fixtures)
            .unwrap();
        let report = results[&season.season_id].as_ref().unwrap();
        assert_eq!(report.final_ratings, sequential.final_ratings());
        assert_eq!(report.events_written, sequential.events.len());
    }
}

#[tokio::test]
async fn test_parallel_services_do_not_interfere() {
    let config = AppConfig::default();
    let services: Vec<(RecomputeService, String)> = (0..6)
        .map(|i| {
            let season = generated_season(&format!("cup-{}", i), 30, 120);
            let season_id = season.season_id.clone();
            (create_test_service(&config, vec![season]), season_id)
        })
        .collect();

    let runs = join_all(
        services
            .iter()
            .map(|(service, season_id)| service.recompute(season_id)),
    )
    .await;

    for (result, (service, season_id)) in runs.into_iter().zip(&services) {
        let report = result.unwrap();
        assert_eq!(&report.season_id, season_id);
        assert_eq!(
            service.ledger().event_count(season_id).await.unwrap(),
            report.events_written
        );
    }
}

#[tokio::test]
async fn test_seeding_scenarios_compare() {
    let base = club_season("autumn");
    let mut flat = base.with_starting_ratings(ratings(&[
        ("Sid Abraham", 1200.0),
        ("Jon Best", 1200.0),
        ("Liz", 1200.0),
        ("Bev", 1200.0),
        ("Dave", 1200.0),
        ("Ann", 1200.0),
        ("Oxy", 1200.0),
    ]));
    flat.season_id = "autumn-flat".to_string();

    let service = create_test_service(&club_config(), vec![base, flat]);
    let results = service
        .recompute_all(&["autumn".to_string(), "autumn-flat".to_string()])
        .await;
    assert!(results.values().all(|r| r.is_ok()));

    let seeded = service.aggregator("autumn").await.unwrap();
    let flat = service.aggregator("autumn-flat").await.unwrap();
    let rows = compare_scenarios(&seeded, &flat);

    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].rank_a, 1);
    for row in &rows {
        assert_eq!(row.rank_diff, row.rank_b as i64 - row.rank_a as i64);
        assert!((row.rating_diff - (row.rating_b - row.rating_a)).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_config_file_drives_engine() {
    let path = std::env::temp_dir().join(format!("season-elo-{}.toml", generate_run_id()));
    std::fs::write(
        &path,
        r#"
            [rating]
            k_factor = 16

            [aliases]
            "Jon" = "Jon Best"
        "#,
    )
    .unwrap();

    let config = AppConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.rating.k_factor, 16);

    let service = create_test_service(&config, vec![club_season("autumn")]);
    service.recompute("autumn").await.unwrap();

    let impact = service
        .ledger()
        .fixture_impact("autumn", "r1-c1", "Jon Best")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(impact.k_factor, 16.0);
}
