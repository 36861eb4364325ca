//! Command-line entry point for the season rating service
//!
//! Loads season files, recomputes ratings and prints league tables,
//! movement reports, match predictions and seeding comparisons.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use season_elo::config::AppConfig;
use season_elo::feed::{parse_seeding, SeasonFile, StaticMatchFeed};
use season_elo::ledger::{InMemoryHistoryLedger, InMemorySeasonRatingStorage};
use season_elo::metrics::MetricsCollector;
use season_elo::rating::{compare_scenarios, predict, Improvement, NameResolver, ResultAggregator};
use season_elo::service::{RecomputeReport, RecomputeService};
use season_elo::types::{PlayerKey, RatingMap};
use season_elo::utils::round_rating;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Season ELO - doubles rating recomputation
#[derive(Parser)]
#[command(
    name = "season-elo",
    version,
    about = "Deterministic ELO recomputation for doubles seasons",
    long_about = "season-elo replays a season's recorded doubles fixtures in order over a \
                 starting-rating table, producing final ratings and an audit trail of every \
                 rating change."
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        global = true,
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true, help = "Enable debug mode with verbose logging")]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Recompute one or more seasons and print their tables
    Recompute {
        #[arg(short, long, value_name = "FILE", required = true)]
        season: Vec<PathBuf>,

        /// Abort on any unknown participant or invalid fixture
        #[arg(long)]
        strict: bool,

        /// Rows of the league table to print
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,
    },

    /// Movement report for a season
    Report {
        #[arg(short, long, value_name = "FILE")]
        season: PathBuf,

        #[arg(long, value_name = "N", default_value_t = 5)]
        most_improved: usize,

        #[arg(long, value_name = "N", default_value_t = 5)]
        most_declined: usize,

        /// Print one participant's rating history
        #[arg(long, value_name = "NAME")]
        player: Option<String>,
    },

    /// Predict a proposed fixture from end-of-season ratings
    Predict {
        #[arg(short, long, value_name = "FILE")]
        season: PathBuf,

        #[arg(long, value_name = "A,B")]
        team_a: String,

        #[arg(long, value_name = "C,D")]
        team_b: String,
    },

    /// Compare final tables under the season's seeds and an alternative seeding sheet
    Compare {
        #[arg(short, long, value_name = "FILE")]
        season: PathBuf,

        #[arg(long, value_name = "CSV")]
        alt_seeds: PathBuf,
    },

    /// Parse a seeding sheet and print the starting table
    Seed {
        #[arg(short, long, value_name = "CSV")]
        file: PathBuf,
    },
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Command::Recompute { strict: true, .. } = args.command {
        config.rating.strict_missing_participants = true;
        config.rating.abort_on_invalid_fixture = true;
    }

    Ok(config)
}

fn build_service(config: &AppConfig, seasons: Vec<SeasonFile>) -> Result<RecomputeService> {
    let mut feed = StaticMatchFeed::new();
    for season in seasons {
        feed.insert_season(season);
    }

    RecomputeService::from_config(
        config,
        Arc::new(feed),
        Arc::new(InMemoryHistoryLedger::new()),
        Arc::new(InMemorySeasonRatingStorage::new()),
        Arc::new(MetricsCollector::new()?),
    )
}

/// Load a single season and recompute it
async fn recompute_one(config: &AppConfig, path: &Path) -> Result<(RecomputeService, String)> {
    let season = SeasonFile::load(path)?;
    let season_id = season.season_id.clone();
    let service = build_service(config, vec![season])?;
    service.recompute(&season_id).await?;
    Ok((service, season_id))
}

fn print_table(aggregator: &ResultAggregator, top: Option<usize>) {
    let ranked = aggregator.rank_by_rating();
    let rows = top.unwrap_or(ranked.len());

    println!("{:>4}  {:<24} {:>7} {:>6}  {}", "#", "Player", "Rating", "Games", "Tier");
    for row in ranked.iter().take(rows) {
        println!(
            "{:>4}  {:<24} {:>7} {:>6}  {}",
            row.rank,
            row.key,
            round_rating(row.rating),
            row.games_played,
            row.tier
        );
    }
}

fn print_report(report: &RecomputeReport) {
    println!(
        "Season {} (run {}): {} fixtures applied, {} skipped, {} rating changes",
        report.season_id,
        report.run_id,
        report.fixtures_processed,
        report.skipped.len(),
        report.events_written
    );
    for skipped in &report.skipped {
        println!(
            "  skipped {} (position {}): {}",
            skipped.fixture_id, skipped.position, skipped.reason
        );
    }
}

fn print_movement(title: &str, rows: &[Improvement]) {
    println!("{}", title);
    for row in rows {
        println!(
            "  {:<24} {:>7} -> {:>7} ({:+}) over {} games",
            row.key,
            round_rating(row.starting_rating),
            round_rating(row.current_rating),
            round_rating(row.delta),
            row.games_played
        );
    }
}

fn parse_team(raw: &str) -> Result<[PlayerKey; 2]> {
    let names: Vec<&str> = raw.split(',').map(str::trim).collect();
    match names.as_slice() {
        [first, second] if !first.is_empty() && !second.is_empty() => {
            Ok([first.to_string(), second.to_string()])
        }
        _ => Err(anyhow!("Expected two comma-separated names, got '{}'", raw)),
    }
}

async fn run_recompute(
    config: &AppConfig,
    paths: &[PathBuf],
    top: Option<usize>,
    show_metrics: bool,
) -> Result<()> {
    let seasons = paths
        .iter()
        .map(|path| SeasonFile::load(path))
        .collect::<Result<Vec<_>>>()?;
    let season_ids: Vec<String> = seasons.iter().map(|s| s.season_id.clone()).collect();

    let service = build_service(config, seasons)?;
    let results = service.recompute_all(&season_ids).await;

    let mut failures = 0;
    for (season_id, result) in &results {
        match result {
            Ok(report) => {
                print_report(report);
                print_table(&service.aggregator(season_id).await?, top);
                println!();
            }
            Err(e) => {
                error!("Season {} failed: {:#}", season_id, e);
                failures += 1;
            }
        }
    }

    if show_metrics {
        print!("{}", service.metrics().gather_text()?);
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} seasons failed", failures, results.len()));
    }
    Ok(())
}

async fn run_report(
    config: &AppConfig,
    path: &Path,
    most_improved: usize,
    most_declined: usize,
    player: Option<&str>,
) -> Result<()> {
    let (service, season_id) = recompute_one(config, path).await?;
    let aggregator = service.aggregator(&season_id).await?;

    print_movement("Most improved", &aggregator.most_improved(most_improved));
    print_movement("Most declined", &aggregator.most_declined(most_declined));

    if let Some(player) = player {
        let player = service.engine().resolver().player(player);
        let events = service
            .ledger()
            .participant_events(&season_id, &player.id)
            .await?;
        if events.is_empty() {
            warn!("{} has no rating history in season {}", player.id, season_id);
        }
        println!("History for {} ({})", player.display_name, player.id);
        for event in events {
            println!(
                "  {:<12} {:>7} -> {:>7} ({:+.1}) vs avg {:>5}, expected {:.2}, actual {:.2}",
                event.fixture_id,
                round_rating(event.old_rating),
                round_rating(event.new_rating),
                event.delta,
                round_rating(event.opponent_avg_rating),
                event.expected_score,
                event.actual_score
            );
        }
    }

    Ok(())
}

async fn run_predict(config: &AppConfig, path: &Path, team_a: &str, team_b: &str) -> Result<()> {
    let team_a = parse_team(team_a)?;
    let team_b = parse_team(team_b)?;
    let (service, season_id) = recompute_one(config, path).await?;

    let ratings: RatingMap = service
        .storage()
        .get_season_ratings(&season_id)?
        .map(|stored| {
            stored
                .participants
                .into_iter()
                .map(|(key, participant)| (key, participant.rating))
                .collect()
        })
        .unwrap_or_default();

    let engine = service.season_engine(&season_id).await?;
    let prediction = predict(
        &team_a,
        &team_b,
        &ratings,
        engine.resolver(),
        engine.config().default_starting_rating,
    );
    let (win_a, win_b) = prediction.win_percentages();

    println!(
        "{} & {} (avg {}) vs {} & {} (avg {})",
        prediction.team_a[0],
        prediction.team_a[1],
        round_rating(prediction.team_a_avg_rating),
        prediction.team_b[0],
        prediction.team_b[1],
        round_rating(prediction.team_b_avg_rating)
    );
    println!("Win probability: {}% / {}%", win_a, win_b);
    println!(
        "Rating difference {} - {}",
        round_rating(prediction.rating_difference),
        prediction.balance
    );

    Ok(())
}

async fn run_compare(config: &AppConfig, path: &Path, alt_seeds: &Path) -> Result<()> {
    let season = SeasonFile::load(path)?;
    let text = std::fs::read_to_string(alt_seeds)
        .with_context(|| format!("Failed to read seeding sheet {}", alt_seeds.display()))?;

    let rating_config = config.rating.to_rating_config().for_season(&season.settings)?;
    let resolver = NameResolver::new(&config.aliases);
    let sheet = parse_seeding(&text, &resolver, &rating_config);
    for line in &sheet.rejected {
        warn!("Ignoring seeding line {}: {}", line.line_number, line.content);
    }

    let mut alternative = season.with_starting_ratings(sheet.ratings);
    alternative.season_id = format!("{}-alt", season.season_id);
    let ids = vec![season.season_id.clone(), alternative.season_id.clone()];

    let service = build_service(config, vec![season, alternative])?;
    for (season_id, result) in service.recompute_all(&ids).await {
        result.with_context(|| format!("Season {} failed", season_id))?;
    }

    let baseline = service.aggregator(&ids[0]).await?;
    let scenario = service.aggregator(&ids[1]).await?;

    println!(
        "{:<24} {:>6} {:>7} {:>6} {:>7} {:>6} {:>7}",
        "Player", "Rank", "Rating", "Alt", "Rating", "dRank", "dRating"
    );
    for row in compare_scenarios(&baseline, &scenario) {
        println!(
            "{:<24} {:>6} {:>7} {:>6} {:>7} {:>+6} {:>+7}",
            row.key,
            row.rank_a,
            round_rating(row.rating_a),
            row.rank_b,
            round_rating(row.rating_b),
            row.rank_diff,
            round_rating(row.rating_diff)
        );
    }

    Ok(())
}

fn run_seed(config: &AppConfig, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read seeding sheet {}", file.display()))?;
    let resolver = NameResolver::new(&config.aliases);
    let sheet = parse_seeding(&text, &resolver, &config.rating.to_rating_config());

    for (key, rating) in &sheet.ratings {
        println!("{:<24} {:>6}", key, round_rating(*rating));
    }
    for key in &sheet.defaulted {
        warn!("{} had an unreadable rating, seeded at the default", key);
    }
    for line in &sheet.rejected {
        warn!("Rejected line {}: {}", line.line_number, line.content);
    }

    info!(
        "Seeded {} participants ({} rejected lines)",
        sheet.ratings.len(),
        sheet.rejected.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "{} {} starting (K={}, strict={})",
        config.service.name,
        season_elo::VERSION,
        config.rating.k_factor,
        config.rating.strict_missing_participants
    );

    let result = match &args.command {
        Command::Recompute {
            season,
            top,
            metrics,
            ..
        } => run_recompute(&config, season, *top, *metrics).await,
        Command::Report {
            season,
            most_improved,
            most_declined,
            player,
        } => {
            run_report(
                &config,
                season,
                *most_improved,
                *most_declined,
                player.as_deref(),
            )
            .await
        }
        Command::Predict {
            season,
            team_a,
            team_b,
        } => run_predict(&config, season, team_a, team_b).await,
        Command::Compare { season, alt_seeds } => run_compare(&config, season, alt_seeds).await,
        Command::Seed { file } => run_seed(&config, file),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
