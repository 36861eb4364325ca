//! Main application configuration
//!
//! This module defines the primary configuration structures for the season-elo
//! service, including environment variable loading, TOML files and validation.

use crate::config::rating::{InvalidFixturePolicy, MissingParticipantPolicy, RatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingSettings,
    /// Raw label -> canonical key
    pub aliases: BTreeMap<String, String>,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Maximum number of seasons recomputed at once
    pub max_concurrent_seasons: usize,
}

/// Rating settings as they appear in configuration sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    pub k_factor: u32,
    pub default_starting_rating: f64,
    pub draw_actual_score: f64,
    /// Abort the run when a fixture names an unknown participant
    pub strict_missing_participants: bool,
    /// Abort the run when a fixture has an invalid score
    pub abort_on_invalid_fixture: bool,
    pub rating_floor: f64,
    pub rating_ceiling: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "season-elo".to_string(),
            log_level: "info".to_string(),
            max_concurrent_seasons: 4,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 32,
            default_starting_rating: 1200.0,
            draw_actual_score: 0.5,
            strict_missing_participants: false,
            abort_on_invalid_fixture: false,
            rating_floor: 500.0,
            rating_ceiling: 3000.0,
        }
    }
}

impl RatingSettings {
    /// Engine configuration derived from these settings
    pub fn to_rating_config(&self) -> RatingConfig {
        RatingConfig {
            k_factor: f64::from(self.k_factor),
            default_starting_rating: self.default_starting_rating,
            draw_actual_score: self.draw_actual_score,
            missing_participant_policy: if self.strict_missing_participants {
                MissingParticipantPolicy::Abort
            } else {
                MissingParticipantPolicy::Skip
            },
            invalid_fixture_policy: if self.abort_on_invalid_fixture {
                InvalidFixturePolicy::Abort
            } else {
                InvalidFixturePolicy::Skip
            },
            rating_floor: self.rating_floor,
            rating_ceiling: self.rating_ceiling,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(max) = env::var("ELO_MAX_CONCURRENT_SEASONS") {
            self.service.max_concurrent_seasons = max
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_MAX_CONCURRENT_SEASONS value: {}", max))?;
        }

        // Rating settings
        if let Ok(k) = env::var("ELO_K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k))?;
        }
        if let Ok(default_rating) = env::var("ELO_DEFAULT_RATING") {
            self.rating.default_starting_rating = default_rating
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_DEFAULT_RATING value: {}", default_rating))?;
        }
        if let Ok(draw) = env::var("ELO_DRAW_SCORE") {
            self.rating.draw_actual_score = draw
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_DRAW_SCORE value: {}", draw))?;
        }
        if let Ok(strict) = env::var("ELO_STRICT_MISSING") {
            self.rating.strict_missing_participants = strict
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_STRICT_MISSING value: {}", strict))?;
        }
        if let Ok(abort) = env::var("ELO_ABORT_INVALID") {
            self.rating.abort_on_invalid_fixture = abort
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_ABORT_INVALID value: {}", abort))?;
        }
        if let Ok(floor) = env::var("ELO_RATING_FLOOR") {
            self.rating.rating_floor = floor
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_RATING_FLOOR value: {}", floor))?;
        }
        if let Ok(ceiling) = env::var("ELO_RATING_CEILING") {
            self.rating.rating_ceiling = ceiling
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_RATING_CEILING value: {}", ceiling))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.max_concurrent_seasons == 0 {
        return Err(anyhow!("Max concurrent seasons must be greater than 0"));
    }

    if config.rating.k_factor == 0 {
        return Err(anyhow!("K-factor must be greater than 0"));
    }

    // Alias targets must not themselves be aliased, or resolution would depend on order
    for (alias, target) in &config.aliases {
        if alias.trim().is_empty() || target.trim().is_empty() {
            return Err(anyhow!("Alias entries cannot be empty"));
        }
        if config.aliases.contains_key(target.trim()) && alias.trim() != target.trim() {
            return Err(anyhow!(
                "Alias target '{}' is itself an alias; chains are not allowed",
                target
            ));
        }
    }

    config.rating.to_rating_config().validate()?;

    Ok(())
}
