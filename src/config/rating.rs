//! Rating engine configuration

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};

/// What the engine does with a fixture naming an unknown participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingParticipantPolicy {
    /// Skip the fixture, report it, keep folding
    #[default]
    Skip,
    /// Fail the whole run
    Abort,
}

/// What the engine does with a fixture that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidFixturePolicy {
    #[default]
    Skip,
    Abort,
}

/// Parameters of a single recompute fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub default_starting_rating: f64,
    /// Actual score credited to both sides when no games were recorded
    pub draw_actual_score: f64,
    pub missing_participant_policy: MissingParticipantPolicy,
    pub invalid_fixture_policy: InvalidFixturePolicy,
    /// Lower bound applied to seeded ratings
    pub rating_floor: f64,
    /// Upper bound applied to seeded ratings
    pub rating_ceiling: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            default_starting_rating: 1200.0,
            draw_actual_score: 0.5,
            missing_participant_policy: MissingParticipantPolicy::Skip,
            invalid_fixture_policy: InvalidFixturePolicy::Skip,
            rating_floor: 500.0,
            rating_ceiling: 3000.0,
        }
    }
}

/// Per-season Elo parameters layered over the global [`RatingConfig`]
///
/// A fixture's own K-factor still wins over the season's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_starting_rating: Option<f64>,
}

impl SeasonSettings {
    pub fn is_empty(&self) -> bool {
        self.k_factor.is_none() && self.default_starting_rating.is_none()
    }
}

impl RatingConfig {
    /// Configuration that fails the run on any bad fixture
    pub fn strict() -> Self {
        Self {
            missing_participant_policy: MissingParticipantPolicy::Abort,
            invalid_fixture_policy: InvalidFixturePolicy::Abort,
            ..Self::default()
        }
    }

    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    /// Effective configuration for a season with its own settings
    pub fn for_season(&self, settings: &SeasonSettings) -> Result<Self> {
        let config = Self {
            k_factor: settings.k_factor.unwrap_or(self.k_factor),
            default_starting_rating: settings
                .default_starting_rating
                .unwrap_or(self.default_starting_rating),
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(RatingError::ConfigurationError {
                message: "K-factor must be a positive number".to_string(),
            }
            .into());
        }

        if !self.default_starting_rating.is_finite() {
            return Err(RatingError::ConfigurationError {
                message: "Default starting rating must be finite".to_string(),
            }
            .into());
        }

        if !(0.0..=1.0).contains(&self.draw_actual_score) {
            return Err(RatingError::ConfigurationError {
                message: "Draw actual score must be between 0 and 1".to_string(),
            }
            .into());
        }

        if self.rating_floor >= self.rating_ceiling {
            return Err(RatingError::ConfigurationError {
                message: "Rating floor must be below rating ceiling".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
