//! Configuration management for the season-elo service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the recompute engine.

pub mod app;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, RatingSettings, ServiceSettings};
pub use rating::{InvalidFixturePolicy, MissingParticipantPolicy, RatingConfig, SeasonSettings};
