//! Season files on disk
//!
//! A season file holds one season's starting ratings and fixtures, as JSON or
//! TOML depending on the file extension.

use crate::config::rating::SeasonSettings;
use crate::error::{RatingError, Result};
use crate::types::{MatchFixture, SeasonId};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFile {
    pub season_id: SeasonId,
    /// Raw label -> rating
    #[serde(default)]
    pub starting_ratings: BTreeMap<String, f64>,
    #[serde(default)]
    pub fixtures: Vec<MatchFixture>,
    /// Season K-factor and default rating, when they differ from the config
    #[serde(default, skip_serializing_if = "SeasonSettings::is_empty")]
    pub settings: SeasonSettings,
}

impl SeasonFile {
    /// Load a season from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            _ => {
                return Err(RatingError::ConfigurationError {
                    message: format!(
                        "Unsupported season file {}: expected .json or .toml",
                        path.display()
                    ),
                }
                .into())
            }
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read season file {}", path.display()))?;
        parse(&contents).with_context(|| format!("Failed to parse season file {}", path.display()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Copy of this season with a different starting table
    pub fn with_starting_ratings(&self, starting_ratings: BTreeMap<String, f64>) -> Self {
        Self {
            starting_ratings,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_SEASON: &str = r#"{
        "season_id": "autumn-2025",
        "starting_ratings": { "Jon Best": 1100.0, "Bev": 1050.0, "Liz": 1200.0, "Sid": 1400.0 },
        "fixtures": [
            {
                "fixture_id": "r1-c1",
                "team_a": ["Jon", "Bev"],
                "team_b": ["Liz", "Sid"],
                "score_a": 6,
                "score_b": 4,
                "timestamp": "2025-09-01T19:00:00Z",
                "sequence_key": "001"
            }
        ]
    }"#;

    #[test]
    fn test_parse_json_season() {
        let season = SeasonFile::from_json_str(JSON_SEASON).unwrap();
        assert_eq!(season.season_id, "autumn-2025");
        assert_eq!(season.starting_ratings.len(), 4);
        assert_eq!(season.fixtures.len(), 1);
        assert_eq!(season.fixtures[0].team_a[0], "Jon");
        assert!(season.fixtures[0].k_factor.is_none());
        assert!(season.settings.is_empty());
    }

    #[test]
    fn test_parse_toml_season() {
        let toml_text = r#"
            season_id = "spring"

            [starting_ratings]
            "Liz" = 1200.0
            "Sid" = 1400.0

            [settings]
            k_factor = 24.0
            default_starting_rating = 1000.0

            [[fixtures]]
            fixture_id = "f1"
            team_a = ["Liz", "Sid"]
            team_b = ["Ann", "Dan"]
            score_a = 3
            score_b = 7
            timestamp = "2025-03-02T18:30:00Z"
            sequence_key = "a"
            k_factor = 16.0
        "#;
        let season = SeasonFile::from_toml_str(toml_text).unwrap();
        assert_eq!(season.season_id, "spring");
        assert_eq!(season.fixtures[0].score_b, 7);
        assert_eq!(season.fixtures[0].k_factor, Some(16.0));
        assert_eq!(season.settings.k_factor, Some(24.0));
        assert_eq!(season.settings.default_starting_rating, Some(1000.0));
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        let bad = JSON_SEASON.replace("\"score_a\": 6", "\"score_a\": \"six\"");
        assert!(SeasonFile::from_json_str(&bad).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = SeasonFile::load(Path::new("season.yaml")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = SeasonFile::load(Path::new("/nonexistent/season.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/season.json"));
    }
}
