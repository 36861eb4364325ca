//! Seeding sheets
//!
//! A seeding sheet is plain text with one `name,rating` pair per line. Blank
//! lines and `#` comments are ignored.

use crate::config::rating::RatingConfig;
use crate::rating::resolver::NameResolver;
use crate::types::{PlayerKey, StartingRatings};
use crate::utils::clamp_rating;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A line that could not be read as a seed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// 1-based
    pub line_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedingSheet {
    pub ratings: StartingRatings,
    /// Entries whose rating was unreadable and fell back to the default
    pub defaulted: Vec<PlayerKey>,
    pub rejected: Vec<RejectedLine>,
}

/// Parse a seeding sheet into a starting-rating table
///
/// Ratings are read as whole numbers and clamped to the configured floor and
/// ceiling. A later line for the same participant replaces an earlier one.
pub fn parse_seeding(text: &str, resolver: &NameResolver, config: &RatingConfig) -> SeedingSheet {
    let mut sheet = SeedingSheet::default();

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((name, value)) = trimmed.split_once(',') else {
            sheet.rejected.push(RejectedLine {
                line_number: index + 1,
                content: line.to_string(),
            });
            continue;
        };

        let key = resolver.canonicalize(name);
        if key.is_empty() {
            sheet.rejected.push(RejectedLine {
                line_number: index + 1,
                content: line.to_string(),
            });
            continue;
        }

        let rating = match parse_whole_rating(value) {
            Some(rating) => rating,
            None => {
                sheet.defaulted.push(key.clone());
                config.default_starting_rating
            }
        };
        let rating = clamp_rating(rating, config.rating_floor, config.rating_ceiling);

        if sheet.ratings.insert(key.clone(), rating).is_some() {
            warn!("Seeding sheet lists {} more than once, keeping line {}", key, index + 1);
        }
    }

    sheet
}

fn parse_whole_rating(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Ok(whole) = value.parse::<i64>() {
        return Some(whole as f64);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|rating| rating.is_finite())
        .map(f64::trunc)
}
