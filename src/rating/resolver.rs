//! Participant name resolution
//!
//! Source data labels the same player inconsistently ("Jon" vs "Jon Best",
//! trailing whitespace). Every identifier is passed through one
//! [`NameResolver`] before any rating lookup, in fixtures and in starting
//! tables alike.

use crate::error::{RatingError, Result};
use crate::types::{Player, PlayerKey, StartingRatings};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    aliases: HashMap<String, PlayerKey>,
}

impl NameResolver {
    /// Build a resolver from a raw alias table; alias labels are trimmed
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(alias, canonical)| (alias.trim().to_string(), canonical.trim().to_string()))
            .collect();
        Self { aliases }
    }

    /// Resolver that only trims whitespace
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Canonical key for a raw label
    pub fn canonicalize(&self, raw: &str) -> PlayerKey {
        let trimmed = raw.trim();
        match self.aliases.get(trimmed) {
            Some(canonical) => canonical.clone(),
            None => trimmed.to_string(),
        }
    }

    /// Player identity for a raw label, keeping the label as display name
    pub fn player(&self, raw: &str) -> Player {
        Player {
            id: self.canonicalize(raw),
            display_name: raw.trim().to_string(),
        }
    }

    /// Canonical keys for both slots of a team
    pub fn canonicalize_team(&self, team: &[PlayerKey; 2]) -> [PlayerKey; 2] {
        [self.canonicalize(&team[0]), self.canonicalize(&team[1])]
    }

    /// Canonicalize every key of a starting-rating table
    ///
    /// Two labels that resolve to the same key must agree on the rating.
    pub fn canonicalize_ratings<'a, I>(&self, ratings: I) -> Result<StartingRatings>
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        let mut resolved = StartingRatings::new();
        for (raw, rating) in ratings {
            let key = self.canonicalize(raw);
            match resolved.get(&key) {
                Some(existing) if existing != rating => {
                    return Err(RatingError::ConflictingStartingRating {
                        participant: key,
                        first: *existing,
                        second: *rating,
                    }
                    .into());
                }
                Some(_) => {}
                None => {
                    resolved.insert(key, *rating);
                }
            }
        }
        Ok(resolved)
    }
}
