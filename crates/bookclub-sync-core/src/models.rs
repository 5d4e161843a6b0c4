//! Core data models used throughout Book Club Sync.
//!
//! These types represent the ratings, per-book aggregates, and statistics
//! that flow from ingestion through reconciliation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::normalize::normalize;

/// Lowest accepted star rating.
pub const MIN_STARS: f64 = 0.0;
/// Highest accepted star rating; also the value that counts as a favorite.
pub const MAX_STARS: f64 = 5.0;

/// Canonical identity of a book: the normalized title.
///
/// Every constructor, deserialization included, runs the raw title through
/// [`normalize`], so two keys are equal iff their raw titles name the same
/// book.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct BookKey(String);

impl BookKey {
    pub fn new(raw_title: &str) -> Self {
        Self(normalize(raw_title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for BookKey {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

/// Raw row produced by the input reader before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub title: String,
    pub rater: String,
    pub value: f64,
}

impl RawRecord {
    pub fn new(title: impl Into<String>, rater: impl Into<String>, value: f64) -> Self {
        Self {
            title: title.into(),
            rater: rater.into(),
            value,
        }
    }
}

/// One member's star rating of one book.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingEntry {
    rater: String,
    value: f64,
}

impl RatingEntry {
    /// Build a rating, rejecting values outside `[0, 5]` (and NaN).
    pub fn new(rater: impl Into<String>, value: f64) -> Result<Self> {
        if !(MIN_STARS..=MAX_STARS).contains(&value) {
            return Err(SyncError::InvalidRatingValue { value });
        }
        Ok(Self {
            rater: rater.into(),
            value,
        })
    }

    pub fn rater(&self) -> &str {
        &self.rater
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_favorite(&self) -> bool {
        self.value == MAX_STARS
    }

    pub fn is_least_favorite(&self) -> bool {
        self.value == MIN_STARS
    }
}

/// All ratings of a single book, one per rater.
///
/// A later rating by the same rater replaces the earlier one; no history
/// is kept.
#[derive(Debug, Clone, Default)]
pub struct BookAggregate {
    ratings: BTreeMap<String, RatingEntry>,
}

impl BookAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the rating for `entry.rater()`.
    pub fn rate(&mut self, entry: RatingEntry) {
        self.ratings.insert(entry.rater.clone(), entry);
    }

    pub fn rating_by(&self, rater: &str) -> Option<&RatingEntry> {
        self.ratings.get(rater)
    }

    pub fn ratings(&self) -> impl Iterator<Item = &RatingEntry> {
        self.ratings.values()
    }

    pub fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    /// Mean star value, or `None` if the book has no ratings.
    pub fn average(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let sum: f64 = self.ratings.values().map(|r| r.value).sum();
        Some(sum / self.ratings.len() as f64)
    }

    /// Number of five-star ratings.
    pub fn favorite_count(&self) -> u32 {
        self.ratings.values().filter(|r| r.is_favorite()).count() as u32
    }

    /// Number of zero-star ratings.
    pub fn least_favorite_count(&self) -> u32 {
        self.ratings.values().filter(|r| r.is_least_favorite()).count() as u32
    }

    /// Statistics in their persisted form, or `None` if the book has no ratings.
    pub fn stats(&self) -> Option<BookStats> {
        self.average().map(|avg| BookStats::new(avg, self.favorite_count()))
    }
}

/// Freshly computed statistics for one book.
///
/// The average is always held at the canonical one-decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookStats {
    pub average: f64,
    pub favorites: u32,
}

impl BookStats {
    /// Build stats, rounding `average` to one decimal place.
    pub fn new(average: f64, favorites: u32) -> Self {
        Self {
            average: round_tenths(average),
            favorites,
        }
    }

    /// Whether persisted values match these stats at canonical precision.
    pub fn matches(&self, existing: &ExistingStats) -> bool {
        tenths(self.average) == tenths(existing.average) && self.favorites == existing.favorites
    }
}

/// Statistics already persisted in the remote table for one book.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingStats {
    /// Opaque handle assigned by the remote store.
    pub remote_id: String,
    pub average: f64,
    pub favorites: u32,
}

/// Round to one decimal place, halves away from zero.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Integer count of tenths, used for exact comparison of averages.
fn tenths(value: f64) -> i64 {
    (value * 10.0).round() as i64
}
