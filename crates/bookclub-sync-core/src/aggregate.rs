//! Rating aggregation.
//!
//! [`RatingLedger`] is a flat, relational view of every rating in a batch:
//! books are keyed by [`BookKey`], and each book holds at most one rating
//! per normalized member name. There are no back-references from members
//! to books; "which books did this member rate" is a filter over the
//! ledger.
//!
//! [`compute`] is the one-shot entry point used by the sync pipeline.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{BookAggregate, BookKey, BookStats, RatingEntry, RawRecord};
use crate::normalize::normalize;

/// All ratings from one ingestion batch, keyed by book.
#[derive(Debug, Default)]
pub struct RatingLedger {
    books: BTreeMap<BookKey, BookAggregate>,
}

impl RatingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from raw records, failing on the first out-of-range value.
    pub fn from_records<'a, I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let mut ledger = Self::new();
        for record in records {
            ledger.record(record)?;
        }
        Ok(ledger)
    }

    /// Normalize and record a single raw rating.
    ///
    /// A later rating by the same member for the same book replaces the
    /// earlier one.
    pub fn record(&mut self, record: &RawRecord) -> Result<()> {
        let entry = RatingEntry::new(normalize(&record.rater), record.value)?;
        self.books
            .entry(BookKey::new(&record.title))
            .or_default()
            .rate(entry);
        Ok(())
    }

    pub fn book(&self, key: &BookKey) -> Option<&BookAggregate> {
        self.books.get(key)
    }

    pub fn books(&self) -> impl Iterator<Item = (&BookKey, &BookAggregate)> {
        self.books.iter()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Books the given member has rated, with the member's rating.
    ///
    /// `member` is normalized before lookup.
    pub fn books_rated_by(&self, member: &str) -> Vec<(&BookKey, &RatingEntry)> {
        let member = normalize(member);
        self.books
            .iter()
            .filter_map(|(key, book)| book.rating_by(&member).map(|r| (key, r)))
            .collect()
    }

    /// Members who rated the given book, in name order.
    pub fn raters_of(&self, key: &BookKey) -> Vec<&str> {
        self.books
            .get(key)
            .map(|book| book.ratings().map(|r| r.rater()).collect())
            .unwrap_or_default()
    }

    /// Per-book statistics for every book with at least one rating.
    pub fn stats(&self) -> BTreeMap<BookKey, BookStats> {
        self.books
            .iter()
            .filter_map(|(key, book)| book.stats().map(|s| (key.clone(), s)))
            .collect()
    }
}

/// Compute per-book statistics from a batch of raw records.
///
/// Averages are rounded to one decimal place.
pub fn compute<'a, I>(records: I) -> Result<BTreeMap<BookKey, BookStats>>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    Ok(RatingLedger::from_records(records)?.stats())
}
