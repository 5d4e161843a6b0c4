//! Remote store abstraction for Book Club Sync.
//!
//! The [`RemoteStore`] trait defines the four document operations the
//! reconciliation engine needs from the hosted table, enabling pluggable
//! backends (the Notion HTTP adapter, the in-memory store used in tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use crate::error::StoreError;
use crate::models::{BookKey, BookStats};

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One row of the remote table as returned by an adapter.
///
/// Field presence is not guaranteed: rows may have been written by hand or
/// by an older tool. The reader validates rows into
/// [`ExistingStats`](crate::models::ExistingStats) and rejects incomplete ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRow {
    /// Opaque handle assigned by the remote store.
    pub id: String,
    pub title: Option<String>,
    pub average: Option<f64>,
    pub favorites: Option<f64>,
}

/// Property payload for creating or updating a row.
#[derive(Debug, Clone, PartialEq)]
pub struct BookProperties {
    pub title: String,
    pub average: f64,
    pub favorites: u32,
}

impl BookProperties {
    pub fn new(key: &BookKey, stats: &BookStats) -> Self {
        Self {
            title: key.as_str().to_string(),
            average: stats.average,
            favorites: stats.favorites,
        }
    }
}

/// Abstract remote table backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query`](RemoteStore::query) | List every live row in the table |
/// | [`create`](RemoteStore::create) | Insert a new row |
/// | [`update`](RemoteStore::update) | Overwrite the properties of a row |
/// | [`archive`](RemoteStore::archive) | Archive (soft-delete) a row |
///
/// Every failure is a [`StoreError`], classified as transient or not; the
/// caller decides whether to retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Return the complete set of non-archived rows.
    ///
    /// Adapters backed by a paginated API follow cursors internally.
    async fn query(&self) -> StoreResult<Vec<RemoteRow>>;

    /// Create a row with the given properties.
    async fn create(&self, properties: &BookProperties) -> StoreResult<RemoteRow>;

    /// Replace the properties of the row identified by `id`.
    async fn update(&self, id: &str, properties: &BookProperties) -> StoreResult<RemoteRow>;

    /// Archive the row identified by `id`.
    async fn archive(&self, id: &str) -> StoreResult<RemoteRow>;
}
