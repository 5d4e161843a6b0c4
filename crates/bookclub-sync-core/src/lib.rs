//! # Book Club Sync Core
//!
//! Shared, I/O-free logic for Book Club Sync: rating models, name
//! normalization, per-book aggregation, reconciliation planning, and the
//! remote store abstraction.
//!
//! This crate contains no tokio, HTTP, or filesystem dependencies. The
//! application crate supplies the CSV reader, the Notion adapter, and the
//! retrying executor that drives a [`reconcile::ReconciliationPlan`] against
//! a [`store::RemoteStore`].

pub mod aggregate;
pub mod error;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod store;

pub use error::{StoreError, SyncError};
pub use models::{BookKey, BookStats, ExistingStats, RatingEntry, RawRecord};
