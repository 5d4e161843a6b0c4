//! # Book Club Sync
//!
//! Aggregates book club ratings from a CSV file and upserts per-book
//! statistics (average rating, favorite count) into a Notion database.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │   CSV    │──▶│  Aggregate  │──▶│  Reconcile   │──▶│  Notion  │
//! │ ratings  │   │ avg + favs  │   │ plan+execute │   │ database │
//! └──────────┘   └─────────────┘   └──────▲───────┘   └────┬─────┘
//!                                         │   existing rows │
//!                                         └─────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. [`csv_reader`] reads `book title, member name, stars` rows.
//! 2. The core ledger normalizes names and computes per-book statistics.
//! 3. [`sync::fetch_existing`] reads the remote table into the existing state.
//! 4. The core planner partitions books into unchanged / updates / inserts.
//! 5. [`sync::execute`] applies updates, then inserts, each call wrapped in
//!    a [`retry::RetryPolicy`]. Failed items are reported, never fatal.
//!
//! ## Quick Start
//!
//! ```bash
//! export NOTION_TOKEN=secret_...
//! export NOTION_DATABASE_ID=...
//! bookclub stats --ratings-file data/ratings.csv   # local only
//! bookclub sync --dry-run                          # show the plan
//! bookclub sync                                    # apply it
//! bookclub wipe                                    # archive every row
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment credentials |
//! | [`csv_reader`] | Ratings CSV parsing |
//! | [`notion`] | Notion REST adapter implementing `RemoteStore` |
//! | [`retry`] | Bounded fixed-delay retry policy |
//! | [`sync`] | Pipeline orchestration, plan execution, wipe |
//! | [`progress`] | Progress reporting on stderr |
//! | [`display`] | Stats table and report output |

pub mod config;
pub mod csv_reader;
pub mod display;
pub mod notion;
pub mod progress;
pub mod retry;
pub mod sync;

pub use bookclub_sync_core::{aggregate, models, normalize, reconcile, store};
pub use bookclub_sync_core::{StoreError, SyncError};
