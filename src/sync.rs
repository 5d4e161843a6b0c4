//! Sync pipeline orchestration.
//!
//! Coordinates the full flow: CSV → statistics → existing remote state →
//! reconciliation plan → remote mutations → report. The building blocks
//! are public so they can be driven against any [`RemoteStore`]:
//!
//! - [`fetch_existing`] reads and validates the remote snapshot.
//! - [`execute`] applies a [`ReconciliationPlan`]: updates first, then
//!   inserts, each call wrapped in the [`RetryPolicy`]. A failed item is
//!   recorded and the batch continues.
//! - [`archive_all`] archives every remote row, bypassing planning.
//!
//! [`run_sync`], [`run_stats`], and [`run_wipe`] are the CLI entry points.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use bookclub_sync_core::aggregate::RatingLedger;
use bookclub_sync_core::reconcile::{self, ReconciliationPlan};
use bookclub_sync_core::store::{BookProperties, RemoteStore};
use bookclub_sync_core::{BookKey, ExistingStats, SyncError};
use tracing::{error, info};

use crate::config::{Config, Credentials};
use crate::csv_reader;
use crate::display;
use crate::notion::NotionStore;
use crate::progress::{SyncPhase, SyncProgressEvent, SyncProgressReporter};
use crate::retry::RetryPolicy;

/// Kind of remote mutation applied to one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Insert,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Update => f.write_str("update"),
            Action::Insert => f.write_str("insert"),
        }
    }
}

/// Result of one attempted mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub book: BookKey,
    pub action: Action,
    /// `None` on success, otherwise the final error message.
    pub error: Option<String>,
}

/// Summary of one plan execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub updated: usize,
    pub inserted: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Remote books missing from the input batch. Left untouched.
    pub untracked: usize,
    /// Every attempted mutation, updates first, in execution order.
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Summary of [`archive_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WipeReport {
    pub archived: usize,
    pub failed: usize,
}

/// Read the remote table into the existing-state map.
///
/// The query is retried under `retry`. A malformed row aborts the read:
/// treating it as absent would create a duplicate row on insert.
pub async fn fetch_existing(
    store: &dyn RemoteStore,
    retry: &RetryPolicy,
) -> Result<BTreeMap<BookKey, ExistingStats>, SyncError> {
    let rows = retry.run("query", move || store.query()).await?;
    info!(rows = rows.len(), "fetched remote rows");
    reconcile::existing_state(&rows)
}

/// Apply a plan to the remote store.
///
/// Updates run before inserts, each set in key order. Every item is
/// attempted regardless of earlier failures.
///
/// Inserts are not idempotent under retry: if a create times out after the
/// remote accepted it, the retry writes a second row for the same book.
/// The next run keeps the first row and logs the duplicate.
pub async fn execute(
    store: &dyn RemoteStore,
    plan: &ReconciliationPlan,
    retry: &RetryPolicy,
    progress: &dyn SyncProgressReporter,
) -> SyncReport {
    let mut report = SyncReport {
        unchanged: plan.unchanged.len(),
        untracked: plan.untracked.len(),
        ..SyncReport::default()
    };
    let total = plan.mutation_count() as u64;
    let mut n = 0u64;

    for (key, update) in &plan.updates {
        let props = BookProperties::new(key, &update.stats);
        let props = &props;
        let id = update.remote_id.as_str();
        let op = format!("update {}", key);
        let result = retry.run(&op, move || store.update(id, props)).await;

        record(&mut report, key, Action::Update, result.err());
        n += 1;
        progress.report(SyncProgressEvent::Mutating { n, total });
    }

    for (key, stats) in &plan.inserts {
        let props = BookProperties::new(key, stats);
        let props = &props;
        let op = format!("insert {}", key);
        let result = retry.run(&op, move || store.create(props)).await;

        record(&mut report, key, Action::Insert, result.err());
        n += 1;
        progress.report(SyncProgressEvent::Mutating { n, total });
    }

    report
}

fn record(
    report: &mut SyncReport,
    key: &BookKey,
    action: Action,
    err: Option<bookclub_sync_core::StoreError>,
) {
    match &err {
        None => match action {
            Action::Update => report.updated += 1,
            Action::Insert => report.inserted += 1,
        },
        Some(e) => {
            error!(book = %key, %action, error = %e, "remote mutation failed");
            report.failed += 1;
        }
    }
    report.outcomes.push(ItemOutcome {
        book: key.clone(),
        action,
        error: err.map(|e| e.to_string()),
    });
}

/// Archive every row in the remote table.
///
/// Independent of planning: nothing is diffed. Each archive call is
/// retried; a failed row is counted and the rest are still attempted.
pub async fn archive_all(
    store: &dyn RemoteStore,
    retry: &RetryPolicy,
    progress: &dyn SyncProgressReporter,
) -> Result<WipeReport, SyncError> {
    let rows = retry.run("query", move || store.query()).await?;
    let total = rows.len() as u64;
    let mut report = WipeReport::default();

    for (i, row) in rows.iter().enumerate() {
        let id = row.id.as_str();
        let op = format!("archive {}", id);
        match retry.run(&op, move || store.archive(id)).await {
            Ok(_) => report.archived += 1,
            Err(e) => {
                error!(remote_id = %id, error = %e, "archive failed");
                report.failed += 1;
            }
        }
        progress.report(SyncProgressEvent::Mutating {
            n: i as u64 + 1,
            total,
        });
    }

    Ok(report)
}

/// Compute and print per-book statistics without touching the remote table.
pub fn run_stats(ratings_file: &Path, progress: &dyn SyncProgressReporter) -> Result<()> {
    let ledger = load_ledger(ratings_file, progress)?;
    display::print_stats(&ledger);
    Ok(())
}

/// Run the full pipeline against the configured Notion database.
pub async fn run_sync(
    config: &Config,
    ratings_file: &Path,
    dry_run: bool,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport> {
    let ledger = load_ledger(ratings_file, progress)?;
    display::print_stats(&ledger);
    println!();

    let credentials = Credentials::from_env()?;
    info!(token = %credentials.token_hint(), database = %credentials.database_id, "connecting to Notion");
    let store = NotionStore::new(&config.notion, &credentials)?;
    let retry = RetryPolicy::from_config(&config.retry);

    sync_ledger(&store, &ledger, &retry, dry_run, progress).await
}

/// Reconcile an already-built ledger against `store` and print the report.
///
/// Aborts before any mutation if the existing state cannot be read.
pub async fn sync_ledger(
    store: &dyn RemoteStore,
    ledger: &RatingLedger,
    retry: &RetryPolicy,
    dry_run: bool,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncReport> {
    let new_state = ledger.stats();

    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::FetchingExisting,
    });
    let existing = fetch_existing(store, retry)
        .await
        .context("Failed to read existing ratings from the remote table")?;

    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::Reconciling,
    });
    let plan = reconcile::plan(&new_state, &existing);
    info!(
        updates = plan.updates.len(),
        inserts = plan.inserts.len(),
        unchanged = plan.unchanged.len(),
        untracked = plan.untracked.len(),
        "reconciliation plan"
    );

    if dry_run {
        display::print_plan(&plan);
        return Ok(SyncReport {
            unchanged: plan.unchanged.len(),
            untracked: plan.untracked.len(),
            ..SyncReport::default()
        });
    }

    let report = execute(store, &plan, retry, progress).await;

    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::Reporting,
    });
    display::print_report(&report);
    Ok(report)
}

/// Archive every row of the configured Notion database.
pub async fn run_wipe(config: &Config, progress: &dyn SyncProgressReporter) -> Result<WipeReport> {
    let credentials = Credentials::from_env()?;
    let store = NotionStore::new(&config.notion, &credentials)?;
    let retry = RetryPolicy::from_config(&config.retry);

    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::Archiving,
    });
    let report = archive_all(&store, &retry, progress)
        .await
        .context("Failed to list rows to archive")?;

    println!("wipe");
    println!("  archived: {}", report.archived);
    println!("  failed:   {}", report.failed);
    Ok(report)
}

fn load_ledger(ratings_file: &Path, progress: &dyn SyncProgressReporter) -> Result<RatingLedger> {
    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::ReadingInput,
    });
    let records = csv_reader::read_records(ratings_file)?;
    info!(rows = records.len(), file = %ratings_file.display(), "loaded ratings");

    progress.report(SyncProgressEvent::Phase {
        phase: SyncPhase::ComputingStats,
    });
    let ledger = RatingLedger::from_records(&records)
        .with_context(|| format!("Invalid rating in {}", ratings_file.display()))?;
    info!(books = ledger.book_count(), "aggregated book statistics");
    Ok(ledger)
}
