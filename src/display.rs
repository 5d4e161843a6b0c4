//! Human-readable output for `bookclub` commands.
//!
//! Everything here prints to stdout; progress and logs go to stderr.

use bookclub_sync_core::aggregate::RatingLedger;
use bookclub_sync_core::reconcile::ReconciliationPlan;

use crate::sync::SyncReport;

/// Total line width the stats table aims to fit in.
const MAX_LINE_WIDTH: usize = 120;
/// Columns reserved for the rating and favorites columns.
const STATS_COLUMNS_WIDTH: usize = 25;

/// Print the per-book statistics table.
pub fn print_stats(ledger: &RatingLedger) {
    for line in stats_lines(ledger) {
        println!("{}", line);
    }
}

/// Format the per-book statistics table, one line per book.
pub fn stats_lines(ledger: &RatingLedger) -> Vec<String> {
    let stats = ledger.stats();
    if stats.is_empty() {
        return vec!["  (no ratings)".to_string()];
    }

    let longest = stats
        .keys()
        .map(|k| k.as_str().chars().count())
        .max()
        .unwrap_or(0);
    let title_width = longest.min(MAX_LINE_WIDTH - STATS_COLUMNS_WIDTH);

    let mut lines = Vec::with_capacity(stats.len() + 2);
    lines.push(format!(
        "  {:<width$}  {:>7}  {:>9}",
        "BOOK",
        "RATING",
        "FAVORITES",
        width = title_width
    ));
    lines.push(format!("  {}", "-".repeat(title_width + 20)));

    for (key, s) in &stats {
        let title: String = key.as_str().chars().take(title_width).collect();
        lines.push(format!(
            "  {:<width$}  {:>7.1}  {:>9}",
            title,
            s.average,
            s.favorites,
            width = title_width
        ));
    }

    lines
}

/// Print what a sync would do without doing it.
pub fn print_plan(plan: &ReconciliationPlan) {
    println!("sync (dry-run)");
    for (key, update) in &plan.updates {
        println!(
            "  update  {}  -> {:.1} stars, {} favorites",
            key, update.stats.average, update.stats.favorites
        );
    }
    for (key, stats) in &plan.inserts {
        println!(
            "  insert  {}  -> {:.1} stars, {} favorites",
            key, stats.average, stats.favorites
        );
    }
    println!("  unchanged: {}", plan.unchanged.len());
    println!("  untracked: {}", plan.untracked.len());
}

/// Print the final sync summary, listing every failed item.
pub fn print_report(report: &SyncReport) {
    println!("sync");
    println!("  unchanged: {}", report.unchanged);
    println!("  updated:   {}", report.updated);
    println!("  inserted:  {}", report.inserted);
    println!("  failed:    {}", report.failed);
    if report.untracked > 0 {
        println!("  untracked: {} (left in place)", report.untracked);
    }
    for failure in report.failures() {
        println!(
            "  ! {} {}: {}",
            failure.action,
            failure.book,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("{}", if report.is_success() { "ok" } else { "completed with failures" });
}
