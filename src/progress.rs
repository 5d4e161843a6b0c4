//! Sync progress reporting.
//!
//! Reports observable progress during `bookclub sync` and `bookclub wipe`
//! so users see which phase is running and how many remote mutations are
//! left. Progress is emitted on **stderr** so stdout remains parseable for
//! scripts.
//!
//! The engine never writes progress itself; callers pass a
//! [`SyncProgressReporter`] handle into it.

use std::io::Write;

use clap::ValueEnum;

/// Phase of the sync pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncPhase {
    ReadingInput,
    ComputingStats,
    FetchingExisting,
    Reconciling,
    Archiving,
    Reporting,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::ReadingInput => "reading input",
            SyncPhase::ComputingStats => "computing stats",
            SyncPhase::FetchingExisting => "fetching existing",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Archiving => "archiving",
            SyncPhase::Reporting => "reporting",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncProgressEvent {
    /// A new phase started.
    Phase { phase: SyncPhase },
    /// Remote mutations: n processed out of total.
    Mutating { n: u64, total: u64 },
}

/// Receives progress events. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the sync engine.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync  applying  3 / 12 changes".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Phase { phase } => format!("sync  {}...\n", phase.as_str()),
            SyncProgressEvent::Mutating { n, total } => format!(
                "sync  applying  {} / {} changes\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let ts = chrono::Utc::now().to_rfc3339();
        let obj = match &event {
            SyncProgressEvent::Phase { phase } => serde_json::json!({
                "event": "progress",
                "phase": phase.as_str(),
                "ts": ts,
            }),
            SyncProgressEvent::Mutating { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "applying",
                "n": n,
                "total": total,
                "ts": ts,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
