//! Error taxonomy for ingestion, aggregation, and remote synchronization.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised by the sync pipeline.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A row of the input source could not be parsed.
    #[error("Invalid input format at line {line}: {reason}")]
    InvalidInputFormat { line: u64, reason: String },

    /// A numeric rating fell outside the closed interval [0, 5].
    #[error("Invalid rating value {value}: rating must be between 0 and 5")]
    InvalidRatingValue { value: f64 },

    /// A row fetched from the remote table is missing a required field.
    #[error("Malformed remote record {id}: {reason}")]
    MalformedRemoteRecord { id: String, reason: String },

    /// The remote store rejected or failed a call.
    #[error(transparent)]
    Remote(#[from] StoreError),
}

/// Errors returned by a [`RemoteStore`](crate::store::RemoteStore) adapter.
///
/// Adapters classify every failure as either transient (worth retrying)
/// or a protocol error (bad request, auth failure) that must surface
/// immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network failure, timeout, rate limit, or server-side error.
    #[error("Remote unavailable: {0}")]
    Transient(String),

    /// Non-retryable rejection. `status` is the HTTP status when known.
    #[error("Remote protocol error ({}): {body}", status.map(|s| s.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Protocol { status: Option<u16>, body: String },
}

impl StoreError {
    /// Whether a retry policy should attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// HTTP status of a protocol error, if the adapter had one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Protocol { status, .. } => *status,
            StoreError::Transient(_) => None,
        }
    }
}
