//! Error taxonomy for the ingestion pipeline.
//!
//! Source-level failures (`FetchError`, `ParseError`) are isolated and
//! aggregated into the session error map; they never abort a session.
//! `ValidationError` is the single fatal case and only aborts the `rank`
//! call that received the malformed weights.

use std::time::Duration;
use thiserror::Error;

use crate::article::FetchStatus;

/// Network-level failure while retrieving a page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    /// Anti-automation response (403, 429).
    #[error("blocked by origin (status {status})")]
    Blocked { status: u16 },

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl FetchError {
    /// Whether another attempt is worth making.
    ///
    /// Timeouts, connection-level failures, 5xx and 429 are transient;
    /// every other client error is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Transport(_) => true,
            FetchError::Blocked { status } => *status == 429,
            FetchError::Status(code) => *code >= 500,
            FetchError::RetriesExhausted { .. } => false,
        }
    }

    /// Minimum delay the origin demands before the next attempt, if any.
    pub fn retry_floor(&self) -> Option<Duration> {
        match self {
            FetchError::Blocked { status: 429 } => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Page-status bucket a failure falls into, for `RawPage`-style outcome
/// reporting in logs and per-source breakdowns.
impl From<&FetchError> for FetchStatus {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::Timeout => FetchStatus::Timeout,
            FetchError::Blocked { .. } => FetchStatus::Blocked,
            FetchError::Status(_)
            | FetchError::Transport(_)
            | FetchError::RetriesExhausted { .. } => FetchStatus::Error,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Page structure was entirely unrecognized. Recorded as a per-source
/// warning, never propagated as a session failure.
#[derive(Debug, Clone, Error)]
#[error("unrecognized page structure at {url}: {detail}")]
pub struct ParseError {
    pub url: String,
    pub detail: String,
}

impl ParseError {
    pub fn new(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

/// Malformed ranking weights. A malformed request cannot produce a
/// meaningful ranking, so this aborts the calling `rank` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ranking weights: {0}")]
pub struct ValidationError(pub String);

/// Programming invariant violation. Should not occur in correct operation.
#[derive(Debug, Clone, Error)]
#[error("internal invariant violated: {0}")]
pub struct InternalError(pub String);

/// Aggregate failure for one source within a session.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("session timed out before this source completed")]
    SessionTimeout,
}
