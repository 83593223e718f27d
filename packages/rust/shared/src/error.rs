//! Error types for sitebrief.
//!
//! Library crates use [`SiteBriefError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-page and per-block failures are contained at their component
//! boundary and recorded in run metrics; only seed failure, configuration
//! problems, or an empty result surface to the caller.

use std::path::PathBuf;

/// Failure modes for a single page fetch.
///
/// All variants are non-fatal per page — logged, counted, and skipped —
/// except when the seed URL itself fails, which aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status. Never retried.
    #[error("HTTP {0}")]
    Http(u16),

    /// Connection, DNS, or protocol-level failure. Retried with backoff.
    #[error("network error: {0}")]
    Network(String),

    /// The response body exceeded the configured byte ceiling.
    #[error("response body exceeded {limit} bytes")]
    TooLarge { limit: usize },
}

impl FetchError {
    /// Whether this failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }
}

/// Top-level error type for all sitebrief operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteBriefError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A URL that failed normalization. Non-fatal for discovered links;
    /// run-fatal when it is the seed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A page-level fetch failure, carried for metrics/reporting.
    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// The seed URL failed terminally; the run is aborted.
    #[error("run aborted: {reason}")]
    Aborted { reason: String },

    /// External generation collaborator failure for one block.
    #[error("generation error: {0}")]
    Generation(String),

    /// A completed run produced zero fact units. Reportable, not a crash.
    #[error("no fact units were produced from the crawled corpus")]
    EmptyResult,

    /// Data validation error (schema mismatch, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteBriefError>;

impl SiteBriefError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an aborted-run error from any displayable reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Wrap a fetch failure with the URL it occurred on.
    pub fn fetch(url: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
