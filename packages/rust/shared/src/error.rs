//! Error types for poemday.
//!
//! Library crates use [`PoemError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Extraction failures come in four flavours. `NotFound`, `Malformed` and
//! `Invalid` are local to one strategy and only ever move the pipeline on to
//! the next fallback; `Exhausted` is the single failure surfaced to callers.

use std::path::PathBuf;

/// Top-level error type for all poemday operations.
#[derive(Debug, thiserror::Error)]
pub enum PoemError {
    /// A sub-step found no matching structure in its input.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Structured data embedded in a page could not be parsed.
    #[error("malformed data: {message}")]
    Malformed { message: String },

    /// A candidate record was rejected by the validator.
    #[error("invalid record: {reason}")]
    Invalid { reason: String },

    /// Every extraction strategy failed.
    #[error("all extraction strategies failed: {}", attempts.join("; "))]
    Exhausted { attempts: Vec<String> },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching page content.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PoemError>;

impl PoemError {
    /// Create a not-found error describing what was missing.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a malformed-data error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
        }
    }

    /// Create a validator rejection.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the pipeline may swallow this error and try the next strategy.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Malformed { .. } | Self::Invalid { .. }
        )
    }

    /// Returns true if every strategy was tried and failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
