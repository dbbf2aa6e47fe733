//! Unified error types for the scraper.
//!
//! Every failure carries enough context (entity, key, URL or query) to be
//! diagnosed from a log line. [`Error::class`] tells the caller whether a
//! failure is worth retrying, isolated to one entity, or fatal to a stage.

use sea_orm::DbErr;
use thiserror::Error;

/// How a failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retryable: connection errors, timeouts, 5xx responses.
    Transient,
    /// Not retryable, but scoped to the entity that was being fetched.
    Permanent,
    /// Halts the stage that hit it.
    Fatal,
}

/// Every failure the scraper reports.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Failed to store {entity} {key}: {source}")]
    Store {
        entity: &'static str,
        key: String,
        #[source]
        source: DbErr,
    },

    #[error("No stored {entity} matches {key}")]
    Unresolved { entity: &'static str, key: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Server answered {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Malformed {entity} response for {key}: {reason}")]
    Malformed {
        entity: &'static str,
        key: String,
        reason: String,
    },

    #[error("Relevance query failed ({query}): {message}")]
    Relevance { query: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Builds a [`Error::Malformed`] for a response that did not have the expected shape.
    pub fn malformed(entity: &'static str, key: impl ToString, reason: impl ToString) -> Self {
        Self::Malformed {
            entity,
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`Error::Store`] naming the record whose write failed.
    pub fn store(entity: &'static str, key: impl ToString, source: DbErr) -> Self {
        Self::Store {
            entity,
            key: key.to_string(),
            source,
        }
    }

    /// Builds a [`Error::Unresolved`] for a failed identity lookup.
    pub fn unresolved(entity: &'static str, key: impl ToString) -> Self {
        Self::Unresolved {
            entity,
            key: key.to_string(),
        }
    }

    /// How the caller should treat this failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => FailureClass::Transient,
            Self::Status { status, .. } if *status >= 500 => FailureClass::Transient,
            Self::Status { .. } | Self::Malformed { .. } | Self::Relevance { .. } => {
                FailureClass::Permanent
            }
            Self::Config { .. }
            | Self::Database(_)
            | Self::Store { .. }
            | Self::Unresolved { .. }
            | Self::Io(_)
            | Self::EnvVar(_) => FailureClass::Fatal,
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class(), FailureClass::Transient)
    }
}

// Convenience `Result` type
/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = Error::Status {
            url: "http://bes/api/sites".to_string(),
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.class(), FailureClass::Transient);
        assert!(err.is_transient());
    }

    #[test]
    fn test_timeouts_are_transient() {
        let err = Error::Timeout {
            url: "http://bes/api/action/43/status".to_string(),
        };
        assert_eq!(err.class(), FailureClass::Transient);
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let err = Error::Status {
            url: "http://bes/api/sites".to_string(),
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.class(), FailureClass::Permanent);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_resolution_failures_are_fatal() {
        let err = Error::unresolved("site", "BES Support");
        assert_eq!(err.class(), FailureClass::Fatal);
        assert_eq!(err.to_string(), "No stored site matches BES Support");
    }

    #[test]
    fn test_malformed_carries_context() {
        let err = Error::malformed("computer", 42, "missing Computer Name property");
        assert_eq!(err.class(), FailureClass::Permanent);
        assert_eq!(
            err.to_string(),
            "Malformed computer response for 42: missing Computer Name property"
        );
    }
}
