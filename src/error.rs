//! Unified error types for Laurel.
//!
//! No failure of this crate is allowed to propagate up and interrupt the
//! host application. Errors from the derived award path are logged and
//! dropped (the next change notification re-attempts evaluation), and
//! user-triggered actions convert failures into typed outcomes instead of
//! panicking.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Laurel operations.
#[derive(Error, Debug)]
pub enum LaurelError {
    /// I/O errors from record or catalog file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Catalog loading errors (tasks or badges collection unreadable).
    #[error("catalog error: {message}")]
    Catalog { message: String },

    /// Optimistic transaction gave up after exhausting its retry budget.
    #[error("transaction conflict on record {user_id} after {attempts} attempts")]
    Conflict { user_id: String, attempts: u32 },

    /// No active identity for a user-triggered operation.
    #[error("no signed-in user")]
    NotAuthenticated,
}

/// A specialized Result type for Laurel operations.
pub type Result<T> = std::result::Result<T, LaurelError>;

impl LaurelError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a transaction conflict error.
    pub fn conflict(user_id: impl Into<String>, attempts: u32) -> Self {
        Self::Conflict {
            user_id: user_id.into(),
            attempts,
        }
    }
}

impl From<io::Error> for LaurelError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for LaurelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for log-and-continue error handling.
///
/// The derived award path must never crash the host: a failed commit just
/// means the next change notification re-attempts evaluation. These methods
/// log a warning and substitute a safe value.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}
