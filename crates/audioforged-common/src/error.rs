//! Common error types used throughout audioforged.
//!
//! The variants follow the failure boundaries of a conversion job: request
//! validation, queue admission, the external process, blob storage, and
//! persistence.

use std::path::PathBuf;

use crate::types::{Encoding, JobStatus};

/// Common error type for audioforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request is missing a field or is otherwise malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An encoding ordinal does not resolve in the catalog.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(i32),

    /// Source and target encoding are the same.
    #[error("No-op conversion: source and target are both {0}")]
    NoOpConversion(Encoding),

    /// The job queue buffer is full.
    #[error("Job queue is at capacity")]
    QueueFull,

    /// The job queue is not running.
    #[error("Job queue is not running")]
    QueueStopped,

    /// The external conversion process failed to start or exited abnormally.
    #[error("Process error: {0}")]
    Process(String),

    /// A blob upload or URL signing call failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A status write was refused because it is not a legal transition.
    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// The process reported success but its output file is missing.
    #[error("Converted output missing: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new InvalidRequest error.
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new Process error.
    pub fn process<S: Into<String>>(msg: S) -> Self {
        Self::Process(msg.into())
    }

    /// Create a new Storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Rejected before any state was created.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::UnsupportedEncoding(_) | Self::NoOpConversion(_)
        )
    }

    /// Rejected by the job queue; the caller may retry later.
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::QueueFull | Self::QueueStopped)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
