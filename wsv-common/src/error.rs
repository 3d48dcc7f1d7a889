//! Common error types for the Works Single View importer

use thiserror::Error;

/// Common result type for importer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds across the import pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input row or header; aborts the whole run
    #[error("Parse error: {0}")]
    Parse(String),

    /// Out-of-pattern identifier, raised only when identifier
    /// validation is enabled
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
