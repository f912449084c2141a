//! Error types for the change-detection core.

use thiserror::Error;

/// Errors that can surface from watcher construction and host subscriptions.
///
/// Failures inside scanning and scheduling are absorbed and logged instead of
/// being returned; see the individual components.
#[derive(Error, Debug)]
pub enum Error {
    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pattern matching error.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for change-detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert globset errors to our error type.
impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Self {
        Error::Pattern(err.to_string())
    }
}
