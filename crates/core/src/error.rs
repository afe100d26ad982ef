//! Error types for the punta pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the punta pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input is missing required columns or a value failed its type cast.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A stage dependency (upstream table, benchmark ticker) is absent.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Data error (an upstream invariant does not hold).
    #[error("Data error: {0}")]
    Data(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Create a missing-dependency error.
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Error::MissingDependency(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Check if this error names a missing stage dependency.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Error::MissingDependency(_))
    }
}
