//! Error types for the docfill crate.

use std::path::PathBuf;

/// Docfill-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    /// The document body cannot be interpreted as markup.
    #[error("please provide a valid document: {reason} (at byte {offset})")]
    Decode { offset: usize, reason: String },

    /// An answer was given for a key the schema does not contain.
    #[error("unknown placeholder key: {key}")]
    UnknownKey { key: String },

    /// A session operation was requested before any template was loaded.
    #[error("no template loaded")]
    NoSession,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error with context.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for docfill operations.
pub type FillResult<T> = Result<T, FillError>;
