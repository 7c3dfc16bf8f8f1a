//! Error types for schema and format handling.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while building or loading a record model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The same key was declared twice.
    #[error("duplicate field key: {0}")]
    DuplicateField(String),

    /// A format references a key its schema does not declare.
    #[error("{role} key {key:?} is not declared in the schema")]
    UndeclaredKey { role: &'static str, key: String },

    /// Malformed JSON.
    #[error("format parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading a format file failed.
    #[error("failed to read format file: {0}")]
    Io(#[from] std::io::Error),
}
