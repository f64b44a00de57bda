use thiserror::Error;

/// Core error type shared across Fieldsmith crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The JSON Schema for the document could not be compiled.
    #[error("schema error: {0}")]
    Schema(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by Fieldsmith crates.
pub type Result<T> = std::result::Result<T, Error>;
