use thiserror::Error;

/// Errors raised while preparing or applying formatting.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid validation pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("fixed length {length} exceeds the limit of {limit}")]
    FixedLengthTooLarge { length: i64, limit: usize },
    #[error("invalid formatting rules: {0}")]
    Rules(#[from] serde_json::Error),
}
