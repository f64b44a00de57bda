use fieldsmith_core::ValidationReport;
use thiserror::Error;

/// Errors emitted by the generation engine and the built-in generators.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid schema: {} error(s)", .0.errors.len())]
    InvalidSchema(ValidationReport),
    #[error("{0}")]
    InvalidOptions(String),
    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub fn invalid_options(message: impl Into<String>) -> Self {
        GenerationError::InvalidOptions(message.into())
    }
}

/// Raised by the strict cycle check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("Circular dependency detected involving field: {field} ({})", .path.join(" -> "))]
    Cycle { field: String, path: Vec<String> },
}
