use thiserror::Error;

/// Failure of a single function call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    #[error("{name} requires {expected}, got {actual}")]
    Arity {
        name: &'static str,
        expected: String,
        actual: usize,
    },
    #[error("{0}")]
    InvalidArgument(String),
}

impl FunctionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FunctionError::InvalidArgument(message.into())
    }
}

/// Failure of a whole expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("field references nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
