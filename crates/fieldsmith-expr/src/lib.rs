//! Expression language for derived fields.
//!
//! Expressions mix free text with field references (`${name}`) and nested
//! function calls (`uppercase(substring(${name}, 0, 1))`). The parser reports
//! structure and problems without evaluating; the evaluator resolves an
//! expression against one row's [`fieldsmith_core::GenerationContext`].

pub mod errors;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod scanner;

pub use errors::{EvalError, FunctionError};
pub use evaluator::ExpressionEvaluator;
pub use functions::{Argument, ExpressionFunction, FunctionContext, FunctionRegistry};
pub use parser::{
    FunctionCall, ParsedExpression, field_references, is_valid_expression, normalize_expression,
    parse, validation_errors,
};

/// Functions whose first parameter names the field they read.
///
/// Shared by the parser and the dependency resolver.
pub const FIELD_REFERENCING_FUNCTIONS: &[&str] = &[
    "substring",
    "uppercase",
    "lowercase",
    "length",
    "padleft",
    "padright",
    "replace",
];

/// Returns true when `name` is a field-referencing function (case-insensitive).
pub fn is_field_referencing_function(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    FIELD_REFERENCING_FUNCTIONS.contains(&lower.as_str())
}
