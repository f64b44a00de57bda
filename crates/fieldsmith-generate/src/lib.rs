//! Row generation for Fieldsmith schemas.
//!
//! This crate orders fields by their dependencies, produces one value per
//! field and row from the built-in generator catalog or an expression,
//! applies the effective formatting, and writes the rows as CSV or JSON.

pub mod dependency;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;

pub use dependency::{
    DependencyGraph, declared_dependencies, dependency_graph, field_depends_on,
    fields_depending_on, independent_fields, render_dependency_graph, resolve_order,
    validate_no_cycles,
};
pub use engine::{
    GenerationEngine, NO_GENERATOR, ROW_PANICKED, contains_sentinel, hash_row_seed,
};
pub use errors::{DependencyError, GenerationError};
pub use generators::{Generator, GeneratorContext, GeneratorRegistry};
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, GenerationResult};
pub use output::{OutputFormat, write_rows, write_rows_to_path};
