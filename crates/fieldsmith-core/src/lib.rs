//! Core contracts shared by the Fieldsmith crates.
//!
//! This crate defines the field schema model, the formatting option types,
//! the per-row generation context and schema validation helpers.

pub mod context;
pub mod error;
pub mod field;
pub mod formatting;
pub mod issues;
pub mod validation;

pub use context::{GenerationContext, RowMetadata, RowValues, ROW_INDEX_KEY, TIMESTAMP_KEY};
pub use error::{Error, Result};
pub use field::{DependencyConfig, FieldOptions, FieldOptionsSource, FieldSpec, SchemaDocument};
pub use formatting::{
    CaseTransform, FixedLength, FormattingOptions, MAX_PADDED_LENGTH, PadPosition, Padding,
    TruncateFrom, ValidationRule,
};
pub use issues::{IssueSeverity, ValidationIssue, ValidationReport};
pub use validation::{schema_document_json_schema, validate_schema, validate_schema_json};

/// Current contract version for schema documents.
pub const SCHEMA_VERSION: &str = "0.1";
