use std::collections::BTreeSet;

use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::field::SchemaDocument;
use crate::formatting::MAX_PADDED_LENGTH;
use crate::issues::{IssueSeverity, ValidationIssue, ValidationReport};

/// Emit the JSON Schema for schema documents.
pub fn schema_document_json_schema() -> RootSchema {
    schema_for!(SchemaDocument)
}

/// Validate a raw schema document against the document JSON Schema.
pub fn validate_schema_json(document: &Value) -> Result<ValidationReport> {
    let schema = serde_json::to_value(schema_document_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| Error::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(document) {
        for error in errors {
            let pointer = error.instance_path.to_string();
            let path = if pointer.is_empty() {
                "/".to_string()
            } else {
                pointer
            };
            report.push_error(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
            ));
        }
    }
    Ok(report)
}

/// Validate internal consistency of a schema document.
///
/// This checks:
/// - field names are present and unique
/// - every field names a generator key
/// - explicit dependencies point at fields of the schema
/// - field-level fixed lengths stay within [`MAX_PADDED_LENGTH`]
pub fn validate_schema(document: &SchemaDocument) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut names = BTreeSet::new();

    for (index, field) in document.fields.iter().enumerate() {
        let path = format!("/fields/{index}");
        if field.name.trim().is_empty() {
            report.push_error(ValidationIssue::error(
                "empty_field_name",
                format!("{path}/name"),
                "field name must not be empty",
            ));
        } else if !names.insert(field.name.as_str()) {
            report.push_error(ValidationIssue::error(
                "duplicate_field_name",
                format!("{path}/name"),
                format!("duplicate field name: {}", field.name),
            ));
        }

        if field.generator_key.trim().is_empty() {
            report.push_error(ValidationIssue::error(
                "missing_generator_key",
                format!("{path}/dataType"),
                format!("field '{}' has no generator key", field.name),
            ));
        }
    }

    for (index, field) in document.fields.iter().enumerate() {
        let options = field.parsed_options();
        if let Some(fixed) = options
            .formatting
            .as_ref()
            .and_then(|formatting| formatting.fixed_length.as_ref())
            .filter(|fixed| fixed.length > MAX_PADDED_LENGTH as i64)
        {
            report.push_error(ValidationIssue::error(
                "fixed_length_too_large",
                format!("/fields/{index}/options/formatting/fixedLength/length"),
                format!(
                    "field '{}' asks for a fixed length of {}, the limit is {MAX_PADDED_LENGTH}",
                    field.name, fixed.length
                ),
            ));
        }
        for dependency in options.declared_dependencies() {
            let path = format!("/fields/{index}/options");
            if dependency == field.name {
                report.push_warning(ValidationIssue::warning(
                    "self_dependency",
                    path,
                    format!("field '{}' depends on itself", field.name),
                ));
            } else if !names.contains(dependency) {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "unknown_dependency",
                    path,
                    format!(
                        "field '{}' depends on '{}' which is not in the schema",
                        field.name, dependency
                    ),
                    Some("the dependency is ignored during ordering".to_string()),
                ));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldOptions, FieldSpec};
    use crate::formatting::{FixedLength, FormattingOptions, Padding, TruncateFrom};

    #[test]
    fn duplicate_and_empty_names_are_errors() {
        let document = SchemaDocument::new(vec![
            FieldSpec::new("id", "Number.incremental"),
            FieldSpec::new("id", "Name.firstName"),
            FieldSpec::new(" ", "Name.lastName"),
            FieldSpec::new("code", ""),
        ]);

        let report = validate_schema(&document);
        let codes: Vec<_> = report.errors.iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["duplicate_field_name", "empty_field_name", "missing_generator_key"]
        );
        assert!(!report.is_ok());
    }

    #[test]
    fn oversized_fixed_lengths_are_errors() {
        let formatting = |length| FormattingOptions {
            fixed_length: Some(FixedLength {
                length,
                truncate_from: TruncateFrom::End,
                padding: Padding::default(),
            }),
            ..FormattingOptions::default()
        };
        let document = SchemaDocument::new(vec![
            FieldSpec::new("ok", "Name.firstName").with_options(FieldOptions {
                formatting: Some(formatting(MAX_PADDED_LENGTH as i64)),
                ..FieldOptions::default()
            }),
            FieldSpec::new("huge", "Name.lastName").with_options(FieldOptions {
                formatting: Some(formatting(99_999_999_999)),
                ..FieldOptions::default()
            }),
        ]);

        let report = validate_schema(&document);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "fixed_length_too_large");
        assert_eq!(
            report.errors[0].path,
            "/fields/1/options/formatting/fixedLength/length"
        );
    }

    #[test]
    fn unknown_dependencies_are_warnings() {
        let document = SchemaDocument::new(vec![
            FieldSpec::new("first", "Name.firstName"),
            FieldSpec::new("initial", "Dependent.expression").with_options(FieldOptions {
                depends_on: vec!["first".to_string(), "ghost".to_string()],
                ..FieldOptions::default()
            }),
        ]);

        let report = validate_schema(&document);
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, "unknown_dependency");
    }
}
