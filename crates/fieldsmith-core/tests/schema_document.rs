use fieldsmith_core::{
    CaseTransform, FieldOptionsSource, SchemaDocument, validate_schema, validate_schema_json,
};
use serde_json::json;

fn sample_document() -> serde_json::Value {
    json!({
        "fields": [
            { "name": "first", "dataType": "Name.firstName" },
            {
                "name": "badge",
                "dataType": "Dependent.expression",
                "options": {
                    "dependency": { "expression": "${uppercase(first)}-${_rowIndex}" },
                    "formatting": { "caseTransform": "UPPER", "prefix": "ID-" }
                }
            },
            { "name": "age", "dataType": "Number.range", "options": "18-65" }
        ],
        "formattingRules": { "globalRules": { "defaultMaxLength": 40 } }
    })
}

#[test]
fn sample_document_passes_json_schema_validation() {
    let report = validate_schema_json(&sample_document()).expect("compile json schema");
    assert!(report.is_ok(), "unexpected errors: {:?}", report.errors);
}

#[test]
fn missing_data_type_is_a_schema_violation() {
    let document = json!({ "fields": [ { "name": "first" } ] });
    let report = validate_schema_json(&document).expect("compile json schema");
    assert!(!report.is_ok());
    assert!(report.errors.iter().all(|issue| issue.code == "schema_violation"));
}

#[test]
fn sample_document_deserializes_and_validates() {
    let document: SchemaDocument =
        serde_json::from_value(sample_document()).expect("parse schema document");
    assert!(validate_schema(&document).is_ok());

    let badge = &document.fields[1];
    assert!(matches!(badge.options, Some(FieldOptionsSource::Structured(_))));
    let options = badge.parsed_options();
    assert_eq!(options.expression(), Some("${uppercase(first)}-${_rowIndex}"));
    assert_eq!(
        options.formatting.and_then(|formatting| formatting.case_transform),
        Some(CaseTransform::Upper)
    );

    assert!(matches!(
        document.fields[2].options,
        Some(FieldOptionsSource::Text(ref raw)) if raw == "18-65"
    ));
    assert_eq!(
        document.formatting_rules_text().as_deref(),
        Some(r#"{"globalRules":{"defaultMaxLength":40}}"#)
    );
}
