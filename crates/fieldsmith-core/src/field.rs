use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::formatting::FormattingOptions;

/// Schema document consumed by the generation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    /// Ordered field declarations; declaration order is the fallback row order.
    pub fields: Vec<FieldSpec>,
    /// Formatting rules as an object or as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting_rules: Option<Value>,
}

impl SchemaDocument {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            formatting_rules: None,
        }
    }

    /// Parse a schema document, also accepting a bare array of fields.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)?;
        if value.is_array() {
            let fields: Vec<FieldSpec> = serde_json::from_value(value)?;
            return Ok(Self::new(fields));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Load a schema document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Formatting rules rendered as the JSON text the rules parser expects.
    pub fn formatting_rules_text(&self) -> Option<String> {
        match &self.formatting_rules {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// One named column of the generated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Unique within a schema; joins the dependency graph and the row context.
    pub name: String,
    /// Generator key such as `Name.firstName`; its prefix is the field category.
    #[serde(rename = "dataType")]
    pub generator_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptionsSource>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, generator_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generator_key: generator_key.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = Some(FieldOptionsSource::Structured(options));
        self
    }

    pub fn with_raw_options(mut self, raw: impl Into<String>) -> Self {
        self.options = Some(FieldOptionsSource::Text(raw.into()));
        self
    }

    pub fn with_expression(self, expression: impl Into<String>) -> Self {
        self.with_options(FieldOptions {
            expression: Some(expression.into()),
            ..FieldOptions::default()
        })
    }

    /// Category of the field: the generator key up to its first `.`.
    /// Keys without a dot have no category.
    pub fn category(&self) -> Option<&str> {
        self.generator_key
            .split_once('.')
            .map(|(category, _)| category)
    }

    /// Structured view of the options, tolerating legacy raw strings.
    pub fn parsed_options(&self) -> FieldOptions {
        match &self.options {
            None => FieldOptions::default(),
            Some(FieldOptionsSource::Structured(options)) => options.clone(),
            Some(FieldOptionsSource::Text(raw)) => FieldOptions::from_raw(raw),
        }
    }
}

/// Field options as written in the schema: a raw string or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldOptionsSource {
    Text(String),
    Structured(FieldOptions),
}

/// Structured field options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    /// Generator key overriding the field's own key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    /// Options forwarded to the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatting: Option<FormattingOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<DependencyConfig>,
}

/// Nested dependency block: `{ "expression": ..., "dependsOn": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<String>,
}

impl FieldOptions {
    /// Parse raw option text; anything that is not a JSON object becomes `baseOptions`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            match serde_json::from_str::<FieldOptions>(trimmed) {
                Ok(options) => return options,
                Err(err) => {
                    debug!(error = %err, "field options are not structured; using raw text");
                }
            }
        }
        Self {
            base_options: Some(Value::String(raw.to_string())),
            ..Self::default()
        }
    }

    /// Expression to evaluate, preferring the nested dependency block.
    pub fn expression(&self) -> Option<&str> {
        self.dependency
            .as_ref()
            .and_then(|dependency| dependency.expression.as_deref())
            .or(self.expression.as_deref())
            .filter(|expression| !expression.trim().is_empty())
    }

    /// Explicit dependencies from both the top level and the dependency block.
    pub fn declared_dependencies(&self) -> Vec<&str> {
        let nested = self
            .dependency
            .iter()
            .flat_map(|dependency| dependency.depends_on.iter());
        self.depends_on
            .iter()
            .chain(nested)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Base options as generator input text.
    pub fn base_options_text(&self) -> Option<String> {
        match &self.base_options {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_text_options_fall_back_to_base_options() {
        let field = FieldSpec::new("age", "Number.range").with_raw_options("18-65");
        let options = field.parsed_options();
        assert_eq!(options.base_options_text().as_deref(), Some("18-65"));
        assert!(options.expression().is_none());
    }

    #[test]
    fn json_text_options_are_structured() {
        let field = FieldSpec::new("initials", "Dependent.expression").with_raw_options(
            r#"{"dependency":{"expression":"${first}","dependsOn":["first"]},"formatting":{"prefix":"X"}}"#,
        );
        let options = field.parsed_options();
        assert_eq!(options.expression(), Some("${first}"));
        assert_eq!(options.declared_dependencies(), vec!["first"]);
        assert_eq!(
            options.formatting.and_then(|formatting| formatting.prefix),
            Some("X".to_string())
        );
    }

    #[test]
    fn schema_document_accepts_bare_field_arrays() {
        let input = json!([
            { "name": "first", "dataType": "Name.firstName" },
            { "name": "code", "dataType": "Custom.bothify", "options": "??-##" }
        ])
        .to_string();
        let document = SchemaDocument::from_json_str(&input).expect("parse");
        assert_eq!(document.fields.len(), 2);
        assert_eq!(document.fields[1].generator_key, "Custom.bothify");
        assert_eq!(document.fields[1].category(), Some("Custom"));
    }

    #[test]
    fn key_without_dot_has_no_category() {
        assert_eq!(FieldSpec::new("x", "Plain").category(), None);
    }
}
