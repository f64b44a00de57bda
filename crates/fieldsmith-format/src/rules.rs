use std::collections::BTreeMap;

use fieldsmith_core::{CaseTransform, FormattingOptions};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::FormatError;

/// JSON Schema for formatting rules documents.
pub fn formatting_rules_json_schema() -> RootSchema {
    schemars::schema_for!(SchemaFormattingRules)
}

/// Schema-wide formatting rules, grouped by precedence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaFormattingRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_rules: Option<GlobalRules>,
    /// Keyed by category, the generator-key text before the first `.`.
    pub category_rules: BTreeMap<String, CategoryRule>,
    /// Keyed by the exact generator key.
    pub type_rules: BTreeMap<String, TypeRule>,
    pub conditional_rules: Vec<ConditionalRule>,
}

/// Defaults applied to every field before any other layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_case: Option<CaseTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_max_length: Option<i64>,
}

impl GlobalRules {
    pub fn as_formatting(&self) -> FormattingOptions {
        FormattingOptions {
            case_transform: self.default_case,
            prefix: self.default_prefix.clone(),
            suffix: self.default_suffix.clone(),
            max_length: self.default_max_length,
            ..FormattingOptions::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRule {
    pub formatting: FormattingOptions,
    /// Field-level formatting is ignored for fields in this category.
    pub override_field_rules: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeRule {
    pub formatting: FormattingOptions,
}

/// Formatting applied when `condition` matches the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionalRule {
    /// `fieldName.contains('x')` or `dataType.contains('x')`.
    pub condition: String,
    pub formatting: FormattingOptions,
    /// Higher priorities win when several rules set the same attribute.
    pub priority: i32,
}

impl SchemaFormattingRules {
    pub fn from_json_str(text: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        self == &SchemaFormattingRules::default()
    }

    /// Conditional rules ordered by descending priority. Ties keep
    /// declaration order.
    pub fn conditional_rules_by_priority(&self) -> Vec<&ConditionalRule> {
        let mut rules: Vec<&ConditionalRule> = self.conditional_rules.iter().collect();
        rules.sort_by(|left, right| right.priority.cmp(&left.priority));
        rules
    }
}

/// Parse a rules document, degrading to "no rules" when the text is absent,
/// blank or malformed.
pub fn parse_rules(text: Option<&str>) -> SchemaFormattingRules {
    let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
        debug!("no formatting rules configured");
        return SchemaFormattingRules::default();
    };

    match SchemaFormattingRules::from_json_str(text) {
        Ok(rules) => {
            debug!(
                categories = rules.category_rules.len(),
                types = rules.type_rules.len(),
                conditionals = rules.conditional_rules.len(),
                "formatting rules parsed"
            );
            rules
        }
        Err(err) => {
            warn!(error = %err, "failed to parse formatting rules, using defaults");
            SchemaFormattingRules::default()
        }
    }
}

/// Evaluate a conditional-rule condition against a field.
///
/// Matching is case-insensitive substring containment on the field name or
/// generator key. The needle is the text between the first and last `'`.
/// Anything else does not match.
pub fn condition_matches(condition: &str, field_name: &str, generator_key: &str) -> bool {
    let condition = condition.trim().to_lowercase();
    if condition.is_empty() {
        return false;
    }

    let haystack = if condition.contains("fieldname.contains") {
        field_name.to_lowercase()
    } else if condition.contains("datatype.contains") {
        generator_key.to_lowercase()
    } else {
        debug!(condition = %condition, "unsupported formatting condition");
        return false;
    };

    match quoted_needle(&condition) {
        Some(needle) => haystack.contains(needle),
        None => false,
    }
}

fn quoted_needle(condition: &str) -> Option<&str> {
    let start = condition.find('\'')?;
    let end = condition.rfind('\'')?;
    if end <= start {
        return None;
    }
    Some(&condition[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_rules() {
        let rules = parse_rules(Some(
            r#"{
                "globalRules": {"defaultCase": "LOWER", "defaultMaxLength": 20},
                "categoryRules": {"Name": {"formatting": {"caseTransform": "UPPER"}, "overrideFieldRules": true}},
                "typeRules": {"Name.firstName": {"formatting": {"prefix": "F:"}}},
                "conditionalRules": [{"condition": "fieldName.contains('email')", "formatting": {"caseTransform": "LOWER"}}]
            }"#,
        ));

        let global = rules.global_rules.as_ref().expect("global rules");
        assert_eq!(global.default_case, Some(CaseTransform::Lower));
        assert_eq!(global.default_max_length, Some(20));
        assert!(rules.category_rules["Name"].override_field_rules);
        assert_eq!(
            rules.type_rules["Name.firstName"].formatting.prefix.as_deref(),
            Some("F:")
        );
        assert_eq!(rules.conditional_rules[0].priority, 0);
    }

    #[test]
    fn absent_or_broken_rules_degrade_to_defaults() {
        assert!(parse_rules(None).is_empty());
        assert!(parse_rules(Some("   ")).is_empty());
        assert!(parse_rules(Some("{not json")).is_empty());
    }

    #[test]
    fn unknown_global_keys_are_ignored() {
        let rules = parse_rules(Some(r#"{"globalRules": {"dateFormat": "yyyy", "defaultPrefix": "p"}}"#));
        assert_eq!(
            rules.global_rules.and_then(|global| global.default_prefix).as_deref(),
            Some("p")
        );
    }

    #[test]
    fn conditions_match_on_substrings() {
        assert!(condition_matches("fieldName.contains('mail')", "WorkEmail", "Internet.emailAddress"));
        assert!(condition_matches("dataType.contains('Address')", "home", "Address.state"));
        assert!(!condition_matches("fieldName.contains('zip')", "postcode", "Address.zipCode"));
        assert!(!condition_matches("fieldName == 'x'", "x", "Name.firstName"));
        assert!(!condition_matches("fieldName.contains(mail)", "email", "Internet.emailAddress"));
        assert!(!condition_matches("", "email", "Internet.emailAddress"));
    }

    #[test]
    fn priority_order_is_descending_and_stable() {
        let rule = |condition: &str, priority| ConditionalRule {
            condition: condition.to_string(),
            formatting: FormattingOptions::default(),
            priority,
        };
        let rules = SchemaFormattingRules {
            conditional_rules: vec![rule("a", 1), rule("b", 5), rule("c", 1)],
            ..SchemaFormattingRules::default()
        };
        let order: Vec<_> = rules
            .conditional_rules_by_priority()
            .into_iter()
            .map(|rule| rule.condition.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }
}
