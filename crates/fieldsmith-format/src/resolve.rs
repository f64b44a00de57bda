use fieldsmith_core::{FieldSpec, FormattingOptions};
use tracing::debug;

use crate::rules::{SchemaFormattingRules, condition_matches};

/// Merge every formatting layer for one field into its effective options.
///
/// Layers in increasing precedence: global defaults, category rule, type
/// rule, matching conditional rules, field-level override. Merging is
/// attribute-wise, so an attribute a higher layer leaves unset keeps the
/// lower layer's value. A category rule with `overrideFieldRules` drops the
/// field-level layer for its fields.
pub fn resolve(
    field: &FieldSpec,
    rules: &SchemaFormattingRules,
    field_override: Option<&FormattingOptions>,
) -> FormattingOptions {
    let mut resolved = FormattingOptions::default();
    let mut field_rules_suppressed = false;

    if let Some(global) = &rules.global_rules {
        resolved.overlay(&global.as_formatting());
    }

    if let Some(category) = field
        .category()
        .and_then(|category| rules.category_rules.get(category))
    {
        resolved.overlay(&category.formatting);
        field_rules_suppressed = category.override_field_rules;
    }

    if let Some(type_rule) = rules.type_rules.get(&field.generator_key) {
        resolved.overlay(&type_rule.formatting);
    }

    resolved.overlay(&conditional_layer(field, rules));

    match field_override {
        Some(_) if field_rules_suppressed => {
            debug!(field = %field.name, "category rule overrides field formatting");
        }
        Some(field_rules) => resolved.overlay(field_rules),
        None => {}
    }

    resolved
}

/// Matching conditional rules folded into one layer. A higher-priority rule
/// keeps its attributes; lower-priority rules only fill what it leaves unset.
fn conditional_layer(field: &FieldSpec, rules: &SchemaFormattingRules) -> FormattingOptions {
    let mut layer = FormattingOptions::default();
    for rule in rules.conditional_rules_by_priority() {
        if !condition_matches(&rule.condition, &field.name, &field.generator_key) {
            continue;
        }
        debug!(
            field = %field.name,
            condition = %rule.condition,
            priority = rule.priority,
            "conditional formatting rule matched"
        );
        let mut merged = rule.formatting.clone();
        merged.overlay(&layer);
        layer = merged;
    }
    layer
}

/// Resolves effective formatting against one parsed rule set.
#[derive(Debug, Clone, Default)]
pub struct FormattingResolver {
    rules: SchemaFormattingRules,
}

impl FormattingResolver {
    pub fn new(rules: SchemaFormattingRules) -> Self {
        Self { rules }
    }

    /// Resolver over a rules document, see [`crate::parse_rules`].
    pub fn from_text(text: Option<&str>) -> Self {
        Self::new(crate::rules::parse_rules(text))
    }

    pub fn rules(&self) -> &SchemaFormattingRules {
        &self.rules
    }

    pub fn resolve(
        &self,
        field: &FieldSpec,
        field_override: Option<&FormattingOptions>,
    ) -> FormattingOptions {
        resolve(field, &self.rules, field_override)
    }

    /// Resolve using the formatting block carried in the field's own options.
    pub fn resolve_field(&self, field: &FieldSpec) -> FormattingOptions {
        let options = field.parsed_options();
        self.resolve(field, options.formatting.as_ref())
    }
}
