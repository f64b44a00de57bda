//! Layered formatting rules and the fixed-order field formatter.

pub mod errors;
pub mod formatter;
pub mod resolve;
pub mod rules;

pub use errors::FormatError;
pub use formatter::{
    FieldFormatter, FORMAT_ERROR, VALIDATION_FAILED, apply_case_transform, apply_formatting,
    apply_formatting_batch, describe_formatting, preview_formatting, try_apply_formatting,
};
pub use resolve::{FormattingResolver, resolve};
pub use rules::{
    CategoryRule, ConditionalRule, GlobalRules, SchemaFormattingRules, TypeRule, condition_matches,
    formatting_rules_json_schema, parse_rules,
};
