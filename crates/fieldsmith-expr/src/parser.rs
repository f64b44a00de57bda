//! Static analysis of expressions.
//!
//! [`parse`] never fails: structural problems land in
//! [`ParsedExpression::errors`], suspicious but legal constructs in
//! [`ParsedExpression::warnings`].

use std::collections::BTreeSet;

use fieldsmith_core::{ROW_INDEX_KEY, TIMESTAMP_KEY};
use serde::Serialize;

use crate::is_field_referencing_function;
use crate::scanner::{
    as_call, collapse_whitespace, find_calls, find_references, is_balanced, is_identifier,
    max_nesting, split_arguments, strip_quotes,
};

const KNOWN_FUNCTIONS: &[&str] = &[
    "randomnumber",
    "substring",
    "uppercase",
    "lowercase",
    "replace",
    "concat",
    "length",
    "padleft",
    "padright",
    "formatdate",
    "randomchoice",
    "conditional",
];

const MAX_EXPRESSION_LENGTH: usize = 500;
const MAX_NESTING: usize = 5;
const MAX_RANDOM_CALLS: usize = 3;

/// Structure and diagnostics of one expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedExpression {
    pub original: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub field_references: BTreeSet<String>,
    pub function_calls: Vec<FunctionCall>,
    pub warnings: Vec<String>,
}

impl ParsedExpression {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_field_references(&self) -> bool {
        !self.field_references.is_empty()
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// A function call found in an expression, parameters in source form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub parameters: Vec<String>,
    /// Names referenced as `${...}` inside the parameters.
    pub referenced_fields: BTreeSet<String>,
}

impl FunctionCall {
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// Parse an expression into its references, calls and diagnostics.
pub fn parse(expression: &str) -> ParsedExpression {
    if expression.trim().is_empty() {
        return ParsedExpression {
            original: expression.to_string(),
            valid: true,
            errors: Vec::new(),
            field_references: BTreeSet::new(),
            function_calls: Vec::new(),
            warnings: Vec::new(),
        };
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let field_references = extract_field_references(expression);
    let function_calls = extract_function_calls(expression, &mut errors, &mut warnings);
    validate_syntax(expression, &mut errors);
    check_potential_issues(expression, &field_references, &function_calls, &mut warnings);

    ParsedExpression {
        original: expression.to_string(),
        valid: errors.is_empty(),
        errors,
        field_references,
        function_calls,
        warnings,
    }
}

/// Returns true when the expression has no structural errors.
pub fn is_valid_expression(expression: &str) -> bool {
    parse(expression).valid
}

/// Field names the expression reads.
pub fn field_references(expression: &str) -> BTreeSet<String> {
    parse(expression).field_references
}

/// Structural errors of the expression.
pub fn validation_errors(expression: &str) -> Vec<String> {
    parse(expression).errors
}

/// Collapse whitespace outside quoted spans; idempotent.
pub fn normalize_expression(expression: &str) -> String {
    collapse_whitespace(expression)
}

/// Field names referenced through `${...}`.
///
/// A plain reference contributes its trimmed body. A reference whose body is
/// a call to a field-referencing function contributes the call's first
/// parameter; references nested inside a body are collected as well.
pub fn extract_field_references(text: &str) -> BTreeSet<String> {
    let mut references = BTreeSet::new();
    collect_references(text, &mut references);
    references
}

fn collect_references(text: &str, references: &mut BTreeSet<String>) {
    for span in find_references(text) {
        let body = span.body.trim();
        if body.is_empty() {
            continue;
        }
        if body.contains("${") {
            collect_references(body, references);
        }
        match as_call(body) {
            Some((name, args)) => {
                if is_field_referencing_function(&name) {
                    if let Some(first) = split_arguments(&args).first() {
                        if let Some(field) = first_parameter_field(first) {
                            references.insert(field);
                        }
                    }
                }
            }
            None if !body.contains("${") => {
                references.insert(body.to_string());
            }
            None => {}
        }
    }
}

fn first_parameter_field(parameter: &str) -> Option<String> {
    let parameter = parameter.trim();
    if parameter.starts_with("${") && parameter.ends_with('}') {
        let inner = parameter[2..parameter.len() - 1].trim();
        return (!inner.is_empty()).then(|| inner.to_string());
    }
    let name = strip_quotes(parameter).trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn extract_function_calls(
    expression: &str,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> Vec<FunctionCall> {
    find_calls(expression)
        .into_iter()
        .map(|call| {
            let lower = call.name.to_ascii_lowercase();
            if !KNOWN_FUNCTIONS.contains(&lower.as_str()) {
                warnings.push(format!("Unknown function: {}", call.name));
            }
            let parameters = split_arguments(&call.args);
            validate_function_parameters(&call.name, &parameters, errors);
            let referenced_fields = parameters
                .iter()
                .flat_map(|parameter| find_references(parameter))
                .map(|span| span.body.trim().to_string())
                .filter(|body| !body.is_empty())
                .collect();
            FunctionCall {
                name: call.name,
                parameters,
                referenced_fields,
            }
        })
        .collect()
}

fn validate_function_parameters(name: &str, parameters: &[String], errors: &mut Vec<String>) {
    let count = parameters.len();
    match name.to_ascii_lowercase().as_str() {
        "randomnumber" => {
            if count != 2 {
                errors.push("randomNumber requires exactly 2 parameters (min, max)".to_string());
            } else {
                for (index, parameter) in parameters.iter().enumerate() {
                    validate_numeric(
                        parameter,
                        &format!("randomNumber parameter {}", index + 1),
                        errors,
                    );
                }
            }
        }
        "substring" => {
            if !(2..=3).contains(&count) {
                errors.push("substring requires 2 or 3 parameters (value, start[, end])".to_string());
            } else {
                validate_numeric(&parameters[1], "substring start index", errors);
                if let Some(end) = parameters.get(2) {
                    validate_numeric(end, "substring end index", errors);
                }
            }
        }
        "uppercase" | "lowercase" | "length" => {
            if count != 1 {
                errors.push(format!("{name} requires exactly 1 parameter"));
            }
        }
        "replace" => {
            if count != 3 {
                errors.push(
                    "replace requires exactly 3 parameters (value, search, replacement)".to_string(),
                );
            }
        }
        "concat" => {
            if count < 2 {
                errors.push("concat requires at least 2 parameters".to_string());
            }
        }
        "padleft" | "padright" => {
            if !(2..=3).contains(&count) {
                errors.push(format!(
                    "{name} requires 2 or 3 parameters (value, length[, padChar])"
                ));
            } else {
                validate_numeric(&parameters[1], &format!("{name} length"), errors);
            }
        }
        "randomchoice" => {
            if count < 2 {
                errors.push("randomChoice requires at least 2 options".to_string());
            }
        }
        "conditional" => {
            if count != 3 {
                errors.push(
                    "conditional requires exactly 3 parameters (condition, valueIfTrue, valueIfFalse)"
                        .to_string(),
                );
            }
        }
        "formatdate" => {
            if !(1..=2).contains(&count) {
                errors.push("formatDate requires 1 or 2 parameters ([value,] format)".to_string());
            }
        }
        _ => {}
    }
}

/// Flag parameters that should be integers but are not.
///
/// References and identifier-like parameters are skipped: they may name a
/// field or a nested call resolved at evaluation time.
fn validate_numeric(parameter: &str, context: &str, errors: &mut Vec<String>) {
    let trimmed = parameter.trim();
    if trimmed.is_empty() || trimmed.contains("${") || is_identifier(trimmed) {
        return;
    }
    if as_call(trimmed).is_some() {
        return;
    }
    let digits: String = trimmed.chars().filter(|c| *c != '\'' && *c != '"').collect();
    if digits.parse::<i64>().is_err() {
        errors.push(format!("Invalid numeric value for {context}: {parameter}"));
    }
}

fn validate_syntax(expression: &str, errors: &mut Vec<String>) {
    if !is_balanced(expression, '{', '}') {
        errors.push("Unbalanced braces in expression".to_string());
    }
    if !is_balanced(expression, '(', ')') {
        errors.push("Unbalanced parentheses in expression".to_string());
    }
    if expression.contains("${}") {
        errors.push("Empty field reference found: ${}".to_string());
    }
    if has_malformed_reference(expression) {
        errors.push("Malformed field reference (missing braces or incomplete)".to_string());
    }
}

/// A `$` followed by something other than `{`, or a `${` never closed.
fn has_malformed_reference(expression: &str) -> bool {
    let chars: Vec<char> = expression.chars().collect();
    for (index, c) in chars.iter().enumerate() {
        if *c != '$' {
            continue;
        }
        match chars.get(index + 1) {
            Some('{') => {
                if !chars[index + 2..].contains(&'}') {
                    return true;
                }
            }
            Some(_) => return true,
            None => {}
        }
    }
    false
}

fn check_potential_issues(
    expression: &str,
    field_references: &BTreeSet<String>,
    function_calls: &[FunctionCall],
    warnings: &mut Vec<String>,
) {
    let length = expression.chars().count();
    if length > MAX_EXPRESSION_LENGTH {
        warnings.push(format!(
            "Expression is very long ({length} characters) - consider simplifying"
        ));
    }

    let nesting = max_nesting(expression);
    if nesting > MAX_NESTING {
        warnings.push(format!(
            "Deep function nesting detected (level {nesting}) - may impact performance"
        ));
    }

    for reference in field_references {
        if reference == "_self" || reference == "self" {
            warnings.push("Self-reference detected - this may cause issues".to_string());
        }
    }

    for reference in field_references {
        if reference.starts_with('_') && reference != ROW_INDEX_KEY && reference != TIMESTAMP_KEY {
            warnings.push(format!(
                "Field reference '{reference}' starts with underscore - ensure this is intended"
            ));
        }
    }

    let random_calls = function_calls
        .iter()
        .filter(|call| call.name.to_ascii_lowercase().contains("random"))
        .count();
    if random_calls > MAX_RANDOM_CALLS {
        warnings.push("Multiple random functions detected - this may impact consistency".to_string());
    }
}
