use std::sync::Arc;

use fieldsmith_core::{GenerationContext, ROW_INDEX_KEY, TIMESTAMP_KEY};
use tracing::{debug, warn};

use crate::errors::EvalError;
use crate::functions::{Argument, FunctionContext, FunctionRegistry};
use crate::scanner::{as_call, find_innermost_calls, find_references, split_arguments};

/// Upper bound on innermost-call expansion rounds per expression.
pub const MAX_FUNCTION_ITERATIONS: usize = 10;

const MAX_REFERENCE_DEPTH: usize = 32;

/// Evaluates expressions against one row.
///
/// The registry is shared read-only, so one evaluator serves any number of
/// concurrent rows.
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
    registry: Arc<FunctionRegistry>,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator {
    /// Evaluator over the built-in function set.
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::builtin())
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Evaluate an expression, embedding failures as marker text.
    pub fn evaluate(
        &self,
        expression: &str,
        context: &GenerationContext,
        rng: &mut dyn rand::RngCore,
    ) -> String {
        self.try_evaluate(expression, context, rng)
            .unwrap_or_else(|err| {
                warn!(expression = %expression, error = %err, "expression evaluation failed");
                format!("[EXPRESSION_ERROR: {err}]")
            })
    }

    /// Evaluate an expression in three passes: references, functions,
    /// then references produced by function output.
    pub fn try_evaluate(
        &self,
        expression: &str,
        context: &GenerationContext,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, EvalError> {
        if expression.trim().is_empty() {
            return Ok(String::new());
        }

        let resolved = resolve_references(expression, context, 0)?;
        let expanded = self.evaluate_functions(&resolved, context, rng);
        let result = resolve_references(&expanded, context, 0)?;

        debug!(expression = %expression, result = %result, "expression evaluated");
        Ok(result)
    }

    fn evaluate_functions(
        &self,
        text: &str,
        context: &GenerationContext,
        rng: &mut dyn rand::RngCore,
    ) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_FUNCTION_ITERATIONS {
            let calls = find_innermost_calls(&current);
            if calls.is_empty() {
                return current;
            }

            let mut next = String::with_capacity(current.len());
            let mut cursor = 0;
            for call in calls {
                next.push_str(&current[cursor..call.start]);
                next.push_str(&self.call_function(&call.name, &call.args, context, rng));
                cursor = call.end;
            }
            next.push_str(&current[cursor..]);

            if next == current {
                return current;
            }
            current = next;
        }

        if !find_innermost_calls(&current).is_empty() {
            warn!(
                expression = %text,
                iterations = MAX_FUNCTION_ITERATIONS,
                "function expansion stopped at the iteration limit"
            );
        }
        current
    }

    fn call_function(
        &self,
        name: &str,
        raw_args: &str,
        context: &GenerationContext,
        rng: &mut dyn rand::RngCore,
    ) -> String {
        let args: Vec<Argument> = split_arguments(raw_args)
            .iter()
            .map(|raw| Argument::from_raw(raw))
            .collect();
        let mut ctx = FunctionContext::new(context, rng);

        match self.registry.call(name, &args, &mut ctx) {
            None => {
                warn!(function = %name, "unknown function");
                format!("[UNKNOWN_FUNCTION:{name}]")
            }
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                warn!(function = %name, error = %err, "function call failed");
                format!("[FUNCTION_ERROR:{name}:{err}]")
            }
        }
    }

    /// Names of the available functions.
    pub fn available_functions(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// `description\nUsage: usage` for one function.
    pub fn function_documentation(&self, name: &str) -> Option<String> {
        self.registry.get(name).map(|function| function.documentation())
    }

    /// Documentation for every function, keyed by display name.
    pub fn all_function_documentation(&self) -> Vec<(&'static str, String)> {
        self.registry
            .iter()
            .map(|function| (function.name(), function.documentation()))
            .collect()
    }
}

/// Replace `${...}` references with row values, metadata or built-ins.
///
/// A reference whose body is a function call is unwrapped into that call so
/// the function pass evaluates it.
fn resolve_references(
    text: &str,
    context: &GenerationContext,
    depth: usize,
) -> Result<String, EvalError> {
    if depth > MAX_REFERENCE_DEPTH {
        return Err(EvalError::NestingTooDeep(MAX_REFERENCE_DEPTH));
    }

    let spans = find_references(text);
    if spans.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        let body = if span.body.contains("${") {
            resolve_references(&span.body, context, depth + 1)?
        } else {
            span.body.clone()
        };
        if as_call(&body).is_some() {
            out.push_str(body.trim());
        } else {
            out.push_str(&lookup_reference(&body, context));
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

fn lookup_reference(name: &str, context: &GenerationContext) -> String {
    if let Some(value) = context.field(name) {
        return value.to_string();
    }
    if let Some(value) = context.metadata.get(name) {
        return value;
    }
    match name.to_lowercase().as_str() {
        "_row" | "_rowindex" => context
            .metadata
            .get(ROW_INDEX_KEY)
            .unwrap_or_else(|| "0".to_string()),
        "_timestamp" => context.metadata.get(TIMESTAMP_KEY).unwrap_or_default(),
        _ => {
            warn!(reference = %name, "unknown field reference");
            format!("[UNKNOWN_FIELD:{name}]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::context;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn eval(expression: &str, fields: &[(&str, &str)]) -> String {
        let evaluator = ExpressionEvaluator::new();
        let context = context(4, fields);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        evaluator.evaluate(expression, &context, &mut rng)
    }

    #[test]
    fn resolves_plain_references() {
        assert_eq!(eval("${a}", &[("a", "x")]), "x");
        assert_eq!(eval("", &[]), "");
        assert!(eval("${missing}", &[]).contains("UNKNOWN_FIELD:missing"));
    }

    #[test]
    fn resolves_metadata_and_builtins() {
        assert_eq!(eval("row ${_rowIndex}", &[]), "row 4");
        assert_eq!(eval("${_row}/${_ROWINDEX}", &[]), "4/4");
        assert_eq!(eval("${_timestamp}", &[]), "2024-01-31T10:15:30.000");
    }

    #[test]
    fn evaluates_nested_calls_innermost_first() {
        assert_eq!(eval("uppercase(substring(${name},0,1))", &[("name", "bob")]), "B");
        assert_eq!(eval("${uppercase(${name})}!", &[("name", "bob")]), "BOB!");
        assert_eq!(eval("${substring(name, 1)}", &[("name", "bob")]), "ob");
        assert_eq!(
            eval("concat(${first}, ' ', uppercase(last))", &[("first", "Ada"), ("last", "Byron")]),
            "Ada BYRON"
        );
    }

    #[test]
    fn function_expansion_stops_after_the_iteration_limit() {
        let depth = MAX_FUNCTION_ITERATIONS + 2;
        let expression = format!("{}x{}", "lowercase(".repeat(depth), ")".repeat(depth));
        assert_eq!(eval(&expression, &[]), "lowercase(lowercase(x))");

        let within = format!("{}X{}", "lowercase(".repeat(3), ")".repeat(3));
        assert_eq!(eval(&within, &[]), "x");
    }

    #[test]
    fn oversized_padding_is_a_function_error() {
        let value = eval("padLeft('7', 99999999999, '0')", &[]);
        assert!(value.starts_with("[FUNCTION_ERROR:padLeft:"), "{value}");
    }

    #[test]
    fn substituted_values_with_a_leading_quote_stay_literal() {
        assert_eq!(eval("uppercase(${q})", &[("q", "'Twas")]), "'TWAS");
        assert_eq!(
            eval("concat(${a}, '-', ${b})", &[("a", "Ada"), ("b", "'90s")]),
            "Ada-'90s"
        );
    }

    #[test]
    fn marks_unknown_and_failing_functions() {
        assert_eq!(eval("shout(x)", &[]), "[UNKNOWN_FUNCTION:shout]");
        assert_eq!(
            eval("padLeft(7, x)", &[]),
            "[FUNCTION_ERROR:padLeft:Length parameter must be a valid integer]"
        );
        assert_eq!(
            eval("a-randomNumber(5, 1)-b", &[]),
            "a-[FUNCTION_ERROR:randomNumber:min must be less than max]-b"
        );
    }

    #[test]
    fn function_output_references_resolve_in_the_last_pass() {
        assert_eq!(eval("concat('$', '{a}')", &[("a", "late")]), "late");
    }

    #[test]
    fn values_with_apostrophes_stay_literal() {
        assert_eq!(eval("uppercase(${last})", &[("last", "O'Brien")]), "O'BRIEN");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(eval("Hello (world)", &[]), "Hello (world)");
    }

    #[test]
    fn documentation_lookup() {
        let evaluator = ExpressionEvaluator::new();
        assert_eq!(
            evaluator.function_documentation("PADRIGHT").as_deref(),
            Some("Pads the input value on the right to reach the specified length\nUsage: padRight(value, length, padChar)")
        );
        assert!(evaluator.function_documentation("nope").is_none());
        assert_eq!(evaluator.available_functions().len(), 12);
        assert_eq!(evaluator.all_function_documentation().len(), 12);
    }
}
