use crate::errors::FunctionError;
use crate::functions::{Argument, ExpressionFunction, FunctionContext, FunctionRegistry};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function(Box::new(ConditionalFunction));
}

struct ConditionalFunction;

impl ExpressionFunction for ConditionalFunction {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn description(&self) -> &'static str {
        "Returns different values based on a condition evaluation"
    }

    fn usage(&self) -> &'static str {
        "conditional(condition, valueIfTrue, valueIfFalse)"
    }

    fn min_parameters(&self) -> usize {
        3
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(3)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let condition = ctx.value_of(&args[0]);
        let chosen = if evaluate_condition(&condition, ctx.row_index()) {
            &args[1]
        } else {
            &args[2]
        };
        Ok(ctx.value_of(chosen))
    }
}

/// Evaluate the condition grammar of `conditional`.
///
/// `true`/`1` and `false`/`0` are literals; `rowindex even|odd|>N|<N`
/// compares the row index; any other non-empty text is true.
pub fn evaluate_condition(condition: &str, row_index: u64) -> bool {
    let condition = condition.trim().to_lowercase();
    match condition.as_str() {
        "true" | "1" => return true,
        "false" | "0" => return false,
        _ => {}
    }

    if let Some(rest) = condition.strip_prefix("rowindex") {
        if rest.contains("even") {
            return row_index % 2 == 0;
        }
        if rest.contains("odd") {
            return row_index % 2 == 1;
        }
        if let Some((_, threshold)) = rest.split_once('>') {
            if let Ok(threshold) = threshold.trim().parse::<i64>() {
                return (row_index as i64) > threshold;
            }
        } else if let Some((_, threshold)) = rest.split_once('<') {
            if let Ok(threshold) = threshold.trim().parse::<i64>() {
                return (row_index as i64) < threshold;
            }
        }
    }

    !condition.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{args, context};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn literals_and_row_index_conditions() {
        assert!(evaluate_condition(" TRUE ", 0));
        assert!(evaluate_condition("1", 0));
        assert!(!evaluate_condition("false", 0));
        assert!(!evaluate_condition("0", 0));
        assert!(evaluate_condition("rowIndex even", 4));
        assert!(!evaluate_condition("rowindex even", 3));
        assert!(evaluate_condition("rowindex odd", 3));
        assert!(evaluate_condition("rowindex > 5", 6));
        assert!(!evaluate_condition("rowindex > 5", 5));
        assert!(evaluate_condition("rowindex<2", 1));
        assert!(evaluate_condition("anything", 0));
        assert!(!evaluate_condition("   ", 0));
    }

    #[test]
    fn malformed_row_index_comparison_falls_back_to_non_empty() {
        assert!(evaluate_condition("rowindex > many", 0));
    }

    #[test]
    fn conditional_picks_branch_and_resolves_fields() {
        let registry = FunctionRegistry::builtin();
        let context = context(2, &[("active", "false"), ("label", "Active")]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = FunctionContext::new(&context, &mut rng);

        let inactive = registry
            .call("conditional", &args(&["active", "label", "'Inactive'"]), &mut ctx)
            .expect("registered");
        assert_eq!(inactive.as_deref(), Ok("Inactive"));

        let even = registry
            .call("conditional", &args(&["rowindex even", "label", "'x'"]), &mut ctx)
            .expect("registered");
        assert_eq!(even.as_deref(), Ok("Active"));
    }
}
