use rand::Rng;

use crate::errors::FunctionError;
use crate::functions::{Argument, ExpressionFunction, FunctionContext, FunctionRegistry};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function(Box::new(RandomNumberFunction));
    registry.register_function(Box::new(RandomChoiceFunction));
}

struct RandomNumberFunction;

impl ExpressionFunction for RandomNumberFunction {
    fn name(&self) -> &'static str {
        "randomNumber"
    }

    fn description(&self) -> &'static str {
        "Generates a random integer between min (inclusive) and max (exclusive)"
    }

    fn usage(&self) -> &'static str {
        "randomNumber(min, max)"
    }

    fn min_parameters(&self) -> usize {
        2
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(2)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let (Some(min), Some(max)) = (args[0].as_i64(), args[1].as_i64()) else {
            return Err(FunctionError::invalid("Both parameters must be valid integers"));
        };
        if min >= max {
            return Err(FunctionError::invalid("min must be less than max"));
        }
        Ok(ctx.rng.random_range(min..max).to_string())
    }
}

struct RandomChoiceFunction;

impl ExpressionFunction for RandomChoiceFunction {
    fn name(&self) -> &'static str {
        "randomChoice"
    }

    fn description(&self) -> &'static str {
        "Randomly selects one value from the provided options"
    }

    fn usage(&self) -> &'static str {
        "randomChoice(option1, option2, option3, ...)"
    }

    fn min_parameters(&self) -> usize {
        2
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let index = ctx.rng.random_range(0..args.len());
        Ok(ctx.value_of(&args[index]))
    }
}
