use rand::Rng;
use rand_regex::Regex as RandRegex;

use crate::errors::GenerationError;
use crate::generators::contact::random_digit;
use crate::generators::{
    DEPENDENT_EXPRESSION_KEY, Generator, GeneratorContext, GeneratorRegistry, non_blank,
};

const REGEX_MAX_REPEAT: u32 = 10;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(BothifyGenerator));
    registry.register_generator(Box::new(RegexGenerator));
    registry.register_generator(Box::new(DependentExpressionGenerator));
}

/// Replaces `#` with a digit and `?` with a letter in the options pattern.
struct BothifyGenerator;

impl Generator for BothifyGenerator {
    fn id(&self) -> &'static str {
        "Custom.bothify"
    }

    fn name(&self) -> &'static str {
        "Custom Pattern"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let Some(pattern) = options.filter(|pattern| !pattern.is_empty()) else {
            return Ok(String::new());
        };
        Ok(bothify(pattern, rng))
    }
}

pub fn bothify(pattern: &str, rng: &mut dyn rand::RngCore) -> String {
    pattern
        .chars()
        .map(|ch| match ch {
            '#' => random_digit(rng),
            '?' => char::from(b'a' + rng.random_range(0..26u8)),
            other => other,
        })
        .collect()
}

/// Random text matching the regular expression in the options.
struct RegexGenerator;

impl Generator for RegexGenerator {
    fn id(&self) -> &'static str {
        "Custom.regex"
    }

    fn name(&self) -> &'static str {
        "Custom Regex"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let pattern = options.filter(|pattern| !pattern.is_empty()).ok_or_else(|| {
            GenerationError::invalid_options("Options must contain a valid regex pattern.")
        })?;
        let regex = RandRegex::compile(pattern, REGEX_MAX_REPEAT).map_err(|err| {
            GenerationError::invalid_options(format!(
                "invalid regex pattern for Custom.regex: {err}"
            ))
        })?;
        let value: String = rng.sample(regex);
        Ok(value)
    }
}

/// Evaluates the options as an expression over the row so far.
struct DependentExpressionGenerator;

impl Generator for DependentExpressionGenerator {
    fn id(&self) -> &'static str {
        DEPENDENT_EXPRESSION_KEY
    }

    fn name(&self) -> &'static str {
        "Dependent Field"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let expression = non_blank(options).ok_or_else(|| {
            GenerationError::invalid_options("Dependent field requires expression in options")
        })?;
        Ok(ctx.evaluator.evaluate(expression, ctx.row, rng))
    }
}
