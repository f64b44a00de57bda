use fieldsmith_core::MAX_PADDED_LENGTH;

use crate::errors::FunctionError;
use crate::functions::{Argument, ExpressionFunction, FunctionContext, FunctionRegistry};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function(Box::new(SubstringFunction));
    registry.register_function(Box::new(UpperCaseFunction));
    registry.register_function(Box::new(LowerCaseFunction));
    registry.register_function(Box::new(ReplaceFunction));
    registry.register_function(Box::new(ConcatFunction));
    registry.register_function(Box::new(LengthFunction));
    registry.register_function(Box::new(PadFunction::LEFT));
    registry.register_function(Box::new(PadFunction::RIGHT));
}

struct SubstringFunction;

impl ExpressionFunction for SubstringFunction {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn description(&self) -> &'static str {
        "Extracts a substring from a value. Start is inclusive, end is exclusive."
    }

    fn usage(&self) -> &'static str {
        "substring(value, start) or substring(value, start, end)"
    }

    fn min_parameters(&self) -> usize {
        2
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(3)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let value = ctx.value_of(&args[0]);
        let start = parse_index(&args[1])?;
        let end = args.get(2).map(parse_index).transpose()?;
        Ok(substring(&value, start, end))
    }
}

fn parse_index(argument: &Argument) -> Result<i64, FunctionError> {
    argument
        .as_i64()
        .ok_or_else(|| FunctionError::invalid("Start and end parameters must be valid integers"))
}

/// Character-based substring with negative indices counted from the end.
///
/// Out-of-range bounds clamp; an empty range yields an empty string.
pub fn substring(value: &str, start: i64, end: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len() as i64;
    if len == 0 {
        return String::new();
    }

    let start = if start < 0 { len + start } else { start }.max(0);
    if start >= len {
        return String::new();
    }

    let end = match end {
        None => len,
        Some(end) => {
            let end = if end < 0 { len + end } else { end };
            if end <= start {
                return String::new();
            }
            end.min(len)
        }
    };

    chars[start as usize..end as usize].iter().collect()
}

struct UpperCaseFunction;

impl ExpressionFunction for UpperCaseFunction {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn description(&self) -> &'static str {
        "Converts the input value to uppercase"
    }

    fn usage(&self) -> &'static str {
        "uppercase(value)"
    }

    fn min_parameters(&self) -> usize {
        1
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        Ok(ctx.value_of(&args[0]).to_uppercase())
    }
}

struct LowerCaseFunction;

impl ExpressionFunction for LowerCaseFunction {
    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn description(&self) -> &'static str {
        "Converts the input value to lowercase"
    }

    fn usage(&self) -> &'static str {
        "lowercase(value)"
    }

    fn min_parameters(&self) -> usize {
        1
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        Ok(ctx.value_of(&args[0]).to_lowercase())
    }
}

struct ReplaceFunction;

impl ExpressionFunction for ReplaceFunction {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn description(&self) -> &'static str {
        "Replaces all occurrences of search text with replacement text"
    }

    fn usage(&self) -> &'static str {
        "replace(value, search, replacement)"
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
        let value = ctx.value_of(&args[0]);
        Ok(value.replace(args[1].text(), args[2].text()))
    }
}

struct ConcatFunction;

impl ExpressionFunction for ConcatFunction {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn description(&self) -> &'static str {
        "Concatenates multiple values into a single string"
    }

    fn usage(&self) -> &'static str {
        "concat(value1, value2, ...)"
    }

    fn min_parameters(&self) -> usize {
        2
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        Ok(args.iter().map(|arg| ctx.value_of(arg)).collect())
    }
}

struct LengthFunction;

impl ExpressionFunction for LengthFunction {
    fn name(&self) -> &'static str {
        "length"
    }

    fn description(&self) -> &'static str {
        "Returns the length of the input value"
    }

    fn usage(&self) -> &'static str {
        "length(value)"
    }

    fn min_parameters(&self) -> usize {
        1
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        Ok(ctx.value_of(&args[0]).chars().count().to_string())
    }
}

#[derive(Clone, Copy)]
enum PadSide {
    Left,
    Right,
}

struct PadFunction {
    side: PadSide,
}

impl PadFunction {
    const LEFT: PadFunction = PadFunction {
        side: PadSide::Left,
    };
    const RIGHT: PadFunction = PadFunction {
        side: PadSide::Right,
    };
}

impl ExpressionFunction for PadFunction {
    fn name(&self) -> &'static str {
        match self.side {
            PadSide::Left => "padLeft",
            PadSide::Right => "padRight",
        }
    }

    fn description(&self) -> &'static str {
        match self.side {
            PadSide::Left => "Pads the input value on the left to reach the specified length",
            PadSide::Right => "Pads the input value on the right to reach the specified length",
        }
    }

    fn usage(&self) -> &'static str {
        match self.side {
            PadSide::Left => "padLeft(value, length, padChar)",
            PadSide::Right => "padRight(value, length, padChar)",
        }
    }

    fn min_parameters(&self) -> usize {
        2
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(3)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let value = ctx.value_of(&args[0]);
        let target = args[1]
            .as_i64()
            .ok_or_else(|| FunctionError::invalid("Length parameter must be a valid integer"))?;
        let pad = args
            .get(2)
            .and_then(|arg| arg.text().chars().next())
            .unwrap_or(' ');

        if target > MAX_PADDED_LENGTH as i64 {
            return Err(FunctionError::invalid(format!(
                "Length parameter must not exceed {MAX_PADDED_LENGTH}"
            )));
        }

        let current = value.chars().count() as i64;
        if current >= target {
            return Ok(value);
        }
        let padding: String = std::iter::repeat_n(pad, (target - current) as usize).collect();
        Ok(match self.side {
            PadSide::Left => padding + &value,
            PadSide::Right => value + &padding,
        })
    }
}
