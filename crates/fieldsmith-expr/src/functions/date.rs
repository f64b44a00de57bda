use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::FunctionError;
use crate::functions::{Argument, ExpressionFunction, FunctionContext, FunctionRegistry};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function(Box::new(FormatDateFunction));
}

struct FormatDateFunction;

impl ExpressionFunction for FormatDateFunction {
    fn name(&self) -> &'static str {
        "formatDate"
    }

    fn description(&self) -> &'static str {
        "Formats the current timestamp or a provided date value using the specified format"
    }

    fn usage(&self) -> &'static str {
        "formatDate(format) or formatDate(value, format)"
    }

    fn min_parameters(&self) -> usize {
        1
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(2)
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError> {
        let (timestamp, pattern) = match args {
            [format] => (ctx.context.metadata.timestamp, format.text()),
            [value, format] => (parse_date_time(&ctx.value_of(value))?, format.text()),
            _ => {
                return Err(FunctionError::invalid(
                    "formatDate requires 1 or 2 parameters: [value,] format",
                ));
            }
        };
        format_timestamp(timestamp, pattern)
    }
}

/// Parse an ISO local date-time, or an ISO date at midnight.
pub fn parse_date_time(value: &str) -> Result<NaiveDateTime, FunctionError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(Default::default()))
        })
        .map_err(|err| FunctionError::invalid(format!("Invalid date value or format: {err}")))
}

/// Format a timestamp with a strftime pattern (any pattern containing `%`)
/// or a date pattern made of letters such as `yyyy-MM-dd HH:mm`.
pub fn format_timestamp(timestamp: NaiveDateTime, pattern: &str) -> Result<String, FunctionError> {
    let strftime = if pattern.contains('%') {
        pattern.to_string()
    } else {
        translate_pattern(pattern)?
    };

    if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
        return Err(FunctionError::invalid(format!(
            "Error formatting date: invalid format '{pattern}'"
        )));
    }

    let mut out = String::new();
    write!(out, "{}", timestamp.format(&strftime)).map_err(|_| {
        FunctionError::invalid(format!("Error formatting date: invalid format '{pattern}'"))
    })?;
    Ok(out)
}

/// Translate letter patterns (`yyyy`, `MM`, `dd`, `HH`, `mm`, `ss`, `SSS`,
/// `a`, `EEE`, quoted literals) into strftime syntax.
fn translate_pattern(pattern: &str) -> Result<String, FunctionError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut index = 0;

    while index < chars.len() {
        let c = chars[index];

        if c == '\'' {
            if chars.get(index + 1) == Some(&'\'') {
                out.push('\'');
                index += 2;
                continue;
            }
            index += 1;
            while index < chars.len() {
                if chars[index] == '\'' {
                    if chars.get(index + 1) == Some(&'\'') {
                        out.push('\'');
                        index += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[index]);
                index += 1;
            }
            index += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            index += 1;
            continue;
        }

        let run = chars[index..].iter().take_while(|next| **next == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('D', _) => "%j",
            _ => {
                return Err(FunctionError::invalid(format!(
                    "Error formatting date: Unknown pattern letter: {c}"
                )));
            }
        };
        out.push_str(spec);
        index += run;
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
