use std::sync::OnceLock;

use fieldsmith_core::{
    CaseTransform, FixedLength, FormattingOptions, MAX_PADDED_LENGTH, PadPosition, TruncateFrom,
    ValidationRule,
};
use regex::Regex;
use tracing::warn;

use crate::errors::FormatError;

/// Value written when a formatted value fails validation.
pub const VALIDATION_FAILED: &str = "[VALIDATION_FAILED]";
/// Value written when formatting itself cannot run.
pub const FORMAT_ERROR: &str = "[FORMAT_ERROR]";

const DEFAULT_PREVIEW_SAMPLE: &str = "SampleText123";

/// Effective formatting for one field, with its validation pattern compiled.
#[derive(Debug, Clone)]
pub struct FieldFormatter {
    options: FormattingOptions,
    pattern: Option<Regex>,
}

impl FieldFormatter {
    pub fn new(options: FormattingOptions) -> Result<Self, FormatError> {
        if let Some(fixed) = &options.fixed_length {
            if fixed.length > MAX_PADDED_LENGTH as i64 {
                return Err(FormatError::FixedLengthTooLarge {
                    length: fixed.length,
                    limit: MAX_PADDED_LENGTH,
                });
            }
        }
        let pattern = options
            .validation
            .as_ref()
            .and_then(|validation| validation.pattern.as_deref())
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    FormatError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .transpose()?;
        Ok(Self { options, pattern })
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Apply case, affixes, fixed length, max length, then validation.
    pub fn format(&self, value: &str) -> String {
        let options = &self.options;
        let mut result = match options.case_transform {
            Some(case) => apply_case_transform(value, case),
            None => value.to_string(),
        };

        if let Some(prefix) = options.prefix.as_deref() {
            result.insert_str(0, prefix);
        }
        if let Some(suffix) = options.suffix.as_deref() {
            result.push_str(suffix);
        }
        if let Some(fixed) = &options.fixed_length {
            result = apply_fixed_length(&result, fixed);
        }
        if let Some(max_length) = options.max_length {
            result = clamp_length(&result, max_length);
        }

        if let Some(validation) = &options.validation {
            if !self.is_valid(&result, validation) {
                warn!(value = %result, "formatted value failed validation");
                return VALIDATION_FAILED.to_string();
            }
        }
        result
    }

    fn is_valid(&self, value: &str, validation: &ValidationRule) -> bool {
        let length = value.chars().count() as i64;
        if validation.min_length.is_some_and(|min| length < min) {
            return false;
        }
        if validation.max_length.is_some_and(|max| length > max) {
            return false;
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return false;
            }
        }
        validation
            .custom_rules
            .iter()
            .all(|rule| custom_rule_passes(value, rule))
    }
}

/// Format a value, surfacing an unusable validation pattern as an error.
pub fn try_apply_formatting(value: &str, options: &FormattingOptions) -> Result<String, FormatError> {
    Ok(FieldFormatter::new(options.clone())?.format(value))
}

/// Format a value; failures become [`FORMAT_ERROR`] or [`VALIDATION_FAILED`].
pub fn apply_formatting(value: &str, options: &FormattingOptions) -> String {
    try_apply_formatting(value, options).unwrap_or_else(|err| {
        warn!(value = %value, error = %err, "failed to apply formatting");
        FORMAT_ERROR.to_string()
    })
}

pub fn apply_formatting_batch<S: AsRef<str>>(values: &[S], options: &FormattingOptions) -> Vec<String> {
    match FieldFormatter::new(options.clone()) {
        Ok(formatter) => values
            .iter()
            .map(|value| formatter.format(value.as_ref()))
            .collect(),
        Err(err) => {
            warn!(error = %err, count = values.len(), "failed to apply formatting to batch");
            vec![FORMAT_ERROR.to_string(); values.len()]
        }
    }
}

/// Format a sample value, `SampleText123` when none is given.
pub fn preview_formatting(sample: Option<&str>, options: &FormattingOptions) -> String {
    let sample = sample
        .filter(|sample| !sample.is_empty())
        .unwrap_or(DEFAULT_PREVIEW_SAMPLE);
    apply_formatting(sample, options)
}

/// One-line human summary of the attributes set in `options`.
pub fn describe_formatting(options: &FormattingOptions) -> String {
    let mut parts = Vec::new();
    if let Some(case) = options.case_transform {
        parts.push(format!("Case: {}", case.as_str()));
    }
    if options.prefix.is_some() || options.suffix.is_some() {
        let quoted = |value: &Option<String>| {
            value
                .as_deref()
                .map(|value| format!("'{value}'"))
                .unwrap_or_default()
        };
        parts.push(format!(
            "Affix: {} + value + {}",
            quoted(&options.prefix),
            quoted(&options.suffix)
        ));
    }
    if let Some(fixed) = &options.fixed_length {
        parts.push(format!("Fixed length: {} chars", fixed.length));
    }
    if let Some(max_length) = options.max_length {
        parts.push(format!("Max length: {max_length} chars"));
    }
    if options.validation.is_some() {
        parts.push("Validation: enabled".to_string());
    }

    if parts.is_empty() {
        "No formatting applied".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn apply_case_transform(value: &str, case: CaseTransform) -> String {
    match case {
        CaseTransform::Upper => value.to_uppercase(),
        CaseTransform::Lower => value.to_lowercase(),
        CaseTransform::Title => to_title_case(value),
        CaseTransform::Camel => to_camel_case(value),
        CaseTransform::Pascal => to_pascal_case(value),
        CaseTransform::Snake => join_words_lowercase(value, "_"),
        CaseTransform::Kebab => join_words_lowercase(value, "-"),
    }
}

fn to_title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut next_upper = true;
    for ch in value.chars() {
        if ch.is_whitespace() {
            next_upper = true;
            out.push(ch);
        } else if next_upper {
            out.extend(ch.to_uppercase());
            next_upper = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

fn to_camel_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (index, word) in value.split_whitespace().enumerate() {
        let word = word.to_lowercase();
        if index == 0 {
            out.push_str(&word);
        } else {
            out.push_str(&capitalize(&word));
        }
    }
    out
}

fn to_pascal_case(value: &str) -> String {
    capitalize(&to_camel_case(value))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join_words_lowercase(value: &str, separator: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(separator)
}

fn apply_fixed_length(value: &str, fixed: &FixedLength) -> String {
    let Ok(target) = usize::try_from(fixed.length) else {
        return value.to_string();
    };
    let length = value.chars().count();
    if target == 0 || length == target {
        return value.to_string();
    }

    if length > target {
        return match fixed.truncate_from {
            TruncateFrom::Start => value.chars().skip(length - target).collect(),
            TruncateFrom::End => value.chars().take(target).collect(),
        };
    }

    let padding: String = std::iter::repeat_n(fixed.padding.pad_char(), target - length).collect();
    match fixed.padding.position {
        PadPosition::Left => format!("{padding}{value}"),
        PadPosition::Right => format!("{value}{padding}"),
    }
}

fn clamp_length(value: &str, max_length: i64) -> String {
    match usize::try_from(max_length) {
        Ok(max) if max > 0 => value.chars().take(max).collect(),
        _ => value.to_string(),
    }
}

fn custom_rule_passes(value: &str, rule: &str) -> bool {
    let rule = rule.trim().to_lowercase();
    match rule.as_str() {
        "" => true,
        "not_empty" => !value.trim().is_empty(),
        "no_spaces" => !value.contains(' '),
        "alphanumeric" => !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()),
        "alphabetic" => !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphabetic()),
        "numeric" => !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit()),
        "email_format" => matches_builtin(&EMAIL_PATTERN, EMAIL_REGEX, value),
        "phone_format" => matches_builtin(&PHONE_PATTERN, PHONE_REGEX, value),
        other => {
            warn!(rule = %other, "unknown validation rule");
            true
        }
    }
}

const EMAIL_REGEX: &str = r"^[A-Za-z0-9+_.-]+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})$";
const PHONE_REGEX: &str = r"^[+]?[0-9\-\(\)\s]{10,}$";

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn matches_builtin(cell: &OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    match cell.get_or_init(|| Regex::new(pattern).ok()) {
        Some(regex) => regex.is_match(value),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsmith_core::Padding;

    fn fixed(length: i64, truncate_from: TruncateFrom, padding: Padding) -> FixedLength {
        FixedLength {
            length,
            truncate_from,
            padding,
        }
    }

    fn validation(rules: &[&str]) -> FormattingOptions {
        FormattingOptions {
            validation: Some(ValidationRule {
                custom_rules: rules.iter().map(|rule| rule.to_string()).collect(),
                ..ValidationRule::default()
            }),
            ..FormattingOptions::default()
        }
    }

    #[test]
    fn case_transforms() {
        let value = "  hello   wORLD again ";
        assert_eq!(apply_case_transform("hello wORLD", CaseTransform::Title), "Hello World");
        assert_eq!(apply_case_transform(value, CaseTransform::Camel), "helloWorldAgain");
        assert_eq!(apply_case_transform(value, CaseTransform::Pascal), "HelloWorldAgain");
        assert_eq!(apply_case_transform(value, CaseTransform::Snake), "hello_world_again");
        assert_eq!(apply_case_transform(value, CaseTransform::Kebab), "hello-world-again");
        assert_eq!(apply_case_transform("straße", CaseTransform::Upper), "STRASSE");
        assert_eq!(apply_case_transform("", CaseTransform::Pascal), "");
    }

    #[test]
    fn oversized_fixed_lengths_are_rejected() {
        let options = |length| FormattingOptions {
            fixed_length: Some(fixed(length, TruncateFrom::End, Padding::default())),
            ..FormattingOptions::default()
        };

        let at_limit = FieldFormatter::new(options(MAX_PADDED_LENGTH as i64)).expect("at limit");
        assert_eq!(at_limit.format("x").chars().count(), MAX_PADDED_LENGTH);

        assert!(matches!(
            FieldFormatter::new(options(99_999_999_999)),
            Err(FormatError::FixedLengthTooLarge { length: 99_999_999_999, .. })
        ));
        assert_eq!(apply_formatting("x", &options(99_999_999_999)), FORMAT_ERROR);
    }

    #[test]
    fn fixed_length_pads_and_truncates() {
        let left_zero = Padding {
            character: Some("0".to_string()),
            position: PadPosition::Left,
        };
        assert_eq!(apply_fixed_length("42", &fixed(5, TruncateFrom::End, left_zero)), "00042");
        assert_eq!(
            apply_fixed_length("42", &fixed(4, TruncateFrom::End, Padding::default())),
            "42  "
        );
        assert_eq!(
            apply_fixed_length("abcdef", &fixed(3, TruncateFrom::Start, Padding::default())),
            "def"
        );
        assert_eq!(
            apply_fixed_length("abcdef", &fixed(3, TruncateFrom::End, Padding::default())),
            "abc"
        );
        assert_eq!(
            apply_fixed_length("abc", &fixed(0, TruncateFrom::End, Padding::default())),
            "abc"
        );
        assert_eq!(
            apply_fixed_length("abc", &fixed(-2, TruncateFrom::End, Padding::default())),
            "abc"
        );
    }

    #[test]
    fn affixes_wrap_the_cased_value() {
        let options = FormattingOptions {
            case_transform: Some(CaseTransform::Lower),
            prefix: Some("ID-".to_string()),
            suffix: Some("-X".to_string()),
            ..FormattingOptions::default()
        };
        assert_eq!(apply_formatting("AbC", &options), "ID-abc-X");
    }

    #[test]
    fn validation_failure_is_a_sentinel() {
        let options = FormattingOptions {
            validation: Some(ValidationRule {
                min_length: Some(3),
                pattern: Some("[A-Z]+".to_string()),
                ..ValidationRule::default()
            }),
            ..FormattingOptions::default()
        };
        assert_eq!(apply_formatting("ABCD", &options), "ABCD");
        assert_eq!(apply_formatting("AB", &options), VALIDATION_FAILED);
        assert_eq!(apply_formatting("ABCd", &options), VALIDATION_FAILED);
    }

    #[test]
    fn invalid_pattern_is_a_format_error() {
        let options = FormattingOptions {
            validation: Some(ValidationRule {
                pattern: Some("([a-z".to_string()),
                ..ValidationRule::default()
            }),
            ..FormattingOptions::default()
        };
        assert!(matches!(
            try_apply_formatting("abc", &options),
            Err(FormatError::InvalidPattern { .. })
        ));
        assert_eq!(apply_formatting("abc", &options), FORMAT_ERROR);
        assert_eq!(
            apply_formatting_batch(&["a", "b"], &options),
            vec![FORMAT_ERROR, FORMAT_ERROR]
        );
    }

    #[test]
    fn custom_rules() {
        assert_eq!(apply_formatting("abc123", &validation(&["alphanumeric", "NO_SPACES"])), "abc123");
        assert_eq!(apply_formatting("abc 123", &validation(&["no_spaces"])), VALIDATION_FAILED);
        assert_eq!(apply_formatting("12a", &validation(&["numeric"])), VALIDATION_FAILED);
        assert_eq!(apply_formatting("   ", &validation(&["not_empty"])), VALIDATION_FAILED);
        assert_eq!(apply_formatting("abc", &validation(&["alphabetic", "mystery"])), "abc");
        assert_eq!(
            apply_formatting("jo.doe@mail.example.com", &validation(&["email_format"])),
            "jo.doe@mail.example.com"
        );
        assert_eq!(apply_formatting("jo@localhost", &validation(&["email_format"])), VALIDATION_FAILED);
        assert_eq!(
            apply_formatting("+1 (555) 010-2030", &validation(&["phone_format"])),
            "+1 (555) 010-2030"
        );
        assert_eq!(apply_formatting("555-0102", &validation(&["phone_format"])), VALIDATION_FAILED);
    }

    #[test]
    fn preview_and_describe() {
        let options = FormattingOptions {
            case_transform: Some(CaseTransform::Upper),
            prefix: Some("p".to_string()),
            max_length: Some(8),
            ..FormattingOptions::default()
        };
        assert_eq!(preview_formatting(None, &options), "pSAMPLET");
        assert_eq!(preview_formatting(Some("ab"), &options), "pAB");
        assert_eq!(
            describe_formatting(&options),
            "Case: UPPER, Affix: 'p' + value + , Max length: 8 chars"
        );
        assert_eq!(describe_formatting(&FormattingOptions::default()), "No formatting applied");
    }
}
