use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Case conversion applied before any other formatting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseTransform {
    Upper,
    Lower,
    Title,
    Camel,
    Pascal,
    Snake,
    Kebab,
}

impl CaseTransform {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseTransform::Upper => "UPPER",
            CaseTransform::Lower => "LOWER",
            CaseTransform::Title => "TITLE",
            CaseTransform::Camel => "CAMEL",
            CaseTransform::Pascal => "PASCAL",
            CaseTransform::Snake => "SNAKE",
            CaseTransform::Kebab => "KEBAB",
        }
    }
}

/// Side of the value that is dropped when a value exceeds its fixed length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruncateFrom {
    Start,
    #[default]
    End,
}

/// Side of the value that receives padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PadPosition {
    Left,
    #[default]
    Right,
}

/// Padding used when a value is shorter than its fixed length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Padding {
    /// Only the first character is used; defaults to a space.
    #[serde(default, alias = "char", skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default)]
    pub position: PadPosition,
}

impl Padding {
    pub fn pad_char(&self) -> char {
        self.character
            .as_deref()
            .and_then(|value| value.chars().next())
            .unwrap_or(' ')
    }
}

/// Longest value a fixed-length rule or a padding function may produce.
pub const MAX_PADDED_LENGTH: usize = 10_000;

/// Pad-or-truncate rule producing values of exactly `length` characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixedLength {
    /// Non-positive lengths disable the rule; lengths above
    /// [`MAX_PADDED_LENGTH`] are rejected.
    pub length: i64,
    #[serde(default)]
    pub truncate_from: TruncateFrom,
    #[serde(default, alias = "pad")]
    pub padding: Padding,
}

/// Post-formatting validation checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    /// Regular expression the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_rules: Vec<String>,
}

/// Formatting attributes for one precedence layer.
///
/// Every attribute is optional; an unset attribute inherits the value of a
/// lower precedence layer when layers are merged with [`FormattingOptions::overlay`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormattingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_transform: Option<CaseTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_length: Option<FixedLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
}

impl FormattingOptions {
    /// Copy every attribute that `other` sets over the attributes of `self`.
    pub fn overlay(&mut self, other: &FormattingOptions) {
        if other.case_transform.is_some() {
            self.case_transform = other.case_transform;
        }
        if other.prefix.is_some() {
            self.prefix.clone_from(&other.prefix);
        }
        if other.suffix.is_some() {
            self.suffix.clone_from(&other.suffix);
        }
        if other.fixed_length.is_some() {
            self.fixed_length.clone_from(&other.fixed_length);
        }
        if other.max_length.is_some() {
            self.max_length = other.max_length;
        }
        if other.validation.is_some() {
            self.validation.clone_from(&other.validation);
        }
    }

    /// Returns true when no attribute is set.
    pub fn is_empty(&self) -> bool {
        self == &FormattingOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_attributes_the_upper_layer_leaves_unset() {
        let mut merged = FormattingOptions {
            case_transform: Some(CaseTransform::Upper),
            prefix: Some("OLD-".to_string()),
            ..FormattingOptions::default()
        };
        merged.overlay(&FormattingOptions {
            prefix: Some("ID-".to_string()),
            ..FormattingOptions::default()
        });

        assert_eq!(merged.case_transform, Some(CaseTransform::Upper));
        assert_eq!(merged.prefix.as_deref(), Some("ID-"));
        assert!(merged.suffix.is_none());
    }

    #[test]
    fn deserializes_camel_case_and_aliases() {
        let options: FormattingOptions = serde_json::from_value(serde_json::json!({
            "caseTransform": "UPPER",
            "fixedLength": { "length": 5, "truncateFrom": "START", "pad": { "char": "0", "position": "LEFT" } },
            "maxLength": 3
        }))
        .expect("parse formatting");

        let fixed = options.fixed_length.expect("fixed length");
        assert_eq!(options.case_transform, Some(CaseTransform::Upper));
        assert_eq!(fixed.truncate_from, TruncateFrom::Start);
        assert_eq!(fixed.padding.pad_char(), '0');
        assert_eq!(fixed.padding.position, PadPosition::Left);
        assert_eq!(options.max_length, Some(3));
    }

    #[test]
    fn fixed_length_defaults() {
        let fixed: FixedLength =
            serde_json::from_value(serde_json::json!({ "length": 4 })).expect("parse");
        assert_eq!(fixed.truncate_from, TruncateFrom::End);
        assert_eq!(fixed.padding.position, PadPosition::Right);
        assert_eq!(fixed.padding.pad_char(), ' ');
    }
}
