use rand::Rng;
use rand::distr::Alphanumeric;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry, non_blank, parse_range};

const DEFAULT_STRING_LENGTH: usize = 10;
const RESET_KEYWORD: &str = "RESET";

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(RangeNumberGenerator));
    registry.register_generator(Box::new(IncrementalNumberGenerator));
    registry.register_generator(Box::new(RandomStringGenerator));
    registry.register_generator(Box::new(BooleanGenerator {
        id: "Boolean.trueFalse",
        name: "True/False",
        labels: ("True", "False"),
    }));
    registry.register_generator(Box::new(BooleanGenerator {
        id: "Boolean.trueFalseYN",
        name: "Y/N",
        labels: ("Y", "N"),
    }));
}

/// Uniform integer in an inclusive `min-max` range.
struct RangeNumberGenerator;

impl Generator for RangeNumberGenerator {
    fn id(&self) -> &'static str {
        "Number.range"
    }

    fn name(&self) -> &'static str {
        "Number Range"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let options = non_blank(options).ok_or_else(|| {
            GenerationError::invalid_options(
                "Options must contain a valid number range in the format 'min-max'.",
            )
        })?;
        let (min, max) = parse_range(options)?;
        Ok(rng.random_range(min..=max).to_string())
    }
}

/// `min + row index`. Past `max` the sequence is exhausted, or wraps back to
/// `min` when the options carry `RESET`.
struct IncrementalNumberGenerator;

impl Generator for IncrementalNumberGenerator {
    fn id(&self) -> &'static str {
        "Number.incremental"
    }

    fn name(&self) -> &'static str {
        "Incremental Number"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let options = non_blank(options).ok_or_else(|| {
            GenerationError::invalid_options(
                "Options must contain a valid number range in the format 'min-max'. Optionally, use 'RESET' to restart the sequence.",
            )
        })?;
        let wraps = options.contains(RESET_KEYWORD);
        let (min, max) = parse_range(options.replace(RESET_KEYWORD, "").trim())?;

        let offset = i128::from(ctx.row_index());
        let span = i128::from(max) - i128::from(min) + 1;
        let value = if wraps {
            i128::from(min) + offset % span
        } else {
            i128::from(min) + offset
        };
        if value > i128::from(max) {
            return Err(GenerationError::invalid_options(
                "Exceeded maximum value in incremental mode.",
            ));
        }
        Ok(value.to_string())
    }
}

/// Alphanumeric text; the options hold the length (default 10).
struct RandomStringGenerator;

impl Generator for RandomStringGenerator {
    fn id(&self) -> &'static str {
        "String.random"
    }

    fn name(&self) -> &'static str {
        "Random String"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let length = match non_blank(options) {
            None => DEFAULT_STRING_LENGTH,
            Some(options) => {
                let length: i64 = options.parse().map_err(|_| {
                    GenerationError::invalid_options(
                        "Options must contain a valid integer for string length.",
                    )
                })?;
                usize::try_from(length)
                    .ok()
                    .filter(|length| *length >= 1)
                    .ok_or_else(|| {
                        GenerationError::invalid_options("Length must be a positive integer.")
                    })?
            }
        };
        Ok((0..length)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect())
    }
}

struct BooleanGenerator {
    id: &'static str,
    name: &'static str,
    labels: (&'static str, &'static str),
}

impl Generator for BooleanGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        _options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError> {
        let (yes, no) = self.labels;
        let label = if rng.random_bool(0.5) { yes } else { no };
        Ok(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::generators::test_support::{generate, row};

    #[test]
    fn range_is_inclusive() {
        let row = row(0, &[]);
        let mut seen = std::collections::BTreeSet::new();
        for seed in 0..200 {
            let value: i64 = generate("Number.range", Some("1-3"), &row, seed)
                .expect("range")
                .parse()
                .expect("integer");
            seen.insert(value);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn range_rejects_bad_options() {
        let row = row(0, &[]);
        assert!(generate("Number.range", None, &row, 0).is_err());
        assert!(generate("Number.range", Some("9-1"), &row, 0).is_err());
        assert!(generate("Number.range", Some("a-b"), &row, 0).is_err());
    }

    #[test]
    fn incremental_follows_the_row_index() {
        let value = |index, options| generate("Number.incremental", Some(options), &row(index, &[]), 0);
        assert_eq!(value(0, "100-102").ok().as_deref(), Some("100"));
        assert_eq!(value(2, "100-102").ok().as_deref(), Some("102"));
        assert_eq!(
            value(3, "100-102").map_err(|err| err.to_string()),
            Err("Exceeded maximum value in incremental mode.".to_string())
        );
        assert_eq!(value(3, "100-102 RESET").ok().as_deref(), Some("100"));
        assert_eq!(value(7, "RESET 1-3").ok().as_deref(), Some("2"));
    }

    #[test]
    fn random_string_length() {
        let row = row(0, &[]);
        let default = generate("String.random", None, &row, 1).expect("string");
        assert_eq!(default.len(), 10);
        assert!(default.chars().all(|ch| ch.is_ascii_alphanumeric()));
        assert_eq!(generate("String.random", Some(" 4 "), &row, 1).expect("string").len(), 4);
        assert!(generate("String.random", Some("0"), &row, 1).is_err());
        assert!(generate("String.random", Some("many"), &row, 1).is_err());
    }

    #[test]
    fn booleans_use_their_labels() {
        let row = row(0, &[]);
        for seed in 0..10 {
            let value = generate("Boolean.trueFalse", None, &row, seed).expect("bool");
            assert!(value == "True" || value == "False");
            let value = generate("Boolean.trueFalseYN", None, &row, seed).expect("bool");
            assert!(value == "Y" || value == "N");
        }
    }
}
