use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use fieldsmith_core::{FieldSpec, GenerationContext};
use fieldsmith_expr::ExpressionEvaluator;

use crate::errors::GenerationError;

pub mod contact;
pub mod custom;
pub mod location;
pub mod numeric;
pub mod person;
pub mod temporal;

/// Generator key whose options are an expression over the row.
pub const DEPENDENT_EXPRESSION_KEY: &str = "Dependent.expression";

/// What a generator may read while producing one value.
pub struct GeneratorContext<'a> {
    pub field: &'a FieldSpec,
    /// Values generated so far in this row, plus row metadata.
    pub row: &'a GenerationContext,
    pub evaluator: &'a ExpressionEvaluator,
}

impl GeneratorContext<'_> {
    pub fn row_index(&self) -> u64 {
        self.row.row_index()
    }

    /// Generation timestamp shared by every row of a run.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.row.metadata.timestamp
    }
}

/// An atomic value generator keyed by `Category.name`.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    /// Display name.
    fn name(&self) -> &'static str;

    fn category(&self) -> &'static str {
        self.id().split_once('.').map(|(category, _)| category).unwrap_or("")
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        options: Option<&str>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<String, GenerationError>;
}

/// Generators available to the engine, looked up by key.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        person::register(&mut registry);
        location::register(&mut registry);
        contact::register(&mut registry);
        numeric::register(&mut registry);
        temporal::register(&mut registry);
        custom::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn get(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Generator> {
        self.generators.values().map(|generator| generator.as_ref())
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

/// Options text with surrounding whitespace removed; blank means absent.
pub(crate) fn non_blank(options: Option<&str>) -> Option<&str> {
    options.map(str::trim).filter(|options| !options.is_empty())
}

/// Parse `min-max` into an ordered integer pair.
pub(crate) fn parse_range(options: &str) -> Result<(i64, i64), GenerationError> {
    let parts: Vec<&str> = options.split('-').collect();
    let [min, max] = parts.as_slice() else {
        return Err(GenerationError::invalid_options(
            "Options must contain a valid number range in the format 'min-max'.",
        ));
    };
    let (Ok(min), Ok(max)) = (min.trim().parse::<i64>(), max.trim().parse::<i64>()) else {
        return Err(GenerationError::invalid_options(
            "Options must contain valid integers.",
        ));
    };
    if min > max {
        return Err(GenerationError::invalid_options(
            "Minimum value cannot be greater than maximum value.",
        ));
    }
    Ok((min, max))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use fieldsmith_core::{FieldSpec, GenerationContext, RowMetadata};
    use fieldsmith_expr::ExpressionEvaluator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{GeneratorContext, GeneratorRegistry};
    use crate::errors::GenerationError;

    pub fn row(row_index: u64, fields: &[(&str, &str)]) -> GenerationContext {
        let timestamp = NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp");
        let mut context = GenerationContext::new(RowMetadata::new(row_index, timestamp));
        for (name, value) in fields {
            context.insert(*name, *value);
        }
        context
    }

    /// Run one generator by key with a fixed seed.
    pub fn generate(
        key: &str,
        options: Option<&str>,
        row: &GenerationContext,
        seed: u64,
    ) -> Result<String, GenerationError> {
        let registry = GeneratorRegistry::builtin();
        let generator = registry.get(key).expect("registered generator");
        let field = FieldSpec::new("field", key);
        let evaluator = ExpressionEvaluator::new();
        let ctx = GeneratorContext {
            field: &field,
            row,
            evaluator: &evaluator,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generator.generate(&ctx, options, &mut rng)
    }
}
