use std::collections::BTreeMap;

use fieldsmith_core::GenerationContext;
use tracing::debug;

use crate::errors::FunctionError;
use crate::scanner::{is_quoted, strip_quotes};

pub mod date;
pub mod logic;
pub mod random;
pub mod text;

/// One parameter of a function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    text: String,
    quoted: bool,
}

impl Argument {
    /// Build an argument from its raw, trimmed source text.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        Self {
            text: strip_quotes(raw).to_string(),
            quoted: is_quoted(raw),
        }
    }

    /// Literal text with surrounding quotes removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Parse the literal text as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.text.trim().parse().ok()
    }
}

/// Execution context handed to every function call.
pub struct FunctionContext<'a> {
    pub context: &'a GenerationContext,
    pub rng: &'a mut dyn rand::RngCore,
}

impl<'a> FunctionContext<'a> {
    pub fn new(context: &'a GenerationContext, rng: &'a mut dyn rand::RngCore) -> Self {
        Self { context, rng }
    }

    /// Value of an argument: the row value when an unquoted argument names a
    /// field of the row, the literal text otherwise.
    pub fn value_of(&self, argument: &Argument) -> String {
        if !argument.is_quoted() {
            if let Some(value) = self.context.field(argument.text()) {
                return value.to_string();
            }
        }
        argument.text().to_string()
    }

    pub fn row_index(&self) -> u64 {
        self.context.row_index()
    }
}

/// A named string function callable from expressions.
pub trait ExpressionFunction: Send + Sync {
    /// Name as written in expressions; lookup is case-insensitive.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn usage(&self) -> &'static str;

    fn min_parameters(&self) -> usize {
        0
    }

    /// Maximum parameter count; `None` means unbounded.
    fn max_parameters(&self) -> Option<usize> {
        None
    }

    fn execute(
        &self,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<String, FunctionError>;

    /// Check a parameter count against the declared bounds.
    fn validate_parameters(&self, count: usize) -> Result<(), FunctionError> {
        let min = self.min_parameters();
        let max = self.max_parameters();
        let within = count >= min && max.is_none_or(|max| count <= max);
        if within {
            return Ok(());
        }
        Err(FunctionError::Arity {
            name: self.name(),
            expected: describe_arity(min, max),
            actual: count,
        })
    }

    fn documentation(&self) -> String {
        format!("{}\nUsage: {}", self.description(), self.usage())
    }
}

fn describe_arity(min: usize, max: Option<usize>) -> String {
    let noun = |count: usize| if count == 1 { "parameter" } else { "parameters" };
    match max {
        None => format!("at least {min} {}", noun(min)),
        Some(max) if max == min => format!("exactly {min} {}", noun(min)),
        Some(max) if max == min + 1 => format!("{min} or {max} parameters"),
        Some(max) => format!("between {min} and {max} parameters"),
    }
}

/// Registry of expression functions keyed by lowercase name.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Box<dyn ExpressionFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in function set.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        text::register(&mut registry);
        random::register(&mut registry);
        date::register(&mut registry);
        logic::register(&mut registry);
        debug!(functions = registry.len(), "expression functions registered");
        registry
    }

    pub fn register_function(&mut self, function: Box<dyn ExpressionFunction>) {
        self.functions
            .insert(function.name().to_ascii_lowercase(), function);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExpressionFunction> {
        self.functions
            .get(&name.to_ascii_lowercase())
            .map(|function| function.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Display names of all functions, sorted case-insensitively.
    pub fn names(&self) -> Vec<&'static str> {
        self.functions.values().map(|function| function.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ExpressionFunction> {
        self.functions.values().map(|function| function.as_ref())
    }

    /// Validate arity then execute the named function.
    ///
    /// Returns `None` when no function has that name.
    pub fn call(
        &self,
        name: &str,
        args: &[Argument],
        ctx: &mut FunctionContext<'_>,
    ) -> Option<Result<String, FunctionError>> {
        let function = self.get(name)?;
        Some(
            function
                .validate_parameters(args.len())
                .and_then(|()| function.execute(args, ctx)),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{args, context};
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = FunctionRegistry::builtin();
        assert!(registry.contains("PADLEFT"));
        assert!(registry.contains("randomnumber"));
        assert_eq!(registry.len(), 12);
        assert!(registry.names().contains(&"formatDate"));
    }

    #[test]
    fn arity_is_checked_before_execution() {
        let registry = FunctionRegistry::builtin();
        let context = context(0, &[]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ctx = FunctionContext::new(&context, &mut rng);

        let result = registry
            .call("substring", &args(&["abc"]), &mut ctx)
            .expect("known function");
        assert_eq!(
            result,
            Err(FunctionError::Arity {
                name: "substring",
                expected: "2 or 3 parameters".to_string(),
                actual: 1,
            })
        );
        assert!(registry.call("nope", &[], &mut ctx).is_none());
    }

    #[test]
    fn quoted_arguments_never_resolve_fields() {
        let context = context(0, &[("name", "bob")]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ctx = FunctionContext::new(&context, &mut rng);

        assert_eq!(ctx.value_of(&Argument::from_raw("name")), "bob");
        assert_eq!(ctx.value_of(&Argument::from_raw("'name'")), "name");
        assert_eq!(ctx.value_of(&Argument::from_raw("other")), "other");
    }

    #[test]
    fn documentation_joins_description_and_usage() {
        let registry = FunctionRegistry::builtin();
        let docs = registry.get("uppercase").expect("uppercase").documentation();
        assert_eq!(
            docs,
            "Converts the input value to uppercase\nUsage: uppercase(value)"
        );
    }
}
