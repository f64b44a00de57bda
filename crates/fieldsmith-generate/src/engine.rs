use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use chrono::NaiveDateTime;
use fieldsmith_core::{
    FieldSpec, GenerationContext, RowMetadata, RowValues, SchemaDocument, validate_schema,
};
use fieldsmith_expr::{ExpressionEvaluator, FunctionRegistry, parse};
use fieldsmith_format::{FORMAT_ERROR, FieldFormatter, FormattingResolver, VALIDATION_FAILED};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dependency::{resolve_order, validate_no_cycles};
use crate::errors::GenerationError;
use crate::generators::{DEPENDENT_EXPRESSION_KEY, GeneratorContext, GeneratorRegistry};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport, GenerationResult};

/// Value of a field whose generator key is not registered.
pub const NO_GENERATOR: &str = "[NO_GENERATOR]";
/// Value of every field of a row whose generation panicked.
pub const ROW_PANICKED: &str = "[ERROR: row panicked]";

const SENTINEL_MARKERS: &[&str] = &[
    NO_GENERATOR,
    "[ERROR",
    "[EXPRESSION_ERROR",
    "[UNKNOWN_FIELD:",
    "[UNKNOWN_FUNCTION:",
    "[FUNCTION_ERROR:",
    VALIDATION_FAILED,
    FORMAT_ERROR,
];

/// Returns true when a generated value carries a failure marker.
pub fn contains_sentinel(value: &str) -> bool {
    SENTINEL_MARKERS.iter().any(|marker| value.contains(marker))
}

/// Generates rows for a schema document.
///
/// Registries are shared read-only by every row; each row owns its context
/// and its random source, so rows can be produced on the rayon pool.
#[derive(Debug, Default)]
pub struct GenerationEngine {
    generators: GeneratorRegistry,
    evaluator: ExpressionEvaluator,
}

impl GenerationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registries(generators: GeneratorRegistry, functions: FunctionRegistry) -> Self {
        Self {
            generators,
            evaluator: ExpressionEvaluator::with_registry(functions),
        }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    /// Generate `options.rows` rows.
    ///
    /// Only an invalid schema fails the request. Field failures become
    /// marker values and a panicking row is replaced by a row of markers.
    pub fn generate(
        &self,
        schema: &SchemaDocument,
        options: &GenerateOptions,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = options
            .timestamp
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let rows = usize::try_from(options.rows).map_err(|_| {
            GenerationError::invalid_options("row count exceeds the addressable range")
        })?;

        let validation = validate_schema(schema);
        if !validation.is_ok() {
            warn!(
                run_id = %run_id,
                errors = validation.errors.len(),
                "schema rejected"
            );
            return Err(GenerationError::InvalidSchema(validation));
        }

        let mut report = GenerationReport::new(run_id.clone());
        report.rows_requested = options.rows;
        for issue in &validation.warnings {
            report.record_warning(GenerationIssue::warning(
                &issue.code,
                format!("{}: {}", issue.path, issue.message),
            ));
        }
        if let Err(err) = validate_no_cycles(&schema.fields) {
            report.record_warning(GenerationIssue::warning("dependency_cycle", err.to_string()));
        }

        let resolver = FormattingResolver::from_text(schema.formatting_rules_text().as_deref());
        let plans: Vec<FieldPlan> = resolve_order(&schema.fields)
            .into_iter()
            .map(|field| self.plan_field(field, &resolver, &mut report))
            .collect();
        report.expression_fields = plans
            .iter()
            .filter(|plan| plan.is_expression())
            .map(|plan| plan.field.name.clone())
            .collect();

        info!(
            run_id = %run_id,
            rows = options.rows,
            fields = plans.len(),
            parallel = options.parallel,
            seed = options.seed,
            "generation started"
        );

        let produce = |index: usize| {
            self.generate_row_guarded(&plans, index as u64, options.seed, timestamp)
        };
        let outcomes: Vec<RowOutcome> = if options.parallel {
            (0..rows).into_par_iter().map(produce).collect()
        } else {
            (0..rows).map(produce).collect()
        };

        let mut generated = Vec::with_capacity(outcomes.len());
        let mut completed = 0_u64;
        for outcome in outcomes {
            if outcome.panicked {
                report.panicked_rows += 1;
            } else {
                completed += 1;
            }
            let sentinels = outcome
                .values
                .values()
                .filter(|value| contains_sentinel(value))
                .count();
            report.record_sentinels(sentinels as u64);
            for issue in outcome.issues {
                report.record_warning(issue);
            }
            generated.push(outcome.values);
        }
        for plan in &plans {
            if let ValueSource::Generator { key, .. } = &plan.source {
                report.record_generator_usage_count(key, completed);
            }
        }

        report.rows_generated = generated.len() as u64;
        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            run_id = %run_id,
            rows_generated = report.rows_generated,
            sentinels = report.sentinel_count,
            panicked_rows = report.panicked_rows,
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GenerationResult {
            rows: generated,
            field_order: schema.fields.iter().map(|field| field.name.clone()).collect(),
            report,
        })
    }

    fn plan_field(
        &self,
        field: FieldSpec,
        resolver: &FormattingResolver,
        report: &mut GenerationReport,
    ) -> FieldPlan {
        let options = field.parsed_options();

        let source = match options.expression() {
            Some(expression) => {
                let parsed = parse(expression);
                for error in parsed.errors {
                    report.record_warning(
                        GenerationIssue::warning("expression_invalid", error).for_field(&field.name),
                    );
                }
                ValueSource::Expression(expression.to_string())
            }
            None => {
                let key = options
                    .base_type
                    .clone()
                    .unwrap_or_else(|| field.generator_key.clone());
                if self.generators.contains(&key) {
                    ValueSource::Generator {
                        key,
                        options: options.base_options_text(),
                    }
                } else {
                    warn!(field = %field.name, generator = %key, "no generator registered");
                    report.record_warning(
                        GenerationIssue::warning(
                            "no_generator",
                            format!("no generator registered for '{key}'"),
                        )
                        .for_field(&field.name),
                    );
                    ValueSource::Missing
                }
            }
        };

        let effective = resolver.resolve(&field, options.formatting.as_ref());
        let formatting = if effective.is_empty() {
            Formatting::Plain
        } else {
            match FieldFormatter::new(effective) {
                Ok(formatter) => Formatting::Apply(formatter),
                Err(err) => {
                    warn!(field = %field.name, error = %err, "formatting cannot be applied");
                    report.record_warning(
                        GenerationIssue::warning("format_error", err.to_string())
                            .for_field(&field.name),
                    );
                    Formatting::Broken
                }
            }
        };

        debug!(field = %field.name, "field planned");
        FieldPlan {
            field,
            source,
            formatting,
        }
    }

    fn generate_row_guarded(
        &self,
        plans: &[FieldPlan],
        row_index: u64,
        seed: u64,
        timestamp: NaiveDateTime,
    ) -> RowOutcome {
        match catch_unwind(AssertUnwindSafe(|| {
            self.generate_row(plans, row_index, seed, timestamp)
        })) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic);
                warn!(row = row_index, error = %message, "row generation panicked");
                let values: RowValues = plans
                    .iter()
                    .map(|plan| (plan.field.name.clone(), ROW_PANICKED.to_string()))
                    .collect();
                RowOutcome {
                    values,
                    issues: vec![GenerationIssue::error("row_panicked", message).at_row(row_index)],
                    panicked: true,
                }
            }
        }
    }

    /// One row, fields in resolved order; later fields read earlier values.
    fn generate_row(
        &self,
        plans: &[FieldPlan],
        row_index: u64,
        seed: u64,
        timestamp: NaiveDateTime,
    ) -> RowOutcome {
        let mut rng = ChaCha8Rng::seed_from_u64(hash_row_seed(seed, row_index));
        let mut context = GenerationContext::new(RowMetadata::new(row_index, timestamp));
        let mut issues = Vec::new();

        for plan in plans {
            let value = match self.field_value(plan, &context, &mut rng) {
                Ok(raw) => plan.format(raw),
                Err(FieldFailure::NoGenerator) => NO_GENERATOR.to_string(),
                Err(FieldFailure::Generator(err)) => {
                    issues.push(
                        GenerationIssue::warning("generator_failed", err.to_string())
                            .for_field(&plan.field.name)
                            .at_row(row_index),
                    );
                    format!("[ERROR: {err}]")
                }
            };
            context.insert(plan.field.name.clone(), value);
        }

        RowOutcome {
            values: context.into_row(),
            issues,
            panicked: false,
        }
    }

    fn field_value(
        &self,
        plan: &FieldPlan,
        context: &GenerationContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<String, FieldFailure> {
        match &plan.source {
            ValueSource::Expression(expression) => {
                Ok(self.evaluator.evaluate(expression, context, rng))
            }
            ValueSource::Missing => Err(FieldFailure::NoGenerator),
            ValueSource::Generator { key, options } => {
                let generator = self.generators.get(key).ok_or(FieldFailure::NoGenerator)?;
                let ctx = GeneratorContext {
                    field: &plan.field,
                    row: context,
                    evaluator: &self.evaluator,
                };
                generator
                    .generate(&ctx, options.as_deref(), rng)
                    .map_err(FieldFailure::Generator)
            }
        }
    }
}

/// Per-row seed derived from the run seed, independent of thread scheduling.
pub fn hash_row_seed(seed: u64, row_index: u64) -> u64 {
    let hash = seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash.wrapping_mul(0x100000001b3)
}

enum ValueSource {
    Expression(String),
    Generator { key: String, options: Option<String> },
    Missing,
}

enum Formatting {
    Plain,
    Apply(FieldFormatter),
    Broken,
}

struct FieldPlan {
    field: FieldSpec,
    source: ValueSource,
    formatting: Formatting,
}

impl FieldPlan {
    fn is_expression(&self) -> bool {
        match &self.source {
            ValueSource::Expression(_) => true,
            ValueSource::Generator { key, .. } => key == DEPENDENT_EXPRESSION_KEY,
            ValueSource::Missing => false,
        }
    }

    /// Marker values pass through untouched.
    fn format(&self, raw: String) -> String {
        if contains_sentinel(&raw) {
            return raw;
        }
        match &self.formatting {
            Formatting::Plain => raw,
            Formatting::Apply(formatter) => formatter.format(&raw),
            Formatting::Broken => FORMAT_ERROR.to_string(),
        }
    }
}

enum FieldFailure {
    NoGenerator,
    Generator(GenerationError),
}

struct RowOutcome {
    values: RowValues,
    issues: Vec<GenerationIssue>,
    panicked: bool,
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during generation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::generators::Generator;

    struct Exploding;

    impl Generator for Exploding {
        fn id(&self) -> &'static str {
            "Test.explode"
        }

        fn name(&self) -> &'static str {
            "Explode"
        }

        fn generate(
            &self,
            ctx: &GeneratorContext<'_>,
            _options: Option<&str>,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<String, GenerationError> {
            if ctx.row_index() == 1 {
                panic!("boom");
            }
            Ok("fine".to_string())
        }
    }

    fn options(rows: u64) -> GenerateOptions {
        GenerateOptions {
            rows,
            seed: 7,
            parallel: false,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
        }
    }

    #[test]
    fn sentinel_detection() {
        assert!(contains_sentinel("[NO_GENERATOR]"));
        assert!(contains_sentinel("x [UNKNOWN_FIELD:a] y"));
        assert!(contains_sentinel("[ERROR: bad]"));
        assert!(contains_sentinel(FORMAT_ERROR));
        assert!(!contains_sentinel("[not a marker]"));
    }

    #[test]
    fn row_seeds_differ_per_row() {
        assert_ne!(hash_row_seed(42, 0), hash_row_seed(42, 1));
        assert_eq!(hash_row_seed(42, 3), hash_row_seed(42, 3));
    }

    #[test]
    fn a_panicking_row_does_not_abort_the_batch() {
        let mut generators = GeneratorRegistry::builtin();
        generators.register_generator(Box::new(Exploding));
        let engine = GenerationEngine::with_registries(generators, FunctionRegistry::builtin());
        let schema = SchemaDocument::new(vec![
            FieldSpec::new("flag", "Boolean.trueFalse"),
            FieldSpec::new("bomb", "Test.explode"),
        ]);

        let result = engine.generate(&schema, &options(3)).expect("generate");
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[0]["bomb"], "fine");
        assert_eq!(result.rows[1]["flag"], ROW_PANICKED);
        assert_eq!(result.rows[1]["bomb"], ROW_PANICKED);
        assert_eq!(result.rows[2]["bomb"], "fine");
        assert_eq!(result.report.panicked_rows, 1);
        assert_eq!(result.report.warnings_by_code.get("row_panicked"), Some(&1));
        assert_eq!(result.report.generator_usage.get("Test.explode"), Some(&2));
    }

    #[test]
    fn generator_errors_become_markers() {
        let engine = GenerationEngine::new();
        let schema = SchemaDocument::new(vec![
            FieldSpec::new("n", "Number.range").with_raw_options("9-1"),
        ]);
        let result = engine.generate(&schema, &options(2)).expect("generate");
        assert_eq!(
            result.rows[0]["n"],
            "[ERROR: Minimum value cannot be greater than maximum value.]"
        );
        assert_eq!(result.report.sentinel_count, 2);
        assert_eq!(result.report.warnings_by_code.get("generator_failed"), Some(&2));
    }
}
