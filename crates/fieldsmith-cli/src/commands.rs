use std::fs;
use std::io;
use std::path::Path;

use fieldsmith_core::{
    FieldSpec, GenerationContext, RowMetadata, SchemaDocument, ValidationReport,
    schema_document_json_schema, validate_schema, validate_schema_json,
};
use fieldsmith_expr::{ExpressionEvaluator, parse};
use fieldsmith_format::formatting_rules_json_schema;
use fieldsmith_generate::generators::DEPENDENT_EXPRESSION_KEY;
use fieldsmith_generate::{
    GenerationEngine, render_dependency_graph, resolve_order, validate_no_cycles, write_rows,
    write_rows_to_path,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::{CliError, EvalArgs, GenerateArgs};

pub fn run_generate(args: GenerateArgs, settings: &Settings) -> Result<(), CliError> {
    let mut schema = SchemaDocument::load(&args.schema)?;
    if let Some(rules) = &args.rules {
        schema.formatting_rules = Some(Value::String(fs::read_to_string(rules)?));
    }

    let options = settings.generate_options(args.rows, args.seed, args.parallel);
    let format = settings.output_format(args.format);
    let result = GenerationEngine::new().generate(&schema, &options)?;

    let bytes = match &args.out {
        Some(path) => write_rows_to_path(path, format, &result)?,
        None => write_rows(io::stdout().lock(), format, &result)?,
    };
    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_vec_pretty(&result.report)?)?;
    }

    info!(
        run_id = %result.report.run_id,
        rows = result.report.rows_generated,
        format = %format,
        bytes,
        "rows written"
    );
    Ok(())
}

/// Print every problem found; fails when any of them is an error.
pub fn run_validate(path: &Path) -> Result<(), CliError> {
    let content = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&content)?;
    let mut errors = 0;

    if raw.is_object() {
        errors += print_report(&validate_schema_json(&raw)?);
    }
    let schema = SchemaDocument::from_json_str(&content)?;
    errors += print_report(&validate_schema(&schema));

    for field in &schema.fields {
        let Some(expression) = field_expression(field) else {
            continue;
        };
        let parsed = parse(&expression);
        for error in &parsed.errors {
            println!("error expression_invalid at {}: {error}", field.name);
        }
        for warning in &parsed.warnings {
            println!("warning expression_warning at {}: {warning}", field.name);
        }
        errors += parsed.errors.len();
    }

    if let Err(err) = validate_no_cycles(&schema.fields) {
        println!("error dependency_cycle: {err}");
        errors += 1;
    }

    if errors > 0 {
        return Err(CliError::ValidationFailed(errors));
    }
    println!("schema ok: {} field(s)", schema.fields.len());
    Ok(())
}

pub fn run_deps(path: &Path) -> Result<(), CliError> {
    let schema = SchemaDocument::load(path)?;
    let order: Vec<String> = resolve_order(&schema.fields)
        .into_iter()
        .map(|field| field.name)
        .collect();
    println!("Generation order: {}", order.join(", "));
    println!();
    print!("{}", render_dependency_graph(&schema.fields));
    Ok(())
}

pub fn run_functions(name: Option<&str>) -> Result<(), CliError> {
    let evaluator = ExpressionEvaluator::new();
    match name {
        Some(name) => {
            let documentation = evaluator
                .function_documentation(name)
                .ok_or_else(|| CliError::UnknownFunction(name.to_string()))?;
            println!("{name}: {documentation}");
        }
        None => {
            for (name, documentation) in evaluator.all_function_documentation() {
                println!("{name}: {documentation}");
                println!();
            }
        }
    }
    Ok(())
}

pub fn run_eval(args: EvalArgs, settings: &Settings) -> Result<(), CliError> {
    let timestamp = chrono::Local::now().naive_local();
    let mut context = GenerationContext::new(RowMetadata::new(args.row_index, timestamp));
    for (name, value) in args.set {
        context.insert(name, value);
    }

    let parsed = parse(&args.expression);
    for error in &parsed.errors {
        eprintln!("error: {error}");
    }
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let seed = args.seed.or(settings.seed).unwrap_or(42);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let value = ExpressionEvaluator::new().evaluate(&args.expression, &context, &mut rng);
    println!("{value}");
    Ok(())
}

pub fn run_schema(rules: bool) -> Result<(), CliError> {
    let schema = if rules {
        formatting_rules_json_schema()
    } else {
        schema_document_json_schema()
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Parse a `name=value` assignment; the value may itself contain `=`.
pub fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{input}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{input}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Expression a field evaluates, from its options or its dependent-field input.
fn field_expression(field: &FieldSpec) -> Option<String> {
    let options = field.parsed_options();
    if let Some(expression) = options.expression() {
        return Some(expression.to_string());
    }
    let key = options.base_type.as_deref().unwrap_or(&field.generator_key);
    if key == DEPENDENT_EXPRESSION_KEY {
        return options.base_options_text();
    }
    None
}

fn print_report(report: &ValidationReport) -> usize {
    for issue in &report.errors {
        println!("error {} at {}: {}", issue.code, issue.path, issue.message);
    }
    for issue in &report.warnings {
        println!("warning {} at {}: {}", issue.code, issue.path, issue.message);
    }
    report.errors.len()
}
