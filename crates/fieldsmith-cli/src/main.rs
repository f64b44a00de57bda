mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fieldsmith_generate::{GenerationError, OutputFormat};
use thiserror::Error;

use config::load_settings;
use logging::{DEFAULT_LOG_LEVEL, init_logging};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("core error: {0}")]
    Core(#[from] fieldsmith_core::Error),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("validation failed with {0} error(s)")]
    ValidationFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "fieldsmith", version, about = "Synthetic tabular data from field schemas")]
struct Cli {
    /// Settings file (defaults to ./fieldsmith.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log filter, e.g. `debug` or `fieldsmith_generate=trace`.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    /// Append JSON log events to this file instead of stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate rows for a schema.
    Generate(GenerateArgs),
    /// Check a schema, its expressions and its dependency graph.
    Validate(SchemaArgs),
    /// Print the resolved field order and the dependency graph.
    Deps(SchemaArgs),
    /// Show expression function documentation.
    Functions(FunctionsArgs),
    /// Evaluate one expression against an ad-hoc row.
    Eval(EvalArgs),
    /// Print the JSON Schema of schema documents.
    Schema(JsonSchemaArgs),
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Schema document (JSON).
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Schema document (JSON).
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
    /// Number of rows.
    #[arg(long)]
    rows: Option<u64>,
    /// Base random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Generate rows on all cores.
    #[arg(long, default_value_t = false)]
    parallel: bool,
    /// Output format: csv or json.
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Output file; stdout when omitted.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// Formatting rules document replacing the schema's own rules.
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,
    /// Write the generation report as JSON.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct JsonSchemaArgs {
    /// Print the schema of formatting rules documents instead.
    #[arg(long, default_value_t = false)]
    rules: bool,
}

#[derive(Args, Debug)]
struct FunctionsArgs {
    /// Function to describe; all functions when omitted.
    name: Option<String>,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Expression, e.g. `${uppercase(name)}`.
    expression: String,
    /// Field value available to the expression.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = commands::parse_assignment)]
    set: Vec<(String, String)>,
    /// Row index exposed as `_rowIndex`.
    #[arg(long, default_value_t = 0)]
    row_index: u64,
    /// Seed for random-valued functions.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(
        cli.log_level.as_deref(),
        settings.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
        cli.log_file.as_deref(),
    )?;

    match cli.command {
        Command::Generate(args) => commands::run_generate(args, &settings),
        Command::Validate(args) => commands::run_validate(&args.schema),
        Command::Deps(args) => commands::run_deps(&args.schema),
        Command::Functions(args) => commands::run_functions(args.name.as_deref()),
        Command::Eval(args) => commands::run_eval(args, &settings),
        Command::Schema(args) => commands::run_schema(args.rules),
    }
}
