use clap::{Parser, Subcommand};
use formlogic::{
    config::InterpreterConfig,
    schema::check_integrity_with,
    step::{validate_all_with, validate_page_with},
    Answers, Error, FormSchema, InternalResult, RuleEvaluator, ValidatorCompiler,
};
use serde::Serialize;
use std::{fs, path::Path, path::PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to interpreter config (limits, messages)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a schema for duplicate ids, dangling references and broken constraints
    Check {
        schema: PathBuf,
    },

    /// Print visible and required field ids for an answers snapshot
    Evaluate {
        schema: PathBuf,

        /// JSON object of field id to answer
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Include the fired rules and raw outcome
        #[arg(long)]
        trace: bool,
    },

    /// Validate one page, or every page when no step is given
    Validate {
        schema: PathBuf,

        #[arg(short, long)]
        answers: Option<PathBuf>,

        #[arg(short, long)]
        step: Option<usize>,
    },
}

fn read_schema(path: &Path) -> InternalResult<FormSchema> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::internal(format!("Failed to read schema file {}: {}", path.display(), e)))?;
    FormSchema::from_json(&content)
}

fn read_answers(path: Option<&PathBuf>) -> InternalResult<Answers> {
    let Some(path) = path else {
        return Ok(Answers::new());
    };
    let content = fs::read_to_string(path)
        .map_err(|e| Error::internal(format!("Failed to read answers file {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::internal(format!("Failed to parse answers file {}: {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> InternalResult<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| Error::internal(format!("Failed to serialize output: {}", e)))?;
    println!("{}", out);
    Ok(())
}

/// Returns whether the command succeeded (no integrity errors, no validation failures).
fn run(cli: &Cli) -> InternalResult<bool> {
    let config = match &cli.config {
        Some(path) => InterpreterConfig::from_file(path)?,
        None => InterpreterConfig::default(),
    };
    debug!("config: {:?}", config);

    match &cli.command {
        Commands::Check { schema } => {
            let schema = read_schema(schema)?;
            let report = check_integrity_with(&schema, &config);
            info!(issues = report.issues.len(), "integrity check finished");
            print_json(&report)?;
            Ok(report.is_ok())
        }
        Commands::Evaluate {
            schema,
            answers,
            trace,
        } => {
            let schema = read_schema(schema)?;
            let answers = read_answers(answers.as_ref())?;
            let evaluator = RuleEvaluator::new(&config);
            let result = evaluator.evaluate_with_trace(&schema.rules, &answers, &schema.all_fields());
            if *trace {
                print_json(&result)?;
            } else {
                print_json(&result.state)?;
            }
            Ok(true)
        }
        Commands::Validate {
            schema,
            answers,
            step,
        } => {
            let schema = read_schema(schema)?;
            let answers = read_answers(answers.as_ref())?;
            let state = RuleEvaluator::new(&config).evaluate(&schema.rules, &answers, &schema.all_fields());
            let compiler = ValidatorCompiler::new(&config);

            let result = match step {
                Some(step) if *step >= schema.page_count() => {
                    return Err(Error::StepOutOfRange {
                        step: *step,
                        page_count: schema.page_count(),
                    });
                }
                Some(step) => validate_page_with(
                    &compiler,
                    &schema,
                    &answers,
                    *step,
                    &state.visible_field_ids,
                    &state.required_field_ids,
                ),
                None => validate_all_with(
                    &compiler,
                    &schema,
                    &answers,
                    &state.visible_field_ids,
                    &state.required_field_ids,
                ),
            };
            print_json(&result)?;
            Ok(result.ok)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
