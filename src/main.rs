//! Wallet Intent Agent CLI
//!
//! Command-line interface for resolving wallet requests into actions.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wallet_intent::{registry, validate_call, Config, Error, IntentResolver, ResolvedIntent, Result};

#[derive(Parser)]
#[command(name = "intent-agent")]
#[command(about = "Turn natural-language wallet requests into validated actions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one utterance
    Resolve {
        /// The user's request, e.g. "send 5 USD to Alice"
        utterance: String,

        /// Model override for this request
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Resolve every non-empty line of a file concurrently
    Batch {
        /// File with one utterance per line
        file: PathBuf,

        /// Model override for every request
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Validate a raw function call without calling a model
    Validate {
        /// Function name (transfer_tokens, swap_tokens, settingAI)
        #[arg(short, long)]
        function: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: String,
    },

    /// Print JSON schemas
    Schema {
        /// Print the model-facing function definitions instead of the result schema
        #[arg(long)]
        functions: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // Logs go to stderr so stdout carries only results
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve { utterance, model } => {
            let resolver = IntentResolver::from_config(&config)?;
            let outcome = resolver
                .resolve_with_model(&utterance, model.as_deref())
                .await;
            print_json(&outcome)?;
        }
        Commands::Batch { file, model } => {
            run_batch(&config, &file, model.as_deref()).await?;
        }
        Commands::Validate { function, args } => {
            run_validate(&function, &args)?;
        }
        Commands::Schema { functions, output } => {
            let schema = if functions {
                serde_json::Value::Array(registry().tool_definitions())
            } else {
                serde_json::to_value(schemars::schema_for!(ResolvedIntent))?
            };
            let rendered = serde_json::to_string_pretty(&schema)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    tracing::info!(path = %path.display(), "Wrote schema");
                }
                None => println!("{}", rendered),
            }
        }
        Commands::Config => {
            let mut view = serde_json::to_value(&config)?;
            view["api_key_set"] = serde_json::Value::Bool(config.oracle.has_api_key());
            view["completions_url"] =
                serde_json::Value::String(config.oracle.completions_url()?.to_string());
            print_json(&view)?;
        }
    }

    Ok(())
}

async fn run_batch(config: &Config, file: &Path, model: Option<&str>) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", file.display(), e)))?;
    let utterances: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    tracing::info!(count = utterances.len(), "Resolving batch");

    let resolver = IntentResolver::from_config(config)?;
    let outcomes = futures::future::join_all(
        utterances
            .iter()
            .map(|utterance| resolver.resolve_with_model(utterance, model)),
    )
    .await;

    // One JSON object per line, in input order
    for (utterance, outcome) in utterances.iter().zip(outcomes) {
        let line = serde_json::json!({ "utterance": utterance, "result": outcome });
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn run_validate(function: &str, args: &str) -> Result<()> {
    let raw: serde_json::Value = serde_json::from_str(args)
        .map_err(|e| Error::InvalidArgument(format!("--args is not valid JSON: {}", e)))?;
    let raw = raw
        .as_object()
        .ok_or_else(|| Error::InvalidArgument("--args must be a JSON object".to_string()))?;

    let result = validate_call(function, raw)
        .ok_or_else(|| Error::InvalidArgument(format!("Unknown function: {}", function)))?;

    print_json(&ResolvedIntent::from_validation(result))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
