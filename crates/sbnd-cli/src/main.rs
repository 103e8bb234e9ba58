//! # sbnd CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// schemabound CLI: self-validating models over JSON Schema.
///
/// Validates documents by instantiating schema-bound models, reports updates
/// as JSON Patch, and inspects the model types generated from a schema.
#[derive(Parser, Debug)]
#[command(name = "sbnd", version, about)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Instantiate a model from each document, reporting violations.
    Validate(sbnd_cli::validate::ValidateArgs),
    /// Apply an update to a document and print the resulting JSON Patch.
    Patch(sbnd_cli::patch::PatchArgs),
    /// Show the model type generated from a schema.
    Inspect(sbnd_cli::inspect::InspectArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Validate(args) => {
            let outcomes = sbnd_cli::validate::run(&args)?;
            for outcome in &outcomes {
                println!("{outcome}");
            }
            let failed = outcomes.iter().filter(|o| !o.is_valid()).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} document(s) failed validation", outcomes.len());
            }
        }
        Commands::Patch(args) => {
            println!("{}", sbnd_cli::patch::run(&args)?);
        }
        Commands::Inspect(args) => {
            let summary = sbnd_cli::inspect::run(&args)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
