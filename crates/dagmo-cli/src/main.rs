//! dagmo CLI - Convert between marimo notebooks and dagster asset modules.

mod convert;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use convert::{Direction, Options};

#[derive(Parser)]
#[command(name = "dagmo")]
#[command(about = "Convert between marimo notebooks and dagster asset modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Conversion config (JSON); missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fail when the conversion produced warnings
    #[arg(long, global = true)]
    strict: bool,

    /// Print warnings as JSON on stderr
    #[arg(long, global = true)]
    warnings_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a marimo notebook into a dagster asset module
    ToDagster {
        /// Path to the notebook (.py file)
        input: PathBuf,

        /// Output path for the asset module
        output: PathBuf,
    },

    /// Convert a dagster asset module into a marimo notebook
    ToMarimo {
        /// Path to the asset module (.py file)
        input: PathBuf,

        /// Output path for the notebook
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let options = Options {
        config: cli.config,
        strict: cli.strict,
        warnings_json: cli.warnings_json,
    };

    match cli.command {
        Commands::ToDagster { input, output } => {
            convert::execute(Direction::ToDagster, &input, &output, &options)?;
        }
        Commands::ToMarimo { input, output } => {
            convert::execute(Direction::ToMarimo, &input, &output, &options)?;
        }
    }

    Ok(())
}
