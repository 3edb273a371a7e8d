// relink CLI - probabilistic record linkage from a TOML config

mod exit_codes;
mod link;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "relink")]
#[command(about = "Probabilistic record linkage and deduplication")]
#[command(version)]
struct Cli {
    /// Log debug events (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Standardize, index, compare and classify the configured data sets
    #[command(after_help = "\
Examples:
  relink run dedup.toml
  relink run dedup.toml --json
  relink run link.toml --output result.json")]
    Run {
        /// Path to the linkage TOML config
        config: PathBuf,

        /// Output JSON to stdout instead of only the summary line
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse and validate a config, load its reference data and assemble
    /// the pipeline without reading any records
    #[command(after_help = "\
Examples:
  relink validate dedup.toml")]
    Validate {
        /// Path to the linkage TOML config
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, json, output } => link::cmd_run(config, json, output),
        Commands::Validate { config } => link::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
