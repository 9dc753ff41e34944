//! Fitter CLI - Yield-curve fitting from the command line
//!
//! # Commands
//!
//! - `fitter fit --bonds <file>` - Fit node yields to a CSV of bond quotes
//! - `fitter demo` - Run a synthetic re-fitting session through the service
//! - `fitter check` - Validate the merged configuration
//!
//! Configuration is read from an optional TOML file, then overridden by
//! `FITTER_*` environment variables, then by command-line flags.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod input;

pub use error::{CliError, Result};

use config::{build_config, CliArgs};

/// Levenberg-Marquardt yield-curve fitter
#[derive(Parser, Debug)]
#[command(name = "fitter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML format)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FITTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, global = true, env = "FITTER_OUTPUT")]
    output: Option<String>,

    /// Iteration budget
    #[arg(long, global = true, env = "FITTER_MAX_ITERATIONS")]
    max_iterations: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit node yields to bond quotes
    Fit {
        /// Path to bond CSV (key,maturity,coupon,frequency,bid,ask[,weight])
        #[arg(short, long)]
        bonds: PathBuf,

        /// Solver variant
        #[arg(short, long, default_value = "levenberg-marquardt")]
        solver: String,
    },

    /// Run a synthetic re-fitting session
    Demo {
        /// Number of price-move rounds
        #[arg(short, long, default_value = "5")]
        rounds: usize,
    },

    /// Check configuration
    Check,
}

impl From<&Cli> for CliArgs {
    fn from(cli: &Cli) -> Self {
        CliArgs {
            config_file: cli.config.clone(),
            log_level: cli.log_level.clone(),
            output: cli.output.clone(),
            max_iterations: cli.max_iterations,
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&CliArgs::from(&cli)).context("loading configuration")?;

    init_tracing(config.log_level.as_filter_str());
    info!(
        log_level = %config.log_level,
        output = %config.output,
        nodes = config.curve.pillars.len(),
        maximum_iterations = config.solver.maximum_iterations,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Fit { bonds, solver } => {
            commands::fit::run(&config, &bonds, &solver).context("fit failed")?
        }
        Commands::Demo { rounds } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("starting tokio runtime")?;
            runtime
                .block_on(commands::demo::run(&config, rounds))
                .context("demo failed")?
        }
        Commands::Check => commands::check::run(&config)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overridable_args_read_environment() {
        let command = Cli::command();
        for (id, var) in [
            ("log_level", "FITTER_LOG_LEVEL"),
            ("output", "FITTER_OUTPUT"),
            ("max_iterations", "FITTER_MAX_ITERATIONS"),
        ] {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == id)
                .unwrap();
            assert_eq!(arg.get_env(), Some(OsStr::new(var)), "{}", id);
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fitter",
            "check",
            "--log-level",
            "debug",
            "--max-iterations",
            "42",
        ])
        .unwrap();
        let args = CliArgs::from(&cli);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.max_iterations, Some(42));
        assert!(matches!(cli.command, Commands::Check));
    }
}
