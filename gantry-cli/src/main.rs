//! Gantry CLI - command-line interface for the Gantry engine.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gantry_executor::observability::{LogFormat, TracingConfig, TracingGuard, init_tracing};
use std::path::PathBuf;

/// Gantry - declarative, data-driven request processing.
#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured API over HTTP
    Serve {
        /// Path to the engine configuration file
        #[arg(short, long, default_value = "gantry.yaml")]
        config: PathBuf,

        /// Override the configured host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load the configuration and cross-check its documents
    Validate {
        /// Path to the engine configuration file
        #[arg(short, long, default_value = "gantry.yaml")]
        config: PathBuf,
    },

    /// Execute one request offline and print the response
    Run {
        /// Path to the engine configuration file
        #[arg(short, long, default_value = "gantry.yaml")]
        config: PathBuf,

        /// HTTP method
        method: String,

        /// URL path, optionally with a query string
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let log_format = std::env::var("GANTRY_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_else(|| {
            if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
                LogFormat::Pretty
            } else {
                LogFormat::Compact
            }
        });

    let log_filter = std::env::var("GANTRY_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| filter.to_string());

    let config = TracingConfig::builder()
        .log_format(log_format)
        .log_filter(log_filter)
        .build();

    init_tracing(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Serve { config, host, port } => {
            commands::serve::run(&config, host.as_deref(), port).await
        }
        Commands::Validate { config } => commands::validate::run(&config),
        Commands::Run {
            config,
            method,
            path,
            body,
            headers,
        } => {
            let options = commands::run::RunOptions {
                method: &method,
                path: &path,
                body: body.as_deref(),
                headers: &headers,
            };
            commands::run::run(&config, options).await
        }
    }
}
