//! safetyctl - offline policy evaluation for the Agent Safety Framework
//!
//! Runs proposed agent actions through the same constraint engine the service
//! uses, without executing anything:
//! - `validate`: one action file for one user
//! - `replay`: a JSON-lines stream of recorded `{user_id, action_data}` events
//! - `constraints`: the constraint set every user starts with

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use safety_service::{SafetyConfig, SafetyService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Agent Safety CLI
#[derive(Parser)]
#[command(name = "safetyctl")]
#[command(about = "Evaluate agent actions against safety policy", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SAFETY_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "SAFETY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one action and print the verdict
    Validate {
        /// User the action is evaluated for
        #[arg(short, long)]
        user: String,

        /// JSON file holding the action object
        action: PathBuf,
    },

    /// Replay recorded events and print one verdict per line
    Replay {
        /// JSON-lines file of {user_id, action_data} events
        events: PathBuf,
    },

    /// Print the seeded constraint set
    Constraints,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SafetyConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(
        cli.log_level.as_deref().unwrap_or(&config.logging.level),
        cli.json_logs || config.logging.json,
    );

    let service = SafetyService::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Validate { user, action } => {
            commands::validate(&service, &user, &action, &mut out)?;
        }
        Commands::Replay { events } => {
            let file = File::open(&events)
                .with_context(|| format!("opening {}", events.display()))?;
            commands::replay(&service, BufReader::new(file), &mut out)?;
        }
        Commands::Constraints => {
            commands::constraints(&service, &mut out)?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries verdicts.
fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}
