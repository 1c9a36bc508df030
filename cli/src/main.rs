//! Cadence CLI - Binary entry point.
//!
//! # Architecture
//!
//! The CLI wires the configured adapters into [`cadence_core`] and runs one
//! subcommand against them:
//!
//! ```text
//! main() -> CadenceConfig::load() -> Context::new(cli, config) -> commands::run()
//!                                          |
//!                                          v
//!                  HttpRegistry + WebSocketSource + ScheduleClient
//! ```
//!
//! Diagnostics go to a log file, never to stdout, so command output stays
//! clean for pipes.

mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cadence_config::CadenceConfig;

use crate::args::Cli;
use crate::commands::Context;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_cadence_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: drop diagnostics rather than mix them into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_cadence_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in cadence_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn cadence_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.cadence/logs/cadence.log
    if let Some(config_dir) = cadence_config::config_dir() {
        candidates.push(config_dir.join("logs").join("cadence.log"));
    }

    // Fallback: ./.cadence/logs/cadence.log
    candidates.push(PathBuf::from(".cadence").join("logs").join("cadence.log"));

    candidates
}

fn load_config() -> CadenceConfig {
    match CadenceConfig::load() {
        Ok(Some(config)) => config,
        Ok(None) => CadenceConfig::default(),
        Err(err) => {
            tracing::warn!(path = %err.path().display(), "{err}; using defaults");
            eprintln!("warning: {err}; using defaults");
            CadenceConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config();
    let context = Context::new(cli.base_url.as_deref(), config)?;
    commands::run(&context, cli.command).await
}
