use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Configure and monitor scheduled plugin jobs.
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(version)]
#[command(about = "Configure and monitor scheduled plugin jobs.", long_about = None)]
pub struct Cli {
    /// Registry base URL (overrides the config file and CADENCE_API_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct Target {
    /// Plugin id
    pub plugin: u64,

    /// Session (user) id; defaults to `[session] default` from the config
    #[arg(short, long)]
    pub session: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered plugins
    Plugins,

    /// List the configuration versions of a plugin
    Versions {
        #[command(flatten)]
        target: Target,
    },

    /// Print the presentation hints derived from a plugin's schema
    Hints {
        #[command(flatten)]
        target: Target,
    },

    /// Store a configuration document
    Save {
        #[command(flatten)]
        target: Target,

        /// JSON file to store, or `-` for stdin
        #[arg(long)]
        payload: PathBuf,

        /// Description; defaults to the selected version's
        #[arg(short, long)]
        description: Option<String>,

        /// Version to update; defaults to the active (or first) version
        #[arg(long)]
        version: Option<u64>,

        /// Store as a new version instead of updating
        #[arg(long)]
        new: bool,
    },

    /// Make a version the active one
    Activate {
        #[command(flatten)]
        target: Target,
        version: u64,
    },

    /// Deactivate a version
    Deactivate {
        #[command(flatten)]
        target: Target,
        version: u64,
    },

    /// Delete a stored version
    Delete {
        #[command(flatten)]
        target: Target,
        version: u64,
    },

    /// Re-import a plugin's package on the server
    Reload {
        #[command(flatten)]
        target: Target,
    },

    /// Follow the live log stream until Ctrl-C
    Logs {
        #[command(flatten)]
        target: Target,

        /// Entries kept in the buffer
        #[arg(long)]
        max: Option<usize>,
    },

    /// Schedule manager: jobs, pause/resume and recent events
    #[command(subcommand)]
    Schedule(ScheduleCommands),
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// List scheduled jobs
    List,
    /// Pause a running job or resume a paused one
    Toggle { job_id: String },
    /// Show recent scheduler events
    Events {
        /// Only show errors and missed runs
        #[arg(long)]
        errors: bool,
    },
}
