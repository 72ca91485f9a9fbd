//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Analysis runner - step sequencing for background analysis workers.
#[derive(Debug, Parser)]
#[command(name = "analysis-runner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides discovery)
    #[arg(short, long, global = true, env = "ANALYSIS_RUNNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the demo pipeline against simulated machines
    Demo(DemoArgs),

    /// Show resolved configuration
    Config(ConfigArgs),
}

/// Arguments for the `demo` command.
#[derive(Debug, Clone, Args)]
pub struct DemoArgs {
    /// Number of simulated machines
    #[arg(short, long, default_value_t = 2)]
    pub machines: u32,

    /// Make the named step fail with an ordinary fault
    #[arg(long, value_name = "STEP")]
    pub fail_step: Option<String>,

    /// Make the named step fail with an error that requires an abort
    #[arg(long, value_name = "STEP")]
    pub abort_step: Option<String>,

    /// Raise the first fault once a run completes
    #[arg(long)]
    pub escalate: bool,

    /// Preempt each machine's run after the named step
    #[arg(long, value_name = "STEP")]
    pub pause_after: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            machines: 2,
            fail_step: None,
            abort_step: None,
            escalate: false,
            pause_after: None,
            json: false,
        }
    }
}

/// Arguments for the `config` command.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Output as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}
