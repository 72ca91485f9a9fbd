//! Command-line interface for the analysis runner.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigArgs, DemoArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
