//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::args::{Cli, Commands};
use crate::config::{discover_config, load_config_file, EngineConfig};
use crate::error::Result;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, writing user-facing output to `out`.
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    working_dir: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher that discovers configuration in `working_dir`.
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve and validate the configuration for this invocation.
    ///
    /// An explicit path must exist; otherwise discovery falls back to
    /// defaults.
    pub fn resolve_config(&self, explicit: Option<&Path>) -> Result<EngineConfig> {
        let config = match explicit {
            Some(path) => {
                let path = if path.is_relative() {
                    self.working_dir.join(path)
                } else {
                    path.to_path_buf()
                };
                debug!(path = %path.display(), "loading explicit config");
                load_config_file(&path)?
            }
            None => discover_config(&self.working_dir)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        let config = self.resolve_config(cli.config.as_deref())?;

        match &cli.command {
            Commands::Demo(args) => {
                let cmd = super::demo::DemoCommand::new(config, args.clone());
                cmd.execute(out)
            }
            Commands::Config(args) => {
                let cmd = super::config::ConfigCommand::new(config, args.clone());
                cmd.execute(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerfSinkKind;
    use crate::error::EngineError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn explicit_relative_config_resolves_against_working_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("custom.yml"), "perf_sink: none\n").unwrap();

        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let config = dispatcher
            .resolve_config(Some(Path::new("custom.yml")))
            .unwrap();
        assert_eq!(config.perf_sink, PerfSinkKind::None);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let err = dispatcher
            .resolve_config(Some(Path::new("absent.yml")))
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigNotFound { .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.yml"), "stall_threshold_secs: 0\n").unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let err = dispatcher
            .resolve_config(Some(Path::new("bad.yml")))
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigValidationError { .. }));
    }
}
