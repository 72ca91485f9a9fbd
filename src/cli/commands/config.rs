//! Config command implementation.
//!
//! The `analysis-runner config` command shows the resolved configuration.

use std::io::Write;

use crate::cli::args::ConfigArgs;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

use super::dispatcher::{Command, CommandResult};

/// The config command implementation.
pub struct ConfigCommand {
    config: EngineConfig,
    args: ConfigArgs,
}

impl ConfigCommand {
    pub fn new(config: EngineConfig, args: ConfigArgs) -> Self {
        Self { config, args }
    }
}

impl Command for ConfigCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let rendered = if self.args.json {
            serde_json::to_string_pretty(&self.config).map_err(|e| EngineError::Other(e.into()))?
        } else {
            serde_yaml::to_string(&self.config).map_err(|e| EngineError::Other(e.into()))?
        };
        writeln!(out, "{}", rendered.trim_end())?;

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_yaml() {
        let cmd = ConfigCommand::new(EngineConfig::default(), ConfigArgs::default());
        let mut out = Vec::new();
        let result = cmd.execute(&mut out).unwrap();
        assert!(result.success);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("perf_sink: tracing"));
        assert!(text.contains("stall_threshold_secs: 300"));
    }

    #[test]
    fn renders_json() {
        let cmd = ConfigCommand::new(EngineConfig::default(), ConfigArgs { json: true });
        let mut out = Vec::new();
        cmd.execute(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["max_resubmissions"], 10);
        assert_eq!(value["perf_sink"], "tracing");
    }
}
