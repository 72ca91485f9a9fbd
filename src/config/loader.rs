//! Configuration file discovery and loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::schema::EngineConfig;
use crate::error::{EngineError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ANALYSIS_RUNNER_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "analysis-runner.yml";

/// Load a configuration file from a specific path.
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EngineError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into an [`EngineConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<EngineConfig> {
    serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Locate the config file to use from `dir`.
///
/// `$ANALYSIS_RUNNER_CONFIG` wins when set, even if the file is missing, so
/// a typo surfaces as an error instead of silently falling back.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        Some(path)
    } else {
        None
    }
}

/// Discover and load configuration relative to `dir`, defaults if none.
pub fn discover_config(dir: &Path) -> Result<EngineConfig> {
    match find_config(dir) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config_file(&path)
        }
        None => {
            debug!(dir = %dir.display(), "no config file, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_config_file(path)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        parse_config(content, Path::new("<inline>"))
    }

    /// Discover configuration from the current directory.
    pub fn discover() -> Result<Self> {
        let cwd = env::current_dir()?;
        discover_config(&cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerfSinkKind;
    use tempfile::TempDir;

    #[test]
    fn load_config_file_reads_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("engine.yml");
        fs::write(&path, "escalate_on_finish: true\nmax_resubmissions: 2\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert!(config.escalate_on_finish);
        assert_eq!(config.max_resubmissions, 2);
        assert_eq!(config.perf_sink, PerfSinkKind::Tracing);
    }

    #[test]
    fn load_config_file_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.yml");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, EngineError::ConfigNotFound { .. }));
    }

    #[test]
    fn parse_config_reports_path() {
        let err = parse_config("max_resubmissions: lots", Path::new("/x/engine.yml")).unwrap_err();
        match err {
            EngineError::ConfigParseError { path, .. } => {
                assert_eq!(path, PathBuf::from("/x/engine.yml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_yaml_str_uses_inline_path() {
        let err = EngineConfig::from_yaml_str("perf_sink: [").unwrap_err();
        assert!(err.to_string().contains("<inline>"));
    }
}
