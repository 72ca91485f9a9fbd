//! Integration tests for config module public API.

use std::fs;

use analysis_runner::config::{
    discover_config, load_config_file, EngineConfig, PerfSinkKind, CONFIG_FILE_NAME,
};
use analysis_runner::worker::{Supervisor, WorkerSettings};
use analysis_runner::EngineError;
use tempfile::TempDir;

#[test]
fn public_api_is_accessible() {
    let _config = EngineConfig::default();
    let _kind = PerfSinkKind::Memory;
}

#[test]
fn full_config_workflow() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        r#"
escalate_on_finish: true
perf_prefix: "Plant."
perf_sink: none
stall_threshold_secs: 30
"#,
    )
    .unwrap();

    let config = load_config_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.max_resubmissions, 10);

    let settings = WorkerSettings::from_config(&config);
    assert!(settings.escalate_on_finish);
    assert_eq!(settings.perf_prefix, "Plant.");
    assert!(settings.perf.is_none());
    assert_eq!(Supervisor::from_config(&config).threshold().as_secs(), 30);
}

#[test]
fn discovery_finds_file_in_directory() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILE_NAME), "max_resubmissions: 1\n").unwrap();
    let config = discover_config(temp.path()).unwrap();
    assert_eq!(config.max_resubmissions, 1);
}

#[test]
fn discovery_defaults_without_file() {
    let temp = TempDir::new().unwrap();
    let config = discover_config(temp.path()).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn invalid_values_are_rejected() {
    let config = EngineConfig::from_yaml_str("perf_prefix: \"\"\nstall_threshold_secs: 0").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, EngineError::ConfigValidationError { .. }));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.yml");
    fs::write(&path, "max_resubmissions: [1, 2").unwrap();
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, EngineError::ConfigParseError { .. }));
}
