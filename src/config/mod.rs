//! Engine configuration.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use analysis_runner::config::{EngineConfig, PerfSinkKind};
//!
//! let config = EngineConfig::from_yaml_str("perf_sink: memory\nmax_resubmissions: 3").unwrap();
//! config.validate().unwrap();
//! assert_eq!(config.perf_sink, PerfSinkKind::Memory);
//! assert_eq!(config.perf_prefix, "Analysis.");
//! ```
//!
//! # Configuration File Location
//!
//! 1. `$ANALYSIS_RUNNER_CONFIG`, when set
//! 2. `analysis-runner.yml` in the working directory
//! 3. Built-in defaults

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{
    discover_config, find_config, load_config_file, parse_config, CONFIG_ENV_VAR,
    CONFIG_FILE_NAME,
};
pub use schema::{EngineConfig, PerfSinkKind};
pub use validator::validate_config;
