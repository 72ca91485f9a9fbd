//! Configuration validation rules.

use crate::config::schema::EngineConfig;
use crate::error::{EngineError, Result};

/// Validate a configuration and return every problem found.
pub fn validate_config(config: &EngineConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.perf_prefix.trim().is_empty() {
        errors.push("perf_prefix must not be empty".to_string());
    }

    if config.stall_threshold_secs == 0 {
        errors.push("stall_threshold_secs must be greater than zero".to_string());
    }

    errors
}

impl EngineConfig {
    /// Reject invalid values, reporting all of them at once.
    pub fn validate(&self) -> Result<()> {
        let errors = validate_config(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ConfigValidationError {
                message: errors.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let config = EngineConfig {
            perf_prefix: "  ".into(),
            ..EngineConfig::default()
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("perf_prefix"));
    }

    #[test]
    fn all_problems_are_reported() {
        let config = EngineConfig {
            perf_prefix: String::new(),
            stall_threshold_secs: 0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("perf_prefix"));
        assert!(msg.contains("stall_threshold_secs"));
    }
}
