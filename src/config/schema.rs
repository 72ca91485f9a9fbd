//! Configuration schema for the analysis runner.
//!
//! Maps the YAML file format onto [`EngineConfig`]. Every field is optional
//! in the file; missing fields take their defaults.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::perf::{MemoryPerfSink, PerfSink, TracingPerfSink, DEFAULT_PERF_PREFIX};

/// Root configuration structure for `analysis-runner.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Raise the first recorded fault once a run completes
    #[serde(skip_serializing_if = "is_false")]
    pub escalate_on_finish: bool,

    /// Namespace prepended to perf keys
    pub perf_prefix: String,

    /// Where step timings go
    pub perf_sink: PerfSinkKind,

    /// Heartbeat age after which a resource counts as stalled
    pub stall_threshold_secs: u64,

    /// Times a paused unit is put back in the queue before it is dropped
    pub max_resubmissions: u32,

    /// Time budget of a run before steps take their max-time continuation,
    /// `0` for none
    pub max_run_time_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalate_on_finish: false,
            perf_prefix: DEFAULT_PERF_PREFIX.to_string(),
            perf_sink: PerfSinkKind::default(),
            stall_threshold_secs: default_stall_threshold_secs(),
            max_resubmissions: default_max_resubmissions(),
            max_run_time_secs: default_max_run_time_secs(),
        }
    }
}

impl EngineConfig {
    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }

    /// Run time budget, `None` when disabled.
    pub fn max_run_time(&self) -> Option<Duration> {
        (self.max_run_time_secs > 0).then(|| Duration::from_secs(self.max_run_time_secs))
    }

    /// Instantiate the configured perf sink, `None` when timings are off.
    pub fn build_perf_sink(&self) -> Option<Arc<dyn PerfSink>> {
        match self.perf_sink {
            PerfSinkKind::None => None,
            PerfSinkKind::Memory => Some(Arc::new(MemoryPerfSink::new())),
            PerfSinkKind::Tracing => Some(Arc::new(TracingPerfSink)),
        }
    }
}

fn default_stall_threshold_secs() -> u64 {
    300
}

fn default_max_resubmissions() -> u32 {
    10
}

fn default_max_run_time_secs() -> u64 {
    40
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Perf sink selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerfSinkKind {
    None,
    Memory,
    #[default]
    Tracing,
}
