//! Step timing instrumentation.
//!
//! The runner times each step that declares a perf name and hands the
//! duration to a [`PerfSink`]. The sink is injected when the runner is
//! built; without one, records are dropped. No metrics backend is linked in.

mod memory;

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

pub use memory::MemoryPerfSink;

/// Default namespace for perf keys.
pub const DEFAULT_PERF_PREFIX: &str = "Analysis.";

/// Receiver of step timings.
pub trait PerfSink: Send + Sync {
    fn record(&self, key: &str, duration: Duration);
}

/// One timing, as forwarded to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfRecord {
    pub key: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl PerfRecord {
    pub fn new(key: impl Into<String>, duration: Duration) -> Self {
        Self {
            key: key.into(),
            duration,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl fmt::Display for PerfRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}ms", self.key, self.duration.as_millis())
    }
}

/// Emits each record as a `tracing` debug event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPerfSink;

impl PerfSink for TracingPerfSink {
    fn record(&self, key: &str, duration: Duration) {
        debug!(
            perf_key = key,
            duration_ms = duration.as_millis() as u64,
            "step timing"
        );
    }
}

/// Build a namespaced perf key.
///
/// ```
/// use analysis_runner::perf::perf_key;
///
/// assert_eq!(perf_key("Analysis.", "Activity", ".12"), "Analysis.Activity.12");
/// ```
pub fn perf_key(prefix: &str, perf_name: &str, suffix: &str) -> String {
    format!("{}{}{}", prefix, perf_name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_parts() {
        assert_eq!(perf_key("Analysis.", "Detection", ""), "Analysis.Detection");
        assert_eq!(
            perf_key("Analysis.", "Detection", ".m3"),
            "Analysis.Detection.m3"
        );
    }

    #[test]
    fn record_display() {
        let record = PerfRecord::new("Analysis.Activity", Duration::from_millis(1500));
        assert_eq!(record.to_string(), "Analysis.Activity 1500ms");
    }

    #[test]
    fn record_serializes_millis() {
        let record = PerfRecord::new("k", Duration::from_millis(42));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["key"], "k");
        assert_eq!(json["duration_ms"], 42);
    }

    #[test]
    fn tracing_sink_accepts_records() {
        TracingPerfSink.record("k", Duration::from_millis(1));
    }
}
