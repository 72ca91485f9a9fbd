//! Stall detection from run heartbeats.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::config::EngineConfig;
use crate::context::{SharedResource, WorkId};

/// A run that stopped reporting progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledRun {
    pub work_id: WorkId,
    pub resource: String,
}

impl fmt::Display for StalledRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.work_id, self.resource)
    }
}

/// Flags runs that stopped reporting progress.
///
/// The engine enforces no step timeout. A supervisor polls the heartbeats
/// instead and leaves the reaction to its caller. Every run registered on a
/// resource is checked on its own, so a live sibling never hides a stalled
/// run.
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    threshold: Duration,
}

impl Supervisor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.stall_threshold())
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Runs that look stalled now.
    pub fn check(&self, resources: &[Arc<SharedResource>]) -> Vec<StalledRun> {
        self.check_at(Utc::now(), resources)
    }

    /// Runs whose last beat is older than the threshold at `now`. Runs that
    /// never beat are not considered stalled; finished runs are no longer
    /// registered.
    pub fn check_at(&self, now: DateTime<Utc>, resources: &[Arc<SharedResource>]) -> Vec<StalledRun> {
        let mut stalled = Vec::new();
        for resource in resources {
            for (work_id, heartbeat) in resource.active_runs() {
                if !heartbeat.is_stale_at(now, self.threshold) {
                    continue;
                }
                warn!(
                    work_id = %work_id,
                    resource = resource.id(),
                    last_beat = ?heartbeat.last_beat(),
                    threshold_secs = self.threshold.as_secs(),
                    "run heartbeat is stale"
                );
                stalled.push(StalledRun {
                    work_id,
                    resource: resource.id().to_string(),
                });
            }
        }
        stalled
    }
}
