//! Background worker draining units of work.
//!
//! The runner never retries a step. Recovery happens one level up: a paused
//! unit of work is put back at the end of the queue and started again from
//! its first step with a fresh context.

mod job;
mod supervisor;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::context::{SharedResource, WorkId};
use crate::error::RunError;
use crate::perf::{PerfSink, DEFAULT_PERF_PREFIX};
use crate::runner::Outcome;

pub use job::{Job, PipelineJob};
pub use supervisor::{StalledRun, Supervisor};

/// Run settings shared by every unit a worker executes.
#[derive(Clone)]
pub struct WorkerSettings {
    pub escalate_on_finish: bool,
    pub perf_prefix: String,
    pub max_resubmissions: u32,
    /// Time budget of each run, `None` for unbounded runs.
    pub max_run_time: Option<Duration>,
    pub perf: Option<Arc<dyn PerfSink>>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            escalate_on_finish: false,
            perf_prefix: DEFAULT_PERF_PREFIX.to_string(),
            max_resubmissions: 10,
            max_run_time: None,
            perf: None,
        }
    }
}

impl WorkerSettings {
    /// Settings from configuration, with the sink the configuration names.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            escalate_on_finish: config.escalate_on_finish,
            perf_prefix: config.perf_prefix.clone(),
            max_resubmissions: config.max_resubmissions,
            max_run_time: config.max_run_time(),
            perf: config.build_perf_sink(),
        }
    }

    pub fn with_perf_sink(mut self, sink: Arc<dyn PerfSink>) -> Self {
        self.perf = Some(sink);
        self
    }
}

impl fmt::Debug for WorkerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSettings")
            .field("escalate_on_finish", &self.escalate_on_finish)
            .field("perf_prefix", &self.perf_prefix)
            .field("max_resubmissions", &self.max_resubmissions)
            .field("max_run_time", &self.max_run_time)
            .field("perf", &self.perf.is_some())
            .finish()
    }
}

/// A queued request to process one resource.
pub struct UnitOfWork {
    id: WorkId,
    resource: Arc<SharedResource>,
    job: Box<dyn Job>,
    resubmissions: u32,
}

impl UnitOfWork {
    pub fn new(id: WorkId, resource: Arc<SharedResource>, job: impl Job + 'static) -> Self {
        Self {
            id,
            resource,
            job: Box::new(job),
            resubmissions: 0,
        }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    pub fn resource(&self) -> &Arc<SharedResource> {
        &self.resource
    }

    /// Times this unit was put back in the queue after a pause.
    pub fn resubmissions(&self) -> u32 {
        self.resubmissions
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("resource", &self.resource.id())
            .field("resubmissions", &self.resubmissions)
            .finish()
    }
}

/// Final state of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    pub work_id: WorkId,
    pub resource: String,
    pub outcome: Outcome,
    pub resubmissions: u32,
    /// Dropped after too many pauses.
    pub dropped: bool,
    pub error: Option<String>,
}

impl fmt::Display for UnitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}: {}", self.work_id, self.resource, self.outcome)?;
        if self.resubmissions > 0 {
            write!(f, " after {} resubmission(s)", self.resubmissions)?;
        }
        if self.dropped {
            write!(f, " (dropped)")?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Per-unit results of a worker pass, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub results: Vec<UnitResult>,
}

impl WorkerReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn get(&self, work_id: WorkId) -> Option<&UnitResult> {
        self.results.iter().find(|r| r.work_id == work_id)
    }

    /// No unit faulted or aborted.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }
}

/// Reasons a worker stops before its queue is empty.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker stopped: {source}")]
    Aborted {
        work_id: WorkId,
        #[source]
        source: RunError,
        report: WorkerReport,
    },

    #[error("worker stopped, resource exhausted: {source}")]
    ResourceExhausted {
        work_id: WorkId,
        #[source]
        source: RunError,
        report: WorkerReport,
    },
}

impl WorkerError {
    /// Results gathered before the worker stopped.
    pub fn report(&self) -> &WorkerReport {
        match self {
            WorkerError::Aborted { report, .. } | WorkerError::ResourceExhausted { report, .. } => {
                report
            }
        }
    }

    pub fn work_id(&self) -> WorkId {
        match self {
            WorkerError::Aborted { work_id, .. }
            | WorkerError::ResourceExhausted { work_id, .. } => *work_id,
        }
    }
}

/// Single-threaded worker loop.
pub struct Worker {
    settings: WorkerSettings,
    queue: VecDeque<UnitOfWork>,
}

impl Worker {
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            settings,
            queue: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn submit(&mut self, unit: UnitOfWork) {
        debug!(work_id = %unit.id, resource = unit.resource.id(), "unit submitted");
        self.queue.push_back(unit);
    }

    /// Units still waiting, including those left over after a stop.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue.
    ///
    /// Stops early when a unit aborts or exhausts a resource; the remaining
    /// units stay queued.
    pub fn run(&mut self) -> Result<WorkerReport, WorkerError> {
        let mut report = WorkerReport::default();

        while let Some(mut unit) = self.queue.pop_front() {
            debug!(
                work_id = %unit.id,
                resource = unit.resource.id(),
                resubmissions = unit.resubmissions,
                "starting unit"
            );
            let result = unit.job.run(unit.id, &unit.resource, &self.settings);

            match result {
                Ok(Outcome::Paused) => {
                    if unit.resubmissions >= self.settings.max_resubmissions {
                        warn!(
                            work_id = %unit.id,
                            resource = unit.resource.id(),
                            resubmissions = unit.resubmissions,
                            "unit paused too many times, dropping it"
                        );
                        report.results.push(unit_result(&unit, Outcome::Paused, true, None));
                        continue;
                    }
                    unit.resubmissions += 1;
                    info!(
                        work_id = %unit.id,
                        resource = unit.resource.id(),
                        triggered_by = ?unit.resource.pause().triggering_id(),
                        "unit paused, resubmitting"
                    );
                    self.queue.push_back(unit);
                }
                Ok(outcome) => {
                    debug!(work_id = %unit.id, outcome = %outcome, "unit done");
                    report.results.push(unit_result(&unit, outcome, false, None));
                }
                Err(err) => {
                    let outcome = err.outcome();
                    report.results.push(unit_result(
                        &unit,
                        outcome,
                        false,
                        Some(err.to_string()),
                    ));

                    match err {
                        RunError::Aborted { .. } => {
                            error!(work_id = %unit.id, error = %err, "unit aborted, stopping worker");
                            return Err(WorkerError::Aborted {
                                work_id: unit.id,
                                source: err,
                                report,
                            });
                        }
                        RunError::ResourceExhausted { .. } => {
                            error!(work_id = %unit.id, error = %err, "resource exhausted, stopping worker");
                            return Err(WorkerError::ResourceExhausted {
                                work_id: unit.id,
                                source: err,
                                report,
                            });
                        }
                        RunError::Escalated { .. } | RunError::AlreadyRun => {
                            error!(work_id = %unit.id, error = %err, "unit faulted");
                        }
                    }
                }
            }
        }

        info!(
            units = report.results.len(),
            completed = report.count(Outcome::Completed),
            faulted = report.count(Outcome::Faulted),
            "worker queue drained"
        );
        Ok(report)
    }
}

fn unit_result(unit: &UnitOfWork, outcome: Outcome, dropped: bool, error: Option<String>) -> UnitResult {
    UnitResult {
        work_id: unit.id,
        resource: unit.resource.id().to_string(),
        outcome,
        resubmissions: unit.resubmissions,
        dropped,
        error,
    }
}
