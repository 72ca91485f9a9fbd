//! Standard context bound to a shared resource.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::{Heartbeat, PauseSignal, RunContext, WorkId};
use crate::fault::Fault;

/// Predicate deciding whether an error requires the worker to exit.
pub type ExitPredicate = Box<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Long-lived entity (for example a monitored machine) that several units
/// of work may target at the same time.
///
/// Runs on the same resource never lock each other out; they only share the
/// advisory [`PauseSignal`]. Each run in progress registers its own
/// [`Heartbeat`] here so a supervisor can tell them apart.
#[derive(Debug)]
pub struct SharedResource {
    id: String,
    pause: PauseSignal,
    runs: RwLock<BTreeMap<WorkId, Arc<Heartbeat>>>,
}

impl SharedResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pause: PauseSignal::new(),
            runs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pause(&self) -> &PauseSignal {
        &self.pause
    }

    /// Register a run of `work_id` and hand out its heartbeat.
    ///
    /// A new attempt of the same unit of work replaces the previous entry.
    pub fn register_run(&self, work_id: WorkId) -> Arc<Heartbeat> {
        let heartbeat = Arc::new(Heartbeat::new());
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(work_id, Arc::clone(&heartbeat));
        heartbeat
    }

    /// Forget the run owning `heartbeat`. Entries replaced by a later attempt
    /// are left alone.
    pub fn unregister_run(&self, work_id: WorkId, heartbeat: &Arc<Heartbeat>) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        if runs
            .get(&work_id)
            .is_some_and(|current| Arc::ptr_eq(current, heartbeat))
        {
            runs.remove(&work_id);
        }
    }

    /// Heartbeat of the registered run of `work_id`.
    pub fn heartbeat(&self, work_id: WorkId) -> Option<Arc<Heartbeat>> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&work_id)
            .cloned()
    }

    /// Runs currently registered, by work id.
    pub fn active_runs(&self) -> Vec<(WorkId, Arc<Heartbeat>)> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, heartbeat)| (*id, Arc::clone(heartbeat)))
            .collect()
    }
}

/// Context of one run of one unit of work.
///
/// `S` is the domain state the steps operate on.
pub struct WorkContext<S = ()> {
    work_id: WorkId,
    resource: Arc<SharedResource>,
    heartbeat: Arc<Heartbeat>,
    state: S,
    faults: Vec<Fault>,
    exit_requested: bool,
    exit_predicate: Option<ExitPredicate>,
    started_at: Option<DateTime<Utc>>,
    max_time: Option<Duration>,
}

impl<S> WorkContext<S> {
    pub fn new(work_id: WorkId, resource: Arc<SharedResource>, state: S) -> Self {
        let heartbeat = resource.register_run(work_id);
        Self {
            work_id,
            resource,
            heartbeat,
            state,
            faults: Vec::new(),
            exit_requested: false,
            exit_predicate: None,
            started_at: None,
            max_time: None,
        }
    }

    /// Install the abort predicate. Without one no error requires an exit.
    pub fn with_exit_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.exit_predicate = Some(Box::new(predicate));
        self
    }

    /// Time budget of the run, counted from its start. Without one the run
    /// never takes a max-time continuation.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn resource(&self) -> &Arc<SharedResource> {
        &self.resource
    }

    /// This run's own liveness timestamp.
    pub fn heartbeat(&self) -> &Arc<Heartbeat> {
        &self.heartbeat
    }

    /// When the run started, `None` before it did.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn max_time(&self) -> Option<Duration> {
        self.max_time
    }

    /// Whether the time budget is used up at `now`.
    pub fn is_max_time_reached_at(&self, now: DateTime<Utc>) -> bool {
        match (self.started_at, self.max_time) {
            (Some(started), Some(max_time)) => (now - started)
                .to_std()
                .map(|elapsed| elapsed >= max_time)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S: fmt::Debug> fmt::Debug for WorkContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkContext")
            .field("work_id", &self.work_id)
            .field("resource", &self.resource.id)
            .field("state", &self.state)
            .field("faults", &self.faults.len())
            .field("exit_requested", &self.exit_requested)
            .field("started_at", &self.started_at)
            .field("max_time", &self.max_time)
            .finish()
    }
}

impl<S> RunContext for WorkContext<S> {
    fn work_id(&self) -> WorkId {
        self.work_id
    }

    fn mark_started(&mut self) {
        self.started_at = Some(Utc::now());
    }

    fn set_active(&self) {
        self.heartbeat.beat();
    }

    fn set_finished(&self) {
        self.resource.unregister_run(self.work_id, &self.heartbeat);
        debug!(work_id = %self.work_id, resource = %self.resource.id, "run unregistered");
    }

    fn is_pause_requested(&self) -> bool {
        // The unit holding the slot is the one that preempts, not the one
        // that steps aside.
        self.resource.pause.is_requested() && !self.resource.pause.is_held_by(self.work_id)
    }

    fn is_max_time_reached(&self) -> bool {
        self.is_max_time_reached_at(Utc::now())
    }

    fn pause_triggering_id(&self) -> Option<WorkId> {
        self.resource.pause.triggering_id()
    }

    fn add_fault(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    fn faults(&self) -> &[Fault] {
        &self.faults
    }

    fn set_exit_requested(&mut self) {
        self.exit_requested = true;
    }

    fn is_exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn is_exit_required(&self, err: &anyhow::Error) -> bool {
        let required = self
            .exit_predicate
            .as_ref()
            .map(|predicate| predicate(err))
            .unwrap_or(false);
        if required {
            error!(
                work_id = %self.work_id,
                resource = %self.resource.id,
                error = %format!("{:#}", err),
                "error requires the worker to exit, giving up"
            );
        }
        required
    }

    fn perf_suffix(&self) -> String {
        format!(".{}", self.resource.id)
    }
}
