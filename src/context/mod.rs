//! Run context: the mutable object every step receives.
//!
//! - [`RunContext`] - what the engine needs from a context
//! - [`WorkContext`] - the standard context, bound to a [`SharedResource`]
//! - [`PauseSignal`] - cooperative preemption between units of work
//! - [`Heartbeat`] - per-run liveness for an external supervisor

pub mod heartbeat;
pub mod pause;
pub mod work;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fault::Fault;

pub use heartbeat::Heartbeat;
pub use pause::{PauseError, PauseSignal};
pub use work::{ExitPredicate, SharedResource, WorkContext};

/// Opaque identifier of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(u64);

impl WorkId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

impl From<u64> for WorkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Context contract consumed by the engine.
///
/// A context is owned by exactly one run. The fault list only grows while
/// the run is in progress.
pub trait RunContext {
    /// Unit of work this run processes.
    fn work_id(&self) -> WorkId;

    /// The run is about to execute its first step.
    fn mark_started(&mut self) {}

    /// Heartbeat: the run is alive and between two steps.
    fn set_active(&self);

    /// The run is over, whatever its outcome. It stops reporting progress.
    fn set_finished(&self) {}

    /// Whether another unit of work asked this run to step aside.
    fn is_pause_requested(&self) -> bool;

    /// Whether the run used up its time budget.
    fn is_max_time_reached(&self) -> bool {
        false
    }

    /// Unit of work that requested the pause.
    fn pause_triggering_id(&self) -> Option<WorkId>;

    /// Append an ordinary fault.
    fn add_fault(&mut self, fault: Fault);

    /// Faults accumulated so far, in order.
    fn faults(&self) -> &[Fault];

    /// Ask the enclosing worker to exit once the run is over.
    fn set_exit_requested(&mut self);

    fn is_exit_requested(&self) -> bool;

    /// Whether `error` is unrecoverable for the unit of work and its worker.
    fn is_exit_required(&self, error: &anyhow::Error) -> bool;

    /// Suffix appended to perf keys so concurrent runs aggregate separately.
    fn perf_suffix(&self) -> String {
        String::new()
    }
}
