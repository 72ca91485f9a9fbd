//! Steps: the units of logic a run executes in sequence.
//!
//! - [`Step`] - the contract the runner drives
//! - [`Transition`] - what a step hands back: the next step or `Done`
//! - [`ActionStep`] - a named closure with success and fault continuations
//! - [`ConditionStep`] - branches on a predicate over the context
//! - [`FrequencyStep`] - takes one branch every Nth pass
//! - [`EndStep`] - does nothing and finishes the run
//! - [`Chain`] - builds a linear pipeline of action steps
//!
//! Steps are stateless and shared through [`Arc`], so one step graph serves
//! any number of runs, on any number of threads.

pub mod action;
pub mod chain;
pub mod condition;
pub mod frequency;

use std::fmt;
use std::sync::Arc;

pub use action::ActionStep;
pub use chain::Chain;
pub use condition::ConditionStep;
pub use frequency::FrequencyStep;

/// Shared handle on a step.
pub type StepRef<C> = Arc<dyn Step<C>>;

/// Where the run goes after a step.
pub enum Transition<C> {
    /// Execute this step next.
    Next(StepRef<C>),
    /// The run is over.
    Done,
}

impl<C> Transition<C> {
    pub fn is_done(&self) -> bool {
        matches!(self, Transition::Done)
    }

    /// Name of the next step, `None` when done.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Transition::Next(step) => Some(step.name()),
            Transition::Done => None,
        }
    }
}

impl<C> Clone for Transition<C> {
    fn clone(&self) -> Self {
        match self {
            Transition::Next(step) => Transition::Next(Arc::clone(step)),
            Transition::Done => Transition::Done,
        }
    }
}

impl<C> fmt::Debug for Transition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Next(step) => write!(f, "Next({})", step.name()),
            Transition::Done => write!(f, "Done"),
        }
    }
}

impl<C> From<StepRef<C>> for Transition<C> {
    fn from(step: StepRef<C>) -> Self {
        Transition::Next(step)
    }
}

/// A named unit of executable logic over a context.
pub trait Step<C>: Send + Sync {
    /// Name used in logs and fault records.
    fn name(&self) -> &str;

    /// Instrumentation name. Steps without one produce no perf record.
    fn perf_name(&self) -> Option<&str> {
        None
    }

    /// Run the step body.
    fn execute(&self, ctx: &mut C) -> anyhow::Result<Transition<C>>;

    /// Continuation used when `execute` failed with an ordinary fault and the
    /// policy decided the run goes on.
    fn on_fault(&self) -> Transition<C> {
        Transition::Done
    }

    /// Continuation replacing the success continuation once the run's time
    /// budget is used up. `None` keeps going as usual.
    fn on_max_time(&self) -> Option<Transition<C>> {
        None
    }
}

/// Terminal step: finishes the run without touching the context.
#[derive(Debug, Clone)]
pub struct EndStep {
    name: String,
}

impl EndStep {
    pub fn new() -> Self {
        Self {
            name: "End".to_string(),
        }
    }

    pub fn into_ref<C>(self) -> StepRef<C> {
        Arc::new(self)
    }
}

impl Default for EndStep {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Step<C> for EndStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _ctx: &mut C) -> anyhow::Result<Transition<C>> {
        Ok(Transition::Done)
    }
}
