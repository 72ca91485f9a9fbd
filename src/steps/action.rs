//! Closure-backed step with explicit continuations.

use std::fmt;
use std::sync::Arc;

use super::{Step, StepRef, Transition};

type Action<C> = Box<dyn Fn(&mut C) -> anyhow::Result<()> + Send + Sync>;

/// A named action over the context.
///
/// On success the run continues with `next`. When the action fails with an
/// ordinary fault and the policy lets the run go on, it continues with the
/// fault continuation, which is `next` unless set otherwise. A step may also
/// name a max-time continuation, taken instead of `next` once the run has
/// used up its time budget.
pub struct ActionStep<C> {
    name: String,
    perf_name: Option<String>,
    action: Action<C>,
    next: Transition<C>,
    fault_next: Option<Transition<C>>,
    max_time_next: Option<Transition<C>>,
}

impl<C> ActionStep<C> {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            perf_name: None,
            action: Box::new(action),
            next: Transition::Done,
            fault_next: None,
            max_time_next: None,
        }
    }

    /// Declare an instrumentation name.
    pub fn perf(mut self, perf_name: impl Into<String>) -> Self {
        self.perf_name = Some(perf_name.into());
        self
    }

    /// Step to run after a successful execution.
    pub fn then(mut self, next: StepRef<C>) -> Self {
        self.next = Transition::Next(next);
        self
    }

    /// Step to run after an ordinary fault.
    pub fn on_fault_then(mut self, next: StepRef<C>) -> Self {
        self.fault_next = Some(Transition::Next(next));
        self
    }

    /// Finish the run after an ordinary fault instead of following `next`.
    pub fn stop_on_fault(mut self) -> Self {
        self.fault_next = Some(Transition::Done);
        self
    }

    /// Step to run after a successful execution once the time budget is
    /// used up.
    pub fn on_max_time_then(mut self, next: StepRef<C>) -> Self {
        self.max_time_next = Some(Transition::Next(next));
        self
    }

    /// Finish the run after this step once the time budget is used up.
    pub fn stop_on_max_time(mut self) -> Self {
        self.max_time_next = Some(Transition::Done);
        self
    }

    pub(crate) fn set_next(&mut self, next: Transition<C>) {
        self.next = next;
    }
}

impl<C: 'static> ActionStep<C> {
    pub fn into_ref(self) -> StepRef<C> {
        Arc::new(self)
    }
}

impl<C> fmt::Debug for ActionStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStep")
            .field("name", &self.name)
            .field("perf_name", &self.perf_name)
            .field("next", &self.next)
            .field("fault_next", &self.fault_next)
            .field("max_time_next", &self.max_time_next)
            .finish()
    }
}

impl<C> Step<C> for ActionStep<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn perf_name(&self) -> Option<&str> {
        self.perf_name.as_deref()
    }

    fn execute(&self, ctx: &mut C) -> anyhow::Result<Transition<C>> {
        (self.action)(ctx)?;
        Ok(self.next.clone())
    }

    fn on_fault(&self) -> Transition<C> {
        self.fault_next.clone().unwrap_or_else(|| self.next.clone())
    }

    fn on_max_time(&self) -> Option<Transition<C>> {
        self.max_time_next.clone()
    }
}
