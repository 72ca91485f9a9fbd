//! Run policy: the decisions the runner delegates.
//!
//! The runner only sequences steps. At each decision point it asks the
//! [`Definition`]: which step comes first, whether to keep going after a
//! step, under which key to time a step, what a fault means, and how the run
//! ends. [`AnalysisDefinition`] is the standard policy.
//!
//! Faults are handled in two tiers. [`Definition::manage_fault`] triages
//! each one as it happens; [`Definition::end_run`] re-evaluates the whole
//! accumulated list once the loop is over. The `escalate_on_finish` flag
//! switches between fail-fast (raise the first fault) and best effort
//! (record everything, still report completion).

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::error::RunError;
use crate::fault::{classify, Fault, FaultKind};
use crate::perf::{perf_key, DEFAULT_PERF_PREFIX};
use crate::steps::{Step, StepRef};

use super::Outcome;

/// Policy object driving one run.
pub trait Definition {
    type Context: RunContext;

    fn context(&self) -> &Self::Context;

    fn context_mut(&mut self) -> &mut Self::Context;

    fn into_context(self) -> Self::Context
    where
        Self: Sized;

    /// First step of the run.
    fn initial_step(&self) -> StepRef<Self::Context>;

    /// Called at every step boundary. `false` pauses the run.
    fn end_step_execution(&mut self, step: &dyn Step<Self::Context>) -> bool;

    /// Key under which the step is timed, `None` for untimed steps.
    fn perf_key(&self, step: &dyn Step<Self::Context>) -> Option<String>;

    /// Triage a step fault.
    ///
    /// `Ok(true)` continues with the step's fault continuation, `Ok(false)`
    /// ends the loop normally, `Err` ends the run by propagation.
    fn manage_fault(
        &mut self,
        step: &dyn Step<Self::Context>,
        error: anyhow::Error,
    ) -> Result<bool, RunError>;

    /// Reconcile the run after the loop exited normally.
    fn end_run(&mut self) -> Result<Outcome, RunError>;
}

/// Standard policy for analysis runs.
pub struct AnalysisDefinition<C> {
    context: C,
    initial: StepRef<C>,
    escalate_on_finish: bool,
    perf_prefix: String,
}

impl<C: RunContext> AnalysisDefinition<C> {
    pub fn new(initial: StepRef<C>, context: C) -> Self {
        Self {
            context,
            initial,
            escalate_on_finish: false,
            perf_prefix: DEFAULT_PERF_PREFIX.to_string(),
        }
    }

    /// Raise the first accumulated fault once the run completes.
    pub fn escalate_on_finish(mut self, escalate: bool) -> Self {
        self.escalate_on_finish = escalate;
        self
    }

    /// Namespace prepended to perf keys.
    pub fn perf_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.perf_prefix = prefix.into();
        self
    }

    pub fn is_escalate_on_finish(&self) -> bool {
        self.escalate_on_finish
    }
}

impl<C: RunContext> Definition for AnalysisDefinition<C> {
    type Context = C;

    fn context(&self) -> &C {
        &self.context
    }

    fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    fn into_context(self) -> C {
        self.context
    }

    fn initial_step(&self) -> StepRef<C> {
        Arc::clone(&self.initial)
    }

    fn end_step_execution(&mut self, step: &dyn Step<C>) -> bool {
        self.context.set_active();

        if self.context.is_pause_requested() {
            let trigger = self
                .context
                .pause_triggering_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            info!(
                step = step.name(),
                work_id = %self.context.work_id(),
                triggered_by = %trigger,
                "pause requested, stopping after step"
            );
            return false;
        }

        true
    }

    fn perf_key(&self, step: &dyn Step<C>) -> Option<String> {
        step.perf_name()
            .map(|name| perf_key(&self.perf_prefix, name, &self.context.perf_suffix()))
    }

    fn manage_fault(&mut self, step: &dyn Step<C>, err: anyhow::Error) -> Result<bool, RunError> {
        let work_id = self.context.work_id();

        match classify(&err) {
            FaultKind::Interrupt => {
                info!(
                    step = step.name(),
                    work_id = %work_id,
                    kind = %FaultKind::Interrupt,
                    error = %format!("{:#}", err),
                    "step interrupted, ending run"
                );
                Ok(false)
            }
            FaultKind::ResourceExhaustion => {
                error!(
                    step = step.name(),
                    work_id = %work_id,
                    kind = %FaultKind::ResourceExhaustion,
                    error = %format!("{:#}", err),
                    "resource exhausted, requesting exit"
                );
                self.context.set_exit_requested();
                Err(RunError::ResourceExhausted {
                    step: step.name().to_string(),
                    work_id,
                    error: Arc::new(err),
                })
            }
            FaultKind::Ordinary | FaultKind::AbortRequired => {
                if self.context.is_exit_required(&err) {
                    error!(
                        step = step.name(),
                        work_id = %work_id,
                        kind = %FaultKind::AbortRequired,
                        error = %format!("{:#}", err),
                        "fault requires an abort"
                    );
                    return Err(RunError::Aborted {
                        step: step.name().to_string(),
                        work_id,
                        error: Arc::new(err),
                    });
                }

                warn!(
                    step = step.name(),
                    work_id = %work_id,
                    kind = %FaultKind::Ordinary,
                    error = %format!("{:#}", err),
                    "step fault recorded"
                );
                self.context.add_fault(Fault::new(step.name(), work_id, err));
                Ok(true)
            }
        }
    }

    fn end_run(&mut self) -> Result<Outcome, RunError> {
        let work_id = self.context.work_id();
        let faults = self.context.faults();

        if faults.is_empty() {
            debug!(work_id = %work_id, "run completed without fault");
            return Ok(Outcome::Completed);
        }

        for (index, fault) in faults.iter().enumerate() {
            error!(
                work_id = %work_id,
                index,
                step = %fault.step,
                error = %format!("{:#}", fault.error),
                "fault recorded during run"
            );
        }

        if let Some(fault) = faults
            .iter()
            .find(|fault| self.context.is_exit_required(&fault.error))
        {
            error!(work_id = %work_id, step = %fault.step, "accumulated fault requires an abort");
            return Err(RunError::Aborted {
                step: fault.step.clone(),
                work_id,
                error: Arc::clone(&fault.error),
            });
        }

        if self.escalate_on_finish {
            error!(
                work_id = %work_id,
                count = faults.len(),
                "run completed with faults, escalating the first one"
            );
            return Err(RunError::Escalated {
                fault: faults[0].clone(),
                count: faults.len(),
            });
        }

        warn!(
            work_id = %work_id,
            count = faults.len(),
            "run completed with faults, best effort"
        );
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SharedResource, WorkContext, WorkId};
    use crate::fault::{Interrupted, ResourceExhausted};
    use crate::steps::{ActionStep, EndStep};

    fn definition() -> AnalysisDefinition<WorkContext> {
        let resource = Arc::new(SharedResource::new("m7"));
        let ctx = WorkContext::new(WorkId::new(21), resource, ());
        AnalysisDefinition::new(EndStep::new().into_ref(), ctx)
    }

    fn step(name: &str) -> StepRef<WorkContext> {
        ActionStep::new(name, |_: &mut WorkContext| Ok(())).into_ref()
    }

    #[test]
    fn defaults() {
        let def = definition();
        assert!(!def.is_escalate_on_finish());
        assert_eq!(def.initial_step().name(), "End");
    }

    #[test]
    fn end_step_execution_continues_without_pause() {
        let mut def = definition();
        assert!(def.end_step_execution(step("a").as_ref()));
        assert!(def.context().heartbeat().last_beat().is_some());
    }

    #[test]
    fn end_step_execution_stops_on_pause() {
        let mut def = definition();
        def.context().resource().pause().request(WorkId::new(99));
        assert!(!def.end_step_execution(step("a").as_ref()));
        assert!(def.context().heartbeat().last_beat().is_some());
    }

    #[test]
    fn perf_key_is_namespaced() {
        let def = definition().perf_prefix("Test.");
        let timed: StepRef<WorkContext> = ActionStep::new("Activity", |_: &mut WorkContext| Ok(()))
            .perf("ActivityCatchUp")
            .into_ref();
        assert_eq!(
            def.perf_key(timed.as_ref()),
            Some("Test.ActivityCatchUp.m7".to_string())
        );
        assert_eq!(def.perf_key(step("plain").as_ref()), None);
    }

    #[test]
    fn interrupt_stops_without_recording() {
        let mut def = definition();
        let cont = def
            .manage_fault(step("a").as_ref(), Interrupted::new("stop").into())
            .unwrap();
        assert!(!cont);
        assert!(def.context().faults().is_empty());
    }

    #[test]
    fn exhaustion_sets_exit_and_raises() {
        let mut def = definition();
        let err = def
            .manage_fault(step("a").as_ref(), ResourceExhausted::new("memory").into())
            .unwrap_err();
        assert!(matches!(err, RunError::ResourceExhausted { .. }));
        assert!(def.context().is_exit_requested());
        assert!(def.context().faults().is_empty());
    }

    #[test]
    fn ordinary_fault_is_recorded_and_continues() {
        let mut def = definition();
        let cont = def
            .manage_fault(step("b").as_ref(), anyhow::anyhow!("bad slot"))
            .unwrap();
        assert!(cont);
        assert_eq!(def.context().faults().len(), 1);
        assert_eq!(def.context().faults()[0].step, "b");
    }

    #[test]
    fn abort_predicate_raises_immediately() {
        let resource = Arc::new(SharedResource::new("m7"));
        let ctx = WorkContext::new(WorkId::new(21), resource, ())
            .with_exit_predicate(|e| e.to_string().contains("fatal"));
        let mut def = AnalysisDefinition::new(EndStep::new().into_ref(), ctx);

        let err = def
            .manage_fault(step("b").as_ref(), anyhow::anyhow!("fatal error"))
            .unwrap_err();
        assert_eq!(err.outcome(), Outcome::Aborted);
        assert!(def.context().faults().is_empty());
    }

    #[test]
    fn end_run_without_faults_completes() {
        assert_eq!(definition().end_run().unwrap(), Outcome::Completed);
    }

    #[test]
    fn end_run_best_effort_completes_with_faults() {
        let mut def = definition();
        def.manage_fault(step("b").as_ref(), anyhow::anyhow!("x")).unwrap();
        assert_eq!(def.end_run().unwrap(), Outcome::Completed);
        assert_eq!(def.context().faults().len(), 1);
    }

    #[test]
    fn end_run_escalates_first_fault() {
        let mut def = definition().escalate_on_finish(true);
        def.manage_fault(step("b").as_ref(), anyhow::anyhow!("first")).unwrap();
        def.manage_fault(step("c").as_ref(), anyhow::anyhow!("second")).unwrap();

        let err = def.end_run().unwrap_err();
        let fault = err.fault().unwrap();
        assert_eq!(fault.step, "b");
        assert!(Arc::ptr_eq(&fault.error, &def.context().faults()[0].error));
        assert!(matches!(err, RunError::Escalated { count: 2, .. }));
    }

    #[test]
    fn end_run_rechecks_abort_predicate() {
        let resource = Arc::new(SharedResource::new("m7"));
        let ctx = WorkContext::new(WorkId::new(21), resource, ())
            .with_exit_predicate(|e| e.to_string().contains("fatal"));
        let mut def = AnalysisDefinition::new(EndStep::new().into_ref(), ctx);

        // Recorded directly, bypassing manage_fault.
        def.context_mut().add_fault(Fault::new(
            "legacy",
            WorkId::new(21),
            anyhow::anyhow!("fatal leftover"),
        ));

        let err = def.end_run().unwrap_err();
        assert!(matches!(err, RunError::Aborted { ref step, .. } if step == "legacy"));
    }
}
