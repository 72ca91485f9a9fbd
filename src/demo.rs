//! Simulated machine-activity pipeline.
//!
//! Exercises the engine end to end without a domain model: each step only
//! records that it ran. A [`Scenario`] injects the failures and the
//! preemption the `demo` command lets a user try out.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use crate::context::{RunContext, SharedResource, WorkContext, WorkId};
use crate::steps::{ActionStep, Chain, ConditionStep, FrequencyStep, StepRef, Transition};
use crate::worker::{PipelineJob, UnitOfWork};

/// Work ids of preempting units are offset from the machine units' ids.
pub const PRIORITY_ID_OFFSET: u64 = 1000;

/// Production runs between two passes over low priority modifications.
pub const LOW_PRIORITY_FREQUENCY: u64 = 3;

/// Production runs between two passes over all pending modifications.
pub const VERY_LOW_PRIORITY_FREQUENCY: u64 = 10;

/// Domain state of one analysis attempt on one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineState {
    pub producing: bool,
    pub visited: Vec<String>,
}

pub type MachineContext = WorkContext<MachineState>;

/// Error a step raises when `--abort-step` names it.
#[derive(Debug, Error)]
#[error("analysis schema of {machine} is missing")]
pub struct SchemaMissing {
    pub machine: String,
}

/// Failures and preemption to inject into the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub fail_step: Option<String>,
    pub abort_step: Option<String>,
    pub pause_after: Option<String>,
}

/// Work id of the unit that preempts machine unit `id`.
pub fn priority_id(id: WorkId) -> WorkId {
    WorkId::new(id.get() + PRIORITY_ID_OFFSET)
}

/// Shared step graph for every machine.
pub struct DemoPipeline {
    scenario: Arc<Scenario>,
    preempted: Arc<Mutex<HashSet<WorkId>>>,
    initial: StepRef<MachineContext>,
}

impl DemoPipeline {
    pub fn new(scenario: Scenario) -> Self {
        let scenario = Arc::new(scenario);
        let preempted = Arc::new(Mutex::new(HashSet::new()));
        let step = |name: &'static str| analysis(name, &scenario, &preempted);

        // Once the time budget is used up, pending modifications end the run
        // without cleaning flagged modifications.
        let clean = Chain::new()
            .step("CleanFlaggedModifications", step("CleanFlaggedModifications"))
            .build();
        let pending = |perf_name: &str| {
            ActionStep::new("PendingModifications", step("PendingModifications"))
                .perf(perf_name)
                .then(Arc::clone(&clean))
                .stop_on_max_time()
                .into_ref()
        };
        let low_or_normal = FrequencyStep::new(
            "PendingModificationsSwitch",
            LOW_PRIORITY_FREQUENCY,
            Transition::Next(pending("PendingModificationsLow")),
            Transition::Next(pending("PendingModificationsNormal")),
        )
        .into_ref();
        let pending_switch = FrequencyStep::new(
            "PendingModificationsSwitch",
            VERY_LOW_PRIORITY_FREQUENCY,
            Transition::Next(pending("PendingModificationsAll")),
            Transition::Next(low_or_normal),
        )
        .into_ref();

        let production = Chain::new()
            .step("MachineStateTemplate", step("MachineStateTemplate"))
            .step("OperationSlotSplit", step("OperationSlotSplit"))
            .timed_step("Production", "Production", step("Production"))
            .timed_step("Activity", "Activity", step("Activity"))
            .timed_step("ProcessingReasonSlots", "ProcessingReasonSlots", step("ProcessingReasonSlots"))
            .timed_step("Detection", "Detection", step("Detection"))
            .step("AutoSequence", step("AutoSequence"))
            .then(Transition::Next(pending_switch));

        // A failed activity analysis still catches up the reason slots, then
        // ends the run.
        let activity_recovery = Chain::new()
            .timed_step("ProcessingReasonSlots", "ProcessingReasonSlots", step("ProcessingReasonSlots"))
            .build();
        let idle = Chain::new()
            .step("MachineStateTemplate", step("MachineStateTemplate"))
            .push(
                ActionStep::new("Activity", step("Activity"))
                    .perf("Activity")
                    .on_fault_then(activity_recovery),
            )
            .timed_step("ProcessingReasonSlots", "ProcessingReasonSlots", step("ProcessingReasonSlots"))
            .push(
                ActionStep::new("Detection", step("Detection"))
                    .perf("Detection")
                    .stop_on_max_time(),
            )
            .step("CleanFlaggedModifications", step("CleanFlaggedModifications"))
            .build();

        let switch = ConditionStep::new(
            "ProductionSwitch",
            |ctx: &MachineContext| ctx.state().producing,
            Transition::Next(production),
            Transition::Next(idle),
        )
        .into_ref();

        let initial = Chain::new()
            .step("Initialization", step("Initialization"))
            .then(Transition::Next(switch));

        Self {
            scenario,
            preempted,
            initial,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn initial_step(&self) -> StepRef<MachineContext> {
        Arc::clone(&self.initial)
    }

    /// Unit of work analysing `resource`.
    pub fn machine_unit(
        &self,
        id: WorkId,
        resource: Arc<SharedResource>,
        producing: bool,
    ) -> UnitOfWork {
        let job = PipelineJob::new(self.initial_step(), move || MachineState {
            producing,
            visited: Vec::new(),
        })
        .exit_when(|err| err.is::<SchemaMissing>());
        UnitOfWork::new(id, resource, job)
    }

    /// Unit that takes over `resource` from machine unit `preempted` and
    /// hands it back.
    pub fn priority_unit(&self, preempted: WorkId, resource: Arc<SharedResource>) -> UnitOfWork {
        let release = Chain::new()
            .step("ReleasePause", |ctx: &mut WorkContext| {
                let id = ctx.work_id();
                let pause = ctx.resource().pause();
                if pause.is_held_by(id) {
                    pause.release(id)?;
                }
                Ok(())
            })
            .build();
        UnitOfWork::new(priority_id(preempted), resource, PipelineJob::new(release, || ()))
    }

    /// Whether machine unit `id` was preempted at least once.
    pub fn was_preempted(&self, id: WorkId) -> bool {
        self.preempted
            .lock()
            .map(|set| set.contains(&id))
            .unwrap_or(false)
    }
}

fn analysis(
    name: &'static str,
    scenario: &Arc<Scenario>,
    preempted: &Arc<Mutex<HashSet<WorkId>>>,
) -> impl Fn(&mut MachineContext) -> anyhow::Result<()> + Send + Sync + 'static {
    let scenario = Arc::clone(scenario);
    let preempted = Arc::clone(preempted);

    move |ctx| {
        let machine = ctx.resource().id().to_string();
        debug!(step = name, resource = %machine, "simulated analysis");
        ctx.state_mut().visited.push(name.to_string());

        if scenario.abort_step.as_deref() == Some(name) {
            return Err(SchemaMissing { machine }.into());
        }
        if scenario.fail_step.as_deref() == Some(name) {
            anyhow::bail!("{} analysis failed on {}", name, machine);
        }

        if scenario.pause_after.as_deref() == Some(name) {
            let id = ctx.work_id();
            let first_time = preempted
                .lock()
                .map_err(|_| anyhow::anyhow!("preemption registry poisoned"))?
                .insert(id);
            if first_time {
                ctx.resource().pause().request(priority_id(id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::MemoryPerfSink;
    use crate::runner::{AnalysisDefinition, Outcome, Runner};
    use std::time::Duration;

    fn context(producing: bool) -> MachineContext {
        let resource = Arc::new(SharedResource::new("machine-1"));
        WorkContext::new(
            WorkId::new(1),
            resource,
            MachineState {
                producing,
                visited: Vec::new(),
            },
        )
    }

    fn run_with(pipeline: &DemoPipeline, ctx: MachineContext) -> (Result<Outcome, crate::error::RunError>, MachineContext) {
        let mut runner = Runner::new(AnalysisDefinition::new(pipeline.initial_step(), ctx));
        let result = runner.run();
        (result, runner.into_context())
    }

    fn run(pipeline: &DemoPipeline, producing: bool) -> (Result<Outcome, crate::error::RunError>, MachineContext) {
        run_with(pipeline, context(producing))
    }

    #[test]
    fn producing_machine_takes_production_branch() {
        let pipeline = DemoPipeline::new(Scenario::default());
        let (result, ctx) = run(&pipeline, true);
        assert_eq!(result.unwrap(), Outcome::Completed);
        assert_eq!(
            ctx.state().visited,
            vec![
                "Initialization",
                "MachineStateTemplate",
                "OperationSlotSplit",
                "Production",
                "Activity",
                "ProcessingReasonSlots",
                "Detection",
                "AutoSequence",
                "PendingModifications",
                "CleanFlaggedModifications",
            ]
        );
    }

    #[test]
    fn used_time_budget_skips_cleanup() {
        let pipeline = DemoPipeline::new(Scenario::default());
        let (result, ctx) = run_with(&pipeline, context(true).with_max_time(Duration::ZERO));
        assert_eq!(result.unwrap(), Outcome::Completed);
        assert_eq!(ctx.state().visited.last().map(String::as_str), Some("PendingModifications"));

        let (_, ctx) = run_with(&pipeline, context(false).with_max_time(Duration::ZERO));
        assert_eq!(ctx.state().visited.last().map(String::as_str), Some("Detection"));
    }

    #[test]
    fn pending_modifications_priority_rotates() {
        let pipeline = DemoPipeline::new(Scenario::default());
        let sink = Arc::new(MemoryPerfSink::new());
        for _ in 0..VERY_LOW_PRIORITY_FREQUENCY {
            let mut runner = Runner::new(AnalysisDefinition::new(pipeline.initial_step(), context(true)))
                .with_perf_sink(sink.clone());
            runner.run().unwrap();
        }

        let pending: Vec<String> = sink
            .keys()
            .into_iter()
            .filter(|key| key.starts_with("Analysis.PendingModifications"))
            .collect();
        assert_eq!(pending.len(), 10);
        assert_eq!(pending[0], "Analysis.PendingModificationsNormal.machine-1");
        assert_eq!(pending[2], "Analysis.PendingModificationsLow.machine-1");
        assert_eq!(pending[9], "Analysis.PendingModificationsAll.machine-1");
    }

    #[test]
    fn idle_activity_fault_routes_to_recovery() {
        let pipeline = DemoPipeline::new(Scenario {
            fail_step: Some("Activity".into()),
            ..Scenario::default()
        });
        let (result, ctx) = run(&pipeline, false);
        assert_eq!(result.unwrap(), Outcome::Completed);
        assert_eq!(
            ctx.state().visited,
            vec![
                "Initialization",
                "MachineStateTemplate",
                "Activity",
                "ProcessingReasonSlots",
            ]
        );
        assert_eq!(ctx.faults().len(), 1);
        assert_eq!(ctx.faults()[0].step, "Activity");
    }

    #[test]
    fn pause_after_requests_once_per_unit() {
        let pipeline = DemoPipeline::new(Scenario {
            pause_after: Some("Initialization".into()),
            ..Scenario::default()
        });
        let (result, ctx) = run(&pipeline, true);
        assert_eq!(result.unwrap(), Outcome::Paused);
        assert_eq!(ctx.state().visited, vec!["Initialization"]);
        assert!(pipeline.was_preempted(WorkId::new(1)));
        assert!(ctx
            .resource()
            .pause()
            .is_held_by(priority_id(WorkId::new(1))));
    }

    #[test]
    fn schema_missing_is_recognised() {
        let err: anyhow::Error = SchemaMissing {
            machine: "m".into(),
        }
        .into();
        assert!(err.is::<SchemaMissing>());
        assert_eq!(err.to_string(), "analysis schema of m is missing");
    }
}
