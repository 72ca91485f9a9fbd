//! What a unit of work does when the worker picks it up.

use std::sync::Arc;

use crate::context::{SharedResource, WorkContext, WorkId};
use crate::error::RunError;
use crate::runner::{AnalysisDefinition, Outcome, Runner};
use crate::steps::StepRef;

use super::WorkerSettings;

/// One attempt at a unit of work.
///
/// Called again, with a fresh context, each time the unit is resubmitted.
pub trait Job: Send {
    fn run(
        &mut self,
        work_id: WorkId,
        resource: &Arc<SharedResource>,
        settings: &WorkerSettings,
    ) -> Result<Outcome, RunError>;
}

impl<F> Job for F
where
    F: FnMut(WorkId, &Arc<SharedResource>, &WorkerSettings) -> Result<Outcome, RunError> + Send,
{
    fn run(
        &mut self,
        work_id: WorkId,
        resource: &Arc<SharedResource>,
        settings: &WorkerSettings,
    ) -> Result<Outcome, RunError> {
        self(work_id, resource, settings)
    }
}

type SharedPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;
type Inspector<S> = Box<dyn FnMut(&WorkContext<S>) + Send>;

/// Runs a step graph through [`AnalysisDefinition`].
///
/// The graph is shared across attempts; the domain state is rebuilt for each
/// one.
pub struct PipelineJob<S> {
    initial: StepRef<WorkContext<S>>,
    make_state: Box<dyn FnMut() -> S + Send>,
    exit_predicate: Option<SharedPredicate>,
    inspect: Option<Inspector<S>>,
}

impl<S: 'static> PipelineJob<S> {
    pub fn new<F>(initial: StepRef<WorkContext<S>>, make_state: F) -> Self
    where
        F: FnMut() -> S + Send + 'static,
    {
        Self {
            initial,
            make_state: Box::new(make_state),
            exit_predicate: None,
            inspect: None,
        }
    }

    /// Errors matching `predicate` abort the unit and stop the worker.
    pub fn exit_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.exit_predicate = Some(Arc::new(predicate));
        self
    }

    /// Look at the context after every attempt that did not raise.
    pub fn inspect<F>(mut self, inspect: F) -> Self
    where
        F: FnMut(&WorkContext<S>) + Send + 'static,
    {
        self.inspect = Some(Box::new(inspect));
        self
    }
}

impl<S: Send + 'static> Job for PipelineJob<S> {
    fn run(
        &mut self,
        work_id: WorkId,
        resource: &Arc<SharedResource>,
        settings: &WorkerSettings,
    ) -> Result<Outcome, RunError> {
        let mut context = WorkContext::new(work_id, Arc::clone(resource), (self.make_state)());
        if let Some(predicate) = &self.exit_predicate {
            let predicate = Arc::clone(predicate);
            context = context.with_exit_predicate(move |err| predicate(err));
        }
        if let Some(max_time) = settings.max_run_time {
            context = context.with_max_time(max_time);
        }

        let definition = AnalysisDefinition::new(Arc::clone(&self.initial), context)
            .escalate_on_finish(settings.escalate_on_finish)
            .perf_prefix(settings.perf_prefix.clone());

        let mut runner = Runner::new(definition);
        if let Some(sink) = &settings.perf {
            runner = runner.with_perf_sink(Arc::clone(sink));
        }

        let outcome = runner.run()?;
        if let Some(inspect) = self.inspect.as_mut() {
            inspect(runner.context());
        }
        Ok(outcome)
    }
}
