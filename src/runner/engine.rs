//! The step loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::RunError;
use crate::perf::PerfSink;
use crate::steps::{StepRef, Transition};

use super::{Definition, Outcome};

/// Drives one run of a [`Definition`].
///
/// Steps execute strictly one after the other. The runner never retries a
/// step; a failed unit of work is retried by resubmitting it.
pub struct Runner<D: Definition> {
    definition: D,
    perf: Option<Arc<dyn PerfSink>>,
    started: bool,
}

impl<D: Definition> Runner<D> {
    pub fn new(definition: D) -> Self {
        Self {
            definition,
            perf: None,
            started: false,
        }
    }

    /// Forward step timings to `sink`.
    pub fn with_perf_sink(mut self, sink: Arc<dyn PerfSink>) -> Self {
        self.perf = Some(sink);
        self
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn context(&self) -> &D::Context {
        self.definition.context()
    }

    pub fn into_definition(self) -> D {
        self.definition
    }

    pub fn into_context(self) -> D::Context {
        self.definition.into_context()
    }

    /// Execute the run.
    ///
    /// Returns [`Outcome::Completed`] or [`Outcome::Paused`]; faulted and
    /// aborted runs come back as a [`RunError`]. A runner runs once: any
    /// further call fails with [`RunError::AlreadyRun`].
    pub fn run(&mut self) -> Result<Outcome, RunError> {
        if self.started {
            warn!(
                work_id = %self.definition.context().work_id(),
                "refusing to run the same context twice"
            );
            return Err(RunError::AlreadyRun);
        }
        self.started = true;

        self.definition.context_mut().mark_started();
        let result = self.run_steps();
        self.definition.context().set_finished();
        result
    }

    fn run_steps(&mut self) -> Result<Outcome, RunError> {
        let work_id = self.definition.context().work_id();
        let mut current = self.definition.initial_step();
        debug!(work_id = %work_id, initial = current.name(), "run starting");
        self.definition.context().set_active();

        loop {
            match self.execute(&current) {
                Ok(next) => {
                    if !self.definition.end_step_execution(current.as_ref()) {
                        info!(work_id = %work_id, step = current.name(), "run paused");
                        return Ok(Outcome::Paused);
                    }
                    let next = match current.on_max_time() {
                        Some(shortcut) if self.definition.context().is_max_time_reached() => {
                            info!(
                                work_id = %work_id,
                                step = current.name(),
                                next = shortcut.step_name().unwrap_or("done"),
                                "time budget used up, taking max-time continuation"
                            );
                            shortcut
                        }
                        _ => next,
                    };
                    match next {
                        Transition::Done => break,
                        Transition::Next(step) => current = step,
                    }
                }
                Err(err) => {
                    if !self.definition.manage_fault(current.as_ref(), err)? {
                        debug!(work_id = %work_id, step = current.name(), "loop stopped by fault policy");
                        break;
                    }
                    if !self.definition.end_step_execution(current.as_ref()) {
                        info!(work_id = %work_id, step = current.name(), "run paused after fault");
                        return Ok(Outcome::Paused);
                    }
                    match current.on_fault() {
                        Transition::Done => break,
                        Transition::Next(step) => current = step,
                    }
                }
            }
            self.definition.context().set_active();
        }

        let outcome = self.definition.end_run()?;
        info!(
            work_id = %work_id,
            outcome = %outcome,
            faults = self.definition.context().faults().len(),
            "run finished"
        );
        Ok(outcome)
    }

    fn execute(&mut self, step: &StepRef<D::Context>) -> anyhow::Result<Transition<D::Context>> {
        let perf_key = self.definition.perf_key(step.as_ref());
        debug!(step = step.name(), "executing step");

        let started = Instant::now();
        let next = step.execute(self.definition.context_mut())?;
        let elapsed = started.elapsed();

        debug!(
            step = step.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            next = next.step_name().unwrap_or("done"),
            "step finished"
        );
        if let (Some(key), Some(sink)) = (perf_key, self.perf.as_ref()) {
            sink.record(&key, elapsed);
        }
        Ok(next)
    }
}
