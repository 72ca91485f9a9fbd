//! Demo command implementation.
//!
//! The `analysis-runner demo` command drains a worker queue of simulated
//! machines and prints how each unit of work ended.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::cli::args::DemoArgs;
use crate::config::{EngineConfig, PerfSinkKind};
use crate::context::{SharedResource, WorkId};
use crate::demo::{DemoPipeline, Scenario};
use crate::error::{EngineError, Result};
use crate::perf::MemoryPerfSink;
use crate::worker::{StalledRun, Supervisor, Worker, WorkerReport, WorkerSettings};

use super::dispatcher::{Command, CommandResult};

/// The demo command implementation.
pub struct DemoCommand {
    config: EngineConfig,
    args: DemoArgs,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'a WorkerReport,
    stopped: Option<String>,
    stalled: Vec<StalledRun>,
    perf: Vec<JsonPerf>,
}

#[derive(Serialize)]
struct JsonPerf {
    key: String,
    total_ms: u64,
    count: usize,
}

impl DemoCommand {
    pub fn new(config: EngineConfig, args: DemoArgs) -> Self {
        Self { config, args }
    }

    fn settings(&self, memory: Option<&Arc<MemoryPerfSink>>) -> WorkerSettings {
        let mut settings = WorkerSettings::from_config(&self.config);
        if self.args.escalate {
            settings.escalate_on_finish = true;
        }
        if let Some(sink) = memory {
            settings = settings.with_perf_sink(sink.clone());
        }
        settings
    }
}

impl Command for DemoCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let pipeline = DemoPipeline::new(Scenario {
            fail_step: self.args.fail_step.clone(),
            abort_step: self.args.abort_step.clone(),
            pause_after: self.args.pause_after.clone(),
        });

        // Keep a handle on the memory sink so the summary can be printed.
        let memory = match self.config.perf_sink {
            PerfSinkKind::Memory => Some(Arc::new(MemoryPerfSink::new())),
            PerfSinkKind::None | PerfSinkKind::Tracing => None,
        };
        let mut worker = Worker::new(self.settings(memory.as_ref()));

        let resources: Vec<Arc<SharedResource>> = (1..=self.args.machines)
            .map(|n| Arc::new(SharedResource::new(format!("machine-{}", n))))
            .collect();
        for (index, resource) in resources.iter().enumerate() {
            let id = WorkId::new(index as u64 + 1);
            worker.submit(pipeline.machine_unit(id, Arc::clone(resource), index % 2 == 0));
        }
        if self.args.pause_after.is_some() {
            for (index, resource) in resources.iter().enumerate() {
                let id = WorkId::new(index as u64 + 1);
                worker.submit(pipeline.priority_unit(id, Arc::clone(resource)));
            }
        }
        info!(machines = self.args.machines, "demo starting");

        let (report, stopped) = match worker.run() {
            Ok(report) => (report, None),
            Err(err) => {
                error!(work_id = %err.work_id(), error = %err, "demo worker stopped");
                (err.report().clone(), Some(err.to_string()))
            }
        };
        let stalled = Supervisor::from_config(&self.config).check(&resources);

        let totals = memory.as_ref().map(|sink| sink.totals()).unwrap_or_default();

        if self.args.json {
            let json = JsonReport {
                report: &report,
                stopped: stopped.clone(),
                stalled,
                perf: totals
                    .iter()
                    .map(|(key, (total, count))| JsonPerf {
                        key: key.clone(),
                        total_ms: total.as_millis() as u64,
                        count: *count,
                    })
                    .collect(),
            };
            let rendered =
                serde_json::to_string_pretty(&json).map_err(|e| EngineError::Other(e.into()))?;
            writeln!(out, "{}", rendered)?;
        } else {
            for result in &report.results {
                writeln!(out, "{}", result)?;
            }
            if let Some(reason) = &stopped {
                writeln!(out, "stopped: {}", reason)?;
                if worker.pending() > 0 {
                    writeln!(out, "{} unit(s) left in queue", worker.pending())?;
                }
            }
            for run in &stalled {
                writeln!(out, "stalled: {}", run)?;
            }
            if !totals.is_empty() {
                writeln!(out, "perf:")?;
                for (key, (total, count)) in &totals {
                    writeln!(out, "  {} {}ms ({} run(s))", key, total.as_millis(), count)?;
                }
            }
        }

        if stopped.is_none() && report.is_success() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
