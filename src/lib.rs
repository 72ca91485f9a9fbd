//! Analysis runner - step sequencing for background analysis workers.
//!
//! A [`runner::Runner`] drives a unit of work through a graph of steps while
//! a [`runner::Definition`] decides what happens at every step boundary:
//! whether to pause for a higher-priority unit, how to time a step, and what
//! a fault means for the run.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`context`] - Run context, pause signal, and heartbeat
//! - [`demo`] - Simulated machine-activity pipeline
//! - [`error`] - Error types and result aliases
//! - [`fault`] - Fault taxonomy and classification
//! - [`perf`] - Step timing sinks
//! - [`runner`] - Step loop and run policy
//! - [`steps`] - Step trait and the provided step kinds
//! - [`worker`] - Resubmitting worker loop and stall supervisor
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use analysis_runner::context::{SharedResource, WorkContext, WorkId};
//! use analysis_runner::runner::{AnalysisDefinition, Outcome, Runner};
//! use analysis_runner::steps::Chain;
//!
//! let graph = Chain::new()
//!     .step("Activity", |ctx: &mut WorkContext<u32>| {
//!         *ctx.state_mut() += 1;
//!         Ok(())
//!     })
//!     .build();
//!
//! let resource = Arc::new(SharedResource::new("machine-1"));
//! let context = WorkContext::new(WorkId::new(1), resource, 0);
//! let mut runner = Runner::new(AnalysisDefinition::new(graph, context));
//!
//! assert_eq!(runner.run().unwrap(), Outcome::Completed);
//! assert_eq!(*runner.context().state(), 1);
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod fault;
pub mod perf;
pub mod runner;
pub mod steps;
pub mod worker;

pub use error::{EngineError, Result, RunError};
pub use runner::Outcome;
