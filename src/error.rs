//! Error types for the analysis runner.
//!
//! This module defines [`RunError`], the errors that cross a run boundary,
//! and [`EngineError`], the primary error type of the crate's outer surfaces
//! (configuration, worker, CLI), with a [`Result`] alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Steps fail with `anyhow::Error`; the definition classifies them
//! - `RunError` is what a run raises to its caller
//! - `EngineError` wraps everything else, with `anyhow` for unexpected errors

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::context::WorkId;
use crate::fault::Fault;
use crate::runner::Outcome;
use crate::worker::WorkerError;

/// Errors that propagate past the end of a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Ordinary faults were accumulated and escalate-on-finish is set.
    /// Carries the first fault.
    #[error("run finished with {count} fault(s), first: {fault}")]
    Escalated { fault: Fault, count: usize },

    /// A fault requires the unit of work and its worker to stop.
    #[error("step '{step}' of {work_id} requires an abort: {error:#}")]
    Aborted {
        step: String,
        work_id: WorkId,
        error: Arc<anyhow::Error>,
    },

    /// A step ran out of a resource. Always fatal.
    #[error("step '{step}' of {work_id} exhausted a resource: {error:#}")]
    ResourceExhausted {
        step: String,
        work_id: WorkId,
        error: Arc<anyhow::Error>,
    },

    /// A runner executes exactly one run.
    #[error("runner already executed its run")]
    AlreadyRun,
}

impl RunError {
    /// Terminal outcome this error represents.
    pub fn outcome(&self) -> Outcome {
        match self {
            RunError::Aborted { .. } => Outcome::Aborted,
            RunError::Escalated { .. }
            | RunError::ResourceExhausted { .. }
            | RunError::AlreadyRun => Outcome::Faulted,
        }
    }

    /// Whether the enclosing worker must stop.
    pub fn requires_exit(&self) -> bool {
        matches!(
            self,
            RunError::Aborted { .. } | RunError::ResourceExhausted { .. }
        )
    }

    /// The escalated fault, if this is an escalation.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            RunError::Escalated { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

/// Core error type for the crate's outer surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file not found at the given location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A run raised past its boundary.
    #[error(transparent)]
    Run(#[from] RunError),

    /// The worker loop stopped.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
