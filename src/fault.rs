//! Fault taxonomy for step failures.
//!
//! Steps fail with any error type through [`anyhow::Error`]. The engine sorts
//! each failure into a [`FaultKind`] by looking for the marker types defined
//! here anywhere in the error chain, so a step may wrap them with extra
//! context and still be classified correctly.
//!
//! - [`Interrupted`] - cooperative interrupt, stops the run quietly
//! - [`ResourceExhausted`] - always fatal, requests the worker to exit
//! - anything else - an ordinary fault, accumulated for finalization
//!
//! The fourth kind, abort-required, is decided by the context's
//! [`is_exit_required`](crate::context::RunContext::is_exit_required)
//! predicate rather than by a marker type.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::context::WorkId;

/// Cooperative interrupt raised by a step that observed a stop request.
#[derive(Debug, Clone, Error)]
#[error("step interrupted: {reason}")]
pub struct Interrupted {
    pub reason: String,
}

impl Interrupted {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A resource (memory, handles, connections) ran out while a step executed.
#[derive(Debug, Clone, Error)]
#[error("resource exhausted: {resource}")]
pub struct ResourceExhausted {
    pub resource: String,
}

impl ResourceExhausted {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

/// Classification of a step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Expected stop; never recorded, never raised.
    Interrupt,
    /// Always propagates past the run.
    ResourceExhaustion,
    /// Unrecoverable for the unit of work and its worker.
    AbortRequired,
    /// Accumulated and re-evaluated at the end of the run.
    Ordinary,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::Interrupt => "interrupt",
            FaultKind::ResourceExhaustion => "resource_exhaustion",
            FaultKind::AbortRequired => "abort_required",
            FaultKind::Ordinary => "ordinary",
        };
        write!(f, "{}", s)
    }
}

/// Classify an error by its marker types.
///
/// Returns [`FaultKind::Ordinary`] for anything that is neither an
/// interrupt nor a resource exhaustion; the caller applies the abort
/// predicate on top of that.
pub fn classify(error: &anyhow::Error) -> FaultKind {
    if carries::<Interrupted>(error) {
        FaultKind::Interrupt
    } else if carries::<ResourceExhausted>(error) {
        FaultKind::ResourceExhaustion
    } else {
        FaultKind::Ordinary
    }
}

// `downcast_ref` sees context values attached with `.context(..)`,
// `chain()` sees wrapped sources.
fn carries<T>(error: &anyhow::Error) -> bool
where
    T: std::error::Error + Send + Sync + 'static,
{
    error.downcast_ref::<T>().is_some() || error.chain().any(|e| e.is::<T>())
}

/// An ordinary fault recorded during a run.
///
/// The error is reference counted so the fault list can still be read after
/// one of its entries has been escalated to the caller.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Name of the step that failed.
    pub step: String,
    /// Unit of work the run belonged to.
    pub work_id: WorkId,
    /// The failure itself.
    pub error: Arc<anyhow::Error>,
}

impl Fault {
    pub fn new(step: impl Into<String>, work_id: WorkId, error: anyhow::Error) -> Self {
        Self {
            step: step.into(),
            work_id,
            error: Arc::new(error),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step '{}' ({}): {:#}", self.step, self.work_id, self.error)
    }
}
