//! Terminal outcome of a run.

use std::fmt;

use serde::Serialize;

use crate::error::RunError;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every step ran, possibly with ordinary faults recorded.
    Completed,
    /// Stopped at a step boundary on request; to be resubmitted.
    Paused,
    /// An escalated fault or a resource exhaustion ended the run.
    Faulted,
    /// The unit of work and its worker must stop.
    Aborted,
}

impl Outcome {
    /// Reduce a run result to its terminal outcome.
    pub fn of(result: &Result<Outcome, RunError>) -> Outcome {
        match result {
            Ok(outcome) => *outcome,
            Err(err) => err.outcome(),
        }
    }

    /// Completed and paused runs both count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed | Outcome::Paused)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Completed => "completed",
            Outcome::Paused => "paused",
            Outcome::Faulted => "faulted",
            Outcome::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}
