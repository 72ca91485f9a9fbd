//! Step alternating between two branches by pass count.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::{Step, StepRef, Transition};

/// Takes `frequent` on every `frequency`-th pass and `otherwise` on the
/// others.
///
/// The pass counter lives in the step, so it counts the runs of every unit
/// of work sharing this step graph. A frequency of `0` never takes the
/// frequent branch, `1` always does.
pub struct FrequencyStep<C> {
    name: String,
    frequency: u64,
    passes: AtomicU64,
    frequent: Transition<C>,
    otherwise: Transition<C>,
}

impl<C> FrequencyStep<C> {
    pub fn new(
        name: impl Into<String>,
        frequency: u64,
        frequent: Transition<C>,
        otherwise: Transition<C>,
    ) -> Self {
        Self {
            name: name.into(),
            frequency,
            passes: AtomicU64::new(0),
            frequent,
            otherwise,
        }
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// Passes so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }
}

impl<C: 'static> FrequencyStep<C> {
    pub fn into_ref(self) -> StepRef<C> {
        Arc::new(self)
    }
}

impl<C> fmt::Debug for FrequencyStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyStep")
            .field("name", &self.name)
            .field("frequency", &self.frequency)
            .field("passes", &self.passes())
            .field("frequent", &self.frequent)
            .field("otherwise", &self.otherwise)
            .finish()
    }
}

impl<C> Step<C> for FrequencyStep<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _ctx: &mut C) -> anyhow::Result<Transition<C>> {
        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        let frequent = self.frequency != 0 && pass % self.frequency == 0;
        debug!(step = %self.name, pass, frequent, "frequency switch");

        if frequent {
            Ok(self.frequent.clone())
        } else {
            Ok(self.otherwise.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::ActionStep;

    fn branch(name: &str) -> Transition<()> {
        Transition::Next(ActionStep::new(name, |_: &mut ()| Ok(())).into_ref())
    }

    fn picks(step: &FrequencyStep<()>, passes: usize) -> Vec<String> {
        (0..passes)
            .map(|_| {
                step.execute(&mut ())
                    .unwrap()
                    .step_name()
                    .unwrap_or("done")
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn frequent_branch_every_nth_pass() {
        let switch = FrequencyStep::new("PendingModificationsSwitch", 3, branch("Low"), branch("Normal"));
        assert_eq!(
            picks(&switch, 6),
            vec!["Normal", "Normal", "Low", "Normal", "Normal", "Low"]
        );
        assert_eq!(switch.passes(), 6);
    }

    #[test]
    fn frequency_one_always_and_zero_never() {
        let always = FrequencyStep::new("always", 1, branch("Low"), branch("Normal"));
        assert_eq!(picks(&always, 2), vec!["Low", "Low"]);

        let never = FrequencyStep::new("never", 0, branch("Low"), Transition::Done);
        assert_eq!(picks(&never, 2), vec!["done", "done"]);
        assert!(never.perf_name().is_none());
    }
}
