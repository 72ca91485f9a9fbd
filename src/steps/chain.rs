//! Linear pipeline builder.

use super::{ActionStep, EndStep, StepRef, Transition};

/// Builds a straight chain of [`ActionStep`]s, wiring each step's success
/// continuation to the step after it.
///
/// Steps are linked back to front, since every step holds a reference on the
/// one that follows.
pub struct Chain<C> {
    steps: Vec<ActionStep<C>>,
}

impl<C: 'static> Chain<C> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append an untimed step.
    pub fn step<F>(self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(ActionStep::new(name, action))
    }

    /// Append a step recorded in the perf sink under `perf_name`.
    pub fn timed_step<F>(self, name: impl Into<String>, perf_name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(ActionStep::new(name, action).perf(perf_name))
    }

    /// Append a prepared step. Its success continuation is replaced; a fault
    /// continuation set on it is kept.
    pub fn push(mut self, step: ActionStep<C>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Link the chain and return its first step. An empty chain yields an
    /// [`EndStep`].
    pub fn build(self) -> StepRef<C> {
        self.then(Transition::Done)
    }

    /// Link the chain so its last step continues into `tail`.
    pub fn then(self, tail: Transition<C>) -> StepRef<C> {
        let mut next = tail;
        for mut step in self.steps.into_iter().rev() {
            step.set_next(next);
            next = Transition::Next(step.into_ref());
        }

        match next {
            Transition::Next(first) => first,
            Transition::Done => EndStep::new().into_ref(),
        }
    }
}

impl<C: 'static> Default for Chain<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(first: StepRef<Vec<String>>) -> Vec<String> {
        let mut log = Vec::new();
        let mut current = Some(first);
        while let Some(step) = current {
            current = match step.execute(&mut log).unwrap() {
                Transition::Next(next) => Some(next),
                Transition::Done => None,
            };
        }
        log
    }

    fn record(name: &'static str) -> impl Fn(&mut Vec<String>) -> anyhow::Result<()> {
        move |log| {
            log.push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn chain_runs_in_order() {
        let first = Chain::new()
            .step("a", record("a"))
            .timed_step("b", "B", record("b"))
            .step("c", record("c"))
            .build();

        assert_eq!(first.name(), "a");
        assert_eq!(walk(first), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_chain_is_end_step() {
        let first: StepRef<Vec<String>> = Chain::new().build();
        assert_eq!(first.name(), "End");
        assert!(walk(first).is_empty());
    }

    #[test]
    fn chain_continues_into_tail() {
        let tail = Chain::new().step("tail", record("tail")).build();
        let first = Chain::new()
            .step("head", record("head"))
            .then(Transition::Next(tail));
        assert_eq!(walk(first), vec!["head", "tail"]);
    }

    #[test]
    fn fault_continuation_follows_chain() {
        let first = Chain::new()
            .step("a", record("a"))
            .step("b", record("b"))
            .build();
        assert_eq!(first.on_fault().step_name(), Some("b"));
    }

    #[test]
    fn len_counts_steps() {
        let chain: Chain<Vec<String>> = Chain::new().step("a", record("a"));
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
    }
}
